/// Pixel formats, texture kinds and the size math shared by the texture
/// lifecycle and the VRAM tracker.

/// Pixel format of a texture or render-target attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Uncompressed formats
    A8,
    L8,
    LA8,
    R8,
    RG8,
    RGB565,
    RGBA4,
    RGBA5551,
    RGB8,
    RGBA8,
    SRGB8,
    SRGBA8,
    RGB16F,
    RGBA16F,
    RGB32F,
    RGBA32F,
    R32F,
    DEPTH,
    DEPTHSTENCIL,

    // Block-compressed formats
    DXT1,
    DXT3,
    DXT5,
    ETC1,
    ETC2_RGB,
    ETC2_RGBA,
    PVRTC_2BPP_RGB,
    PVRTC_2BPP_RGBA,
    PVRTC_4BPP_RGB,
    PVRTC_4BPP_RGBA,
    ASTC_4x4,
    ATC_RGB,
    ATC_RGBA,
}

impl TextureFormat {
    /// Whether this is a block-compressed format
    pub fn is_compressed(self) -> bool {
        self.block_dims().is_some()
    }

    /// Whether this is a depth or combined depth-stencil format
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::DEPTH | TextureFormat::DEPTHSTENCIL)
    }

    /// Whether sampling this format returns sRGB-encoded data
    pub fn is_srgb(self) -> bool {
        matches!(self, TextureFormat::SRGB8 | TextureFormat::SRGBA8)
    }

    /// Bytes per pixel for uncompressed formats, None for compressed ones
    pub fn pixel_bytes(self) -> Option<u64> {
        match self {
            TextureFormat::A8 | TextureFormat::L8 | TextureFormat::R8 => Some(1),
            TextureFormat::LA8
            | TextureFormat::RG8
            | TextureFormat::RGB565
            | TextureFormat::RGBA4
            | TextureFormat::RGBA5551 => Some(2),
            // RGB8 rows are padded to 4 bytes per texel on upload
            TextureFormat::RGB8
            | TextureFormat::RGBA8
            | TextureFormat::SRGB8
            | TextureFormat::SRGBA8
            | TextureFormat::R32F
            | TextureFormat::DEPTH
            | TextureFormat::DEPTHSTENCIL => Some(4),
            TextureFormat::RGB16F | TextureFormat::RGBA16F => Some(8),
            TextureFormat::RGB32F | TextureFormat::RGBA32F => Some(16),
            _ => None,
        }
    }

    /// Block dimensions `(width, height)` for compressed formats
    pub fn block_dims(self) -> Option<(u32, u32)> {
        match self {
            TextureFormat::DXT1
            | TextureFormat::DXT3
            | TextureFormat::DXT5
            | TextureFormat::ETC1
            | TextureFormat::ETC2_RGB
            | TextureFormat::ETC2_RGBA
            | TextureFormat::PVRTC_4BPP_RGB
            | TextureFormat::PVRTC_4BPP_RGBA
            | TextureFormat::ASTC_4x4
            | TextureFormat::ATC_RGB
            | TextureFormat::ATC_RGBA => Some((4, 4)),
            TextureFormat::PVRTC_2BPP_RGB | TextureFormat::PVRTC_2BPP_RGBA => Some((8, 4)),
            _ => None,
        }
    }

    /// Bytes per block for compressed formats
    pub fn block_bytes(self) -> Option<u64> {
        match self {
            TextureFormat::DXT1
            | TextureFormat::ETC1
            | TextureFormat::ETC2_RGB
            | TextureFormat::PVRTC_2BPP_RGB
            | TextureFormat::PVRTC_2BPP_RGBA
            | TextureFormat::PVRTC_4BPP_RGB
            | TextureFormat::PVRTC_4BPP_RGBA
            | TextureFormat::ATC_RGB => Some(8),
            TextureFormat::DXT3
            | TextureFormat::DXT5
            | TextureFormat::ETC2_RGBA
            | TextureFormat::ASTC_4x4
            | TextureFormat::ATC_RGBA => Some(16),
            _ => None,
        }
    }
}

/// Interpretation of the stored pixel data, on top of the raw format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureKind {
    /// Plain color data
    #[default]
    Default,
    /// RGBM packed HDR
    Rgbm,
    /// RGBE packed HDR
    Rgbe,
    /// RGBP packed HDR
    Rgbp,
    /// Swizzled two-channel normal data (GGGR)
    SwizzledGggr,
}

/// Encoding derived from format + kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureEncoding {
    Linear,
    Srgb,
    Rgbm,
    Rgbe,
    Rgbp,
}

/// Derive the sampling encoding from a pixel format and texture kind
pub fn encoding(format: TextureFormat, kind: TextureKind) -> TextureEncoding {
    match kind {
        TextureKind::Rgbm => TextureEncoding::Rgbm,
        TextureKind::Rgbe => TextureEncoding::Rgbe,
        TextureKind::Rgbp => TextureEncoding::Rgbp,
        TextureKind::Default | TextureKind::SwizzledGggr => {
            if format.is_srgb() {
                TextureEncoding::Srgb
            } else {
                TextureEncoding::Linear
            }
        }
    }
}

/// Size in bytes of a single mip level
///
/// Compressed formats round dimensions up to whole blocks. `depth` is the
/// slice count for volume textures (1 otherwise).
pub fn calc_level_size(format: TextureFormat, width: u32, height: u32, depth: u32) -> u64 {
    let depth = depth.max(1) as u64;
    if let (Some((bw, bh)), Some(bytes)) = (format.block_dims(), format.block_bytes()) {
        let blocks_x = (width.max(1) + bw - 1) / bw;
        let blocks_y = (height.max(1) + bh - 1) / bh;
        blocks_x as u64 * blocks_y as u64 * bytes * depth
    } else {
        width.max(1) as u64
            * height.max(1) as u64
            * depth
            * format.pixel_bytes().unwrap_or(4)
    }
}

/// Total GPU footprint of a texture
///
/// Sums the whole mip chain when `mipmaps` is set and multiplies cubemaps
/// by their 6 faces.
pub fn calc_gpu_size(
    format: TextureFormat,
    width: u32,
    height: u32,
    depth: u32,
    mipmaps: bool,
    cubemap: bool,
) -> u64 {
    let mut result = 0u64;
    let mut w = width.max(1);
    let mut h = height.max(1);
    let mut d = depth.max(1);
    loop {
        result += calc_level_size(format, w, h, d);
        if !mipmaps || (w == 1 && h == 1 && d == 1) {
            break;
        }
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        d = (d / 2).max(1);
    }
    result * if cubemap { 6 } else { 1 }
}

/// Number of mip levels for the given dimensions (1 when mipmaps are off)
pub fn mip_count(width: u32, height: u32, mipmaps: bool) -> u32 {
    if mipmaps {
        width.max(height).max(1).ilog2() + 1
    } else {
        1
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
