/// Raw command surface the GL-style backend issues driver calls through.
///
/// Backend plugins implement `GlContext` over a real driver binding; the
/// in-crate `NullContext` provides the headless implementation. All calls
/// execute synchronously on the calling thread, mirroring the immediate
/// command-issuing model of the underlying APIs.

use bitflags::bitflags;

use crate::texture::{SamplerState, TextureDirty};

// ===== HANDLES =====

/// Backend framebuffer object handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Backend renderbuffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u32);

/// Backend texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

// ===== ATTACHMENTS AND FORMATS =====

/// Framebuffer attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Color attachment slot `base + n`
    Color(u32),
    /// Depth-only attachment
    Depth,
    /// Combined depth-stencil attachment
    DepthStencil,
}

/// Renderbuffer storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Rgba8,
    Srgba8,
    Rgba16F,
    Rgba32F,
    R32F,
    Depth16,
    Depth32F,
    Depth24Stencil8,
}

impl StorageFormat {
    /// Bytes per single-sampled pixel, for VRAM accounting
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Depth16 => 2,
            Self::Rgba8 | Self::Srgba8 | Self::R32F | Self::Depth32F | Self::Depth24Stencil8 => 4,
            Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    DimensionMismatch,
    Unsupported,
}

bitflags! {
    /// Which buffers a blit copies
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlitMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

// ===== CONTEXT TRAIT =====

/// The driver command surface.
///
/// Framebuffer/renderbuffer/texture creation, attachment, completeness
/// validation, blitting, uploads and readback. `None` for a framebuffer
/// argument means the default (backbuffer) framebuffer.
pub trait GlContext {
    fn create_framebuffer(&mut self) -> FramebufferId;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Bind a framebuffer as the current draw+read target
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn create_renderbuffer(&mut self) -> RenderbufferId;

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    /// Allocate renderbuffer storage; `samples > 1` selects multisampled
    /// storage on backends that support it.
    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        format: StorageFormat,
        width: u32,
        height: u32,
        samples: u8,
    );

    /// Attach a texture level/face to the currently bound framebuffer
    fn attach_texture(
        &mut self,
        attachment: Attachment,
        texture: TextureId,
        face: u32,
        mip_level: u32,
    );

    /// Attach a renderbuffer to the currently bound framebuffer
    fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferId);

    /// Declare the list of color attachments draws write to
    fn draw_buffers(&mut self, attachments: &[u32]);

    /// Completeness of the currently bound framebuffer
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    /// Same-region nearest-filter blit between two framebuffers.
    ///
    /// Binds `src` for reading and `dst` for drawing internally; the
    /// caller's draw-framebuffer binding is clobbered.
    fn blit_framebuffer(
        &mut self,
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        width: u32,
        height: u32,
        mask: BlitMask,
    );

    fn create_texture(&mut self) -> TextureId;

    fn delete_texture(&mut self, texture: TextureId);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Upload (or allocate, when `data` is None) one face of one mip level
    fn upload_level(
        &mut self,
        texture: TextureId,
        mip_level: u32,
        face: u32,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    );

    /// Regenerate the full mip chain from the base level
    fn generate_mipmaps(&mut self, texture: TextureId);

    /// Flush changed sampler state to the texture's sampler object
    fn apply_sampler(&mut self, texture: TextureId, state: &SamplerState, dirty: TextureDirty);

    /// Synchronous pixel readback of one face; returns `len` bytes
    fn read_level(&mut self, texture: TextureId, face: u32, len: usize) -> Vec<u8>;
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
