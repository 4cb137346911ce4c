/// VRAM accounting shared by textures and render-target attachments.
///
/// Every GPU allocation adjusts the aggregate counter and one per-category
/// counter by its computed footprint, as a positive delta on alloc and a
/// negative delta on free. The two always balance: destroying a resource
/// nets its allocation to zero.

use crate::gfx_trace;

/// VRAM accounting category for a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureProfile {
    /// Plain texture
    #[default]
    Texture,
    /// Shadow map
    Shadow,
    /// Asset texture
    Asset,
    /// Lightmap
    Lightmap,
}

/// Per-device VRAM counters, in bytes.
///
/// `vb`/`ib`/`ub` are the vertex/index/uniform buffer counters adjusted by
/// the buffer subsystems that plug into the device; this core moves the
/// texture and renderbuffer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VramTracker {
    /// Aggregate texture memory
    pub tex: i64,
    /// Shadow-map texture memory
    pub tex_shadow: i64,
    /// Asset texture memory
    pub tex_asset: i64,
    /// Lightmap texture memory
    pub tex_lightmap: i64,
    /// Render-target renderbuffer memory (MSAA color and depth storage)
    pub rb: i64,
    /// Vertex buffer memory
    pub vb: i64,
    /// Index buffer memory
    pub ib: i64,
    /// Uniform buffer memory
    pub ub: i64,
}

impl VramTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signed texture-memory delta to the aggregate counter and the
    /// category selected by `profile`.
    pub fn adjust_texture(&mut self, profile: TextureProfile, delta: i64) {
        self.tex += delta;
        match profile {
            TextureProfile::Texture => {}
            TextureProfile::Shadow => self.tex_shadow += delta,
            TextureProfile::Asset => self.tex_asset += delta,
            TextureProfile::Lightmap => self.tex_lightmap += delta,
        }
        gfx_trace!(
            "nebula::Vram",
            "texture vram {} {} bytes ({:?}), total {}",
            if delta >= 0 { "alloc" } else { "free" },
            delta.abs(),
            profile,
            self.tex
        );
    }

    /// Apply a signed renderbuffer-memory delta
    pub fn adjust_renderbuffer(&mut self, delta: i64) {
        self.rb += delta;
        gfx_trace!(
            "nebula::Vram",
            "renderbuffer vram {} {} bytes, total {}",
            if delta >= 0 { "alloc" } else { "free" },
            delta.abs(),
            self.rb
        );
    }

    /// Total tracked GPU memory across all counters
    pub fn total(&self) -> i64 {
        self.tex + self.rb + self.vb + self.ib + self.ub
    }
}

#[cfg(test)]
#[path = "vram_tests.rs"]
mod tests;
