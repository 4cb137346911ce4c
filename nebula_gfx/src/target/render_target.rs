/// Render target - a set of color/depth attachments draws render into.
///
/// A target is a lightweight description until the device initializes it,
/// at which point its backend allocates the framebuffer object graph. The
/// texture attachments are referenced by handle and stay owned by the
/// device registry; destroying a target never destroys its textures.

use crate::backend::{FramebufferId, TargetBackend};
use crate::device::TextureHandle;

// ===== SUPPLIED FRAMEBUFFER =====

/// Where a target's single-sampled framebuffer comes from.
///
/// Most targets allocate their own; a target can instead adopt the default
/// backbuffer or an externally created framebuffer (XR sessions, embedders).
/// Adopted framebuffers are never deleted by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppliedFramebuffer {
    /// The target allocates and owns its framebuffer
    #[default]
    NotSupplied,
    /// Render into the default (backbuffer) framebuffer
    Default,
    /// Render into a framebuffer created outside the device
    External(FramebufferId),
}

impl SuppliedFramebuffer {
    /// True unless the target allocates its own framebuffer
    pub fn is_supplied(&self) -> bool {
        !matches!(self, SuppliedFramebuffer::NotSupplied)
    }
}

// ===== DESCRIPTOR =====

/// Render target creation parameters
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub name: String,
    /// Color attachment textures, in attachment-slot order. May be empty
    /// for depth-only targets.
    pub color_buffers: Vec<TextureHandle>,
    /// Depth capture texture; when set it wins over `depth` and no
    /// renderbuffer is allocated.
    pub depth_buffer: Option<TextureHandle>,
    /// Allocate a depth renderbuffer when no depth texture is attached
    pub depth: bool,
    /// Combined depth-stencil storage instead of depth-only
    pub stencil: bool,
    /// Requested MSAA sample count; clamped to device support
    pub samples: u8,
    /// Cubemap face rendered into, for cubemap color attachments
    pub face: u32,
    /// Mip level rendered into
    pub mip_level: u32,
    pub supplied: SuppliedFramebuffer,
}

impl Default for RenderTargetDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            color_buffers: Vec::new(),
            depth_buffer: None,
            depth: true,
            stencil: false,
            samples: 1,
            face: 0,
            mip_level: 0,
            supplied: SuppliedFramebuffer::NotSupplied,
        }
    }
}

// ===== PARAMS SNAPSHOT =====

/// Owned snapshot of a target's geometry and attachment layout, handed to
/// the backend so init/resolve can borrow the device mutably alongside it.
#[derive(Debug, Clone)]
pub struct TargetParams {
    pub name: String,
    pub color_buffers: Vec<TextureHandle>,
    pub depth_buffer: Option<TextureHandle>,
    pub depth: bool,
    pub stencil: bool,
    pub samples: u8,
    pub face: u32,
    pub mip_level: u32,
    pub width: u32,
    pub height: u32,
    pub supplied: SuppliedFramebuffer,
}

// ===== RENDER TARGET =====

/// A device-registered render target.
///
/// Held in the device's target registry and addressed by
/// `RenderTargetHandle`; the embedded backend carries the GPU-side state.
pub struct RenderTarget {
    name: String,
    color_buffers: Vec<TextureHandle>,
    depth_buffer: Option<TextureHandle>,
    depth: bool,
    stencil: bool,
    samples: u8,
    face: u32,
    mip_level: u32,
    width: u32,
    height: u32,
    supplied: SuppliedFramebuffer,
    initialized: bool,
    backend: Box<dyn TargetBackend>,
}

impl RenderTarget {
    /// Built by the device, which resolves the pixel dimensions from the
    /// first attachment (shifted by `mip_level`) and clamps `samples`.
    pub(crate) fn new(
        desc: RenderTargetDesc,
        width: u32,
        height: u32,
        samples: u8,
        backend: Box<dyn TargetBackend>,
    ) -> Self {
        // A depth texture always implies depth rendering
        let depth = desc.depth || desc.depth_buffer.is_some();
        Self {
            name: desc.name,
            color_buffers: desc.color_buffers,
            depth_buffer: desc.depth_buffer,
            depth,
            stencil: desc.stencil,
            samples: samples.max(1),
            face: desc.face,
            mip_level: desc.mip_level,
            width,
            height,
            supplied: desc.supplied,
            initialized: false,
            backend,
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_buffers(&self) -> &[TextureHandle] {
        &self.color_buffers
    }

    /// First color attachment, if any
    pub fn color_buffer(&self) -> Option<TextureHandle> {
        self.color_buffers.first().copied()
    }

    pub fn depth_buffer(&self) -> Option<TextureHandle> {
        self.depth_buffer
    }

    pub fn depth(&self) -> bool {
        self.depth
    }

    pub fn stencil(&self) -> bool {
        self.stencil
    }

    pub fn samples(&self) -> u8 {
        self.samples
    }

    pub fn face(&self) -> u32 {
        self.face
    }

    pub fn mip_level(&self) -> u32 {
        self.mip_level
    }

    pub fn supplied(&self) -> SuppliedFramebuffer {
        self.supplied
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn backend(&self) -> &dyn TargetBackend {
        self.backend.as_ref()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn TargetBackend {
        self.backend.as_mut()
    }

    /// Owned parameter snapshot for backend calls
    pub(crate) fn params(&self) -> TargetParams {
        TargetParams {
            name: self.name.clone(),
            color_buffers: self.color_buffers.clone(),
            depth_buffer: self.depth_buffer,
            depth: self.depth,
            stencil: self.stencil,
            samples: self.samples,
            face: self.face,
            mip_level: self.mip_level,
            width: self.width,
            height: self.height,
            supplied: self.supplied,
        }
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Forget the GPU-side state so the target re-initializes on next use
    pub(crate) fn lose_context(&mut self) {
        self.initialized = false;
        self.backend.lose_context();
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
