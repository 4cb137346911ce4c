/// Headless context - no GPU required.
///
/// Hands out sequential handles and accepts every call as a no-op, with
/// completeness always reporting `Complete`. Backs the null device backend
/// and any environment without a real driver (CI, server-side tooling).

use crate::device::DeviceContext;
use crate::error::Result;
use crate::target::TargetParams;
use crate::texture::{SamplerState, TextureDirty};
use super::context::{
    Attachment, BlitMask, FramebufferId, FramebufferStatus, GlContext, RenderbufferId,
    StorageFormat, TextureId,
};
use super::TargetBackend;

/// Headless `GlContext` implementation
#[derive(Debug, Default)]
pub struct NullContext {
    next_framebuffer: u32,
    next_renderbuffer: u32,
    next_texture: u32,
}

impl NullContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GlContext for NullContext {
    fn create_framebuffer(&mut self) -> FramebufferId {
        self.next_framebuffer += 1;
        FramebufferId(self.next_framebuffer)
    }

    fn delete_framebuffer(&mut self, _framebuffer: FramebufferId) {}

    fn bind_framebuffer(&mut self, _framebuffer: Option<FramebufferId>) {}

    fn create_renderbuffer(&mut self) -> RenderbufferId {
        self.next_renderbuffer += 1;
        RenderbufferId(self.next_renderbuffer)
    }

    fn delete_renderbuffer(&mut self, _renderbuffer: RenderbufferId) {}

    fn renderbuffer_storage(
        &mut self,
        _renderbuffer: RenderbufferId,
        _format: StorageFormat,
        _width: u32,
        _height: u32,
        _samples: u8,
    ) {
    }

    fn attach_texture(
        &mut self,
        _attachment: Attachment,
        _texture: TextureId,
        _face: u32,
        _mip_level: u32,
    ) {
    }

    fn attach_renderbuffer(&mut self, _attachment: Attachment, _renderbuffer: RenderbufferId) {}

    fn draw_buffers(&mut self, _attachments: &[u32]) {}

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        FramebufferStatus::Complete
    }

    fn blit_framebuffer(
        &mut self,
        _src: Option<FramebufferId>,
        _dst: Option<FramebufferId>,
        _width: u32,
        _height: u32,
        _mask: BlitMask,
    ) {
    }

    fn create_texture(&mut self) -> TextureId {
        self.next_texture += 1;
        TextureId(self.next_texture)
    }

    fn delete_texture(&mut self, _texture: TextureId) {}

    fn bind_texture(&mut self, _unit: u32, _texture: TextureId) {}

    fn upload_level(
        &mut self,
        _texture: TextureId,
        _mip_level: u32,
        _face: u32,
        _width: u32,
        _height: u32,
        _data: Option<&[u8]>,
    ) {
    }

    fn generate_mipmaps(&mut self, _texture: TextureId) {}

    fn apply_sampler(&mut self, _texture: TextureId, _state: &SamplerState, _dirty: TextureDirty) {}

    fn read_level(&mut self, _texture: TextureId, _face: u32, len: usize) -> Vec<u8> {
        vec![0; len]
    }
}

/// Null render-target backend: targets are immediately usable, resolve
/// happens implicitly (nothing to copy).
pub struct NullTargetBackend;

impl TargetBackend for NullTargetBackend {
    fn init(&mut self, _ctx: &mut DeviceContext<'_>, _params: &TargetParams) -> Result<()> {
        Ok(())
    }

    fn resolve(
        &mut self,
        _ctx: &mut DeviceContext<'_>,
        _params: &TargetParams,
        _color: bool,
        _depth: bool,
    ) {
    }

    fn destroy(&mut self, _ctx: &mut DeviceContext<'_>) {}

    fn lose_context(&mut self) {}
}
