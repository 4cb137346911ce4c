/// Recording mock driver context for tests.
///
/// Hands out sequential handles like `NullContext`, but records every call
/// into a shared log the test keeps a handle to, so tests can assert on
/// the exact driver traffic a device operation produced.

use std::sync::{Arc, Mutex};

use crate::texture::{SamplerState, TextureDirty};

use super::context::{
    Attachment, BlitMask, FramebufferId, FramebufferStatus, GlContext, RenderbufferId,
    StorageFormat, TextureId,
};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateFramebuffer(FramebufferId),
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    CreateRenderbuffer(RenderbufferId),
    DeleteRenderbuffer(RenderbufferId),
    RenderbufferStorage {
        renderbuffer: RenderbufferId,
        format: StorageFormat,
        width: u32,
        height: u32,
        samples: u8,
    },
    AttachTexture {
        attachment: Attachment,
        texture: TextureId,
        face: u32,
        mip_level: u32,
    },
    AttachRenderbuffer {
        attachment: Attachment,
        renderbuffer: RenderbufferId,
    },
    DrawBuffers(Vec<u32>),
    FramebufferStatus,
    BlitFramebuffer {
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        width: u32,
        height: u32,
        mask: BlitMask,
    },
    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    UploadLevel {
        texture: TextureId,
        mip_level: u32,
        face: u32,
        width: u32,
        height: u32,
        has_data: bool,
    },
    GenerateMipmaps(TextureId),
    ApplySampler {
        texture: TextureId,
        dirty: TextureDirty,
    },
    ReadLevel {
        texture: TextureId,
        face: u32,
        len: usize,
    },
}

/// Shared call log a test holds onto after boxing the context
pub type CallLog = Arc<Mutex<Vec<GlCall>>>;

pub struct MockContext {
    calls: CallLog,
    next_framebuffer: u32,
    next_renderbuffer: u32,
    next_texture: u32,
    status: FramebufferStatus,
}

impl MockContext {
    pub fn new() -> Self {
        Self::with_status(FramebufferStatus::Complete)
    }

    /// Mock whose completeness checks report `status`
    pub fn with_status(status: FramebufferStatus) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            next_framebuffer: 0,
            next_renderbuffer: 0,
            next_texture: 0,
            status,
        }
    }

    /// Clone of the shared call log
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: GlCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GlContext for MockContext {
    fn create_framebuffer(&mut self) -> FramebufferId {
        self.next_framebuffer += 1;
        let id = FramebufferId(self.next_framebuffer);
        self.record(GlCall::CreateFramebuffer(id));
        id
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.record(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.record(GlCall::BindFramebuffer(framebuffer));
    }

    fn create_renderbuffer(&mut self) -> RenderbufferId {
        self.next_renderbuffer += 1;
        let id = RenderbufferId(self.next_renderbuffer);
        self.record(GlCall::CreateRenderbuffer(id));
        id
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.record(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        format: StorageFormat,
        width: u32,
        height: u32,
        samples: u8,
    ) {
        self.record(GlCall::RenderbufferStorage {
            renderbuffer,
            format,
            width,
            height,
            samples,
        });
    }

    fn attach_texture(
        &mut self,
        attachment: Attachment,
        texture: TextureId,
        face: u32,
        mip_level: u32,
    ) {
        self.record(GlCall::AttachTexture {
            attachment,
            texture,
            face,
            mip_level,
        });
    }

    fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferId) {
        self.record(GlCall::AttachRenderbuffer {
            attachment,
            renderbuffer,
        });
    }

    fn draw_buffers(&mut self, attachments: &[u32]) {
        self.record(GlCall::DrawBuffers(attachments.to_vec()));
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        self.record(GlCall::FramebufferStatus);
        self.status
    }

    fn blit_framebuffer(
        &mut self,
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        width: u32,
        height: u32,
        mask: BlitMask,
    ) {
        self.record(GlCall::BlitFramebuffer {
            src,
            dst,
            width,
            height,
            mask,
        });
    }

    fn create_texture(&mut self) -> TextureId {
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.record(GlCall::CreateTexture(id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.record(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.record(GlCall::BindTexture { unit, texture });
    }

    fn upload_level(
        &mut self,
        texture: TextureId,
        mip_level: u32,
        face: u32,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) {
        self.record(GlCall::UploadLevel {
            texture,
            mip_level,
            face,
            width,
            height,
            has_data: data.is_some(),
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.record(GlCall::GenerateMipmaps(texture));
    }

    fn apply_sampler(&mut self, texture: TextureId, _state: &SamplerState, dirty: TextureDirty) {
        self.record(GlCall::ApplySampler { texture, dirty });
    }

    fn read_level(&mut self, texture: TextureId, face: u32, len: usize) -> Vec<u8> {
        self.record(GlCall::ReadLevel { texture, face, len });
        vec![0; len]
    }
}
