/// Graphics device - owner of every GPU resource and the single entry
/// point for creating, updating and destroying textures and render
/// targets.
///
/// Resources live in slotmap arenas and are addressed by generational
/// handles; a handle to a destroyed resource simply resolves to nothing
/// instead of dangling. All driver traffic funnels through the device's
/// `GlContext`, with redundant framebuffer binds filtered by the cached
/// binding state.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::backend::{
    create_target_backend, BackendKind, FramebufferId, GlContext, NullContext, StorageFormat,
    TextureId,
};
use crate::error::{Error, Result};
use crate::target::{RenderTarget, RenderTargetDesc};
use crate::texture::{calc_level_size, Texture, TextureDesc};
use crate::{gfx_debug, gfx_info, gfx_warn};

use super::vram::VramTracker;

const LOG_SOURCE: &str = "nebula::GraphicsDevice";

new_key_type! {
    /// Generational handle into the device's texture arena
    pub struct TextureHandle;
    /// Generational handle into the device's render-target arena
    pub struct RenderTargetHandle;
}

// ===== CAPABILITIES =====

/// Device capability snapshot, fixed at creation
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    pub backend: BackendKind,
    pub max_texture_size: u32,
    pub max_cube_map_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_samples: u8,
    pub max_color_attachments: u32,
    pub max_texture_units: u32,
    pub max_anisotropy: u32,
    pub supports_msaa: bool,
    /// Multiple color attachments via extension (first-generation GL only)
    pub supports_mrt_ext: bool,
    pub supports_depth_float: bool,
    pub supports_volume: bool,
    /// Storage format matching the default backbuffer, used when an MSAA
    /// renderbuffer must mirror a supplied framebuffer
    pub back_buffer_format: StorageFormat,
}

impl DeviceCaps {
    /// Baseline capabilities for a backend kind. A real driver binding
    /// would query these; the baseline reflects what each generation
    /// guarantees.
    pub fn for_backend(backend: BackendKind) -> Self {
        match backend {
            BackendKind::WebGl1 => Self {
                backend,
                max_texture_size: 4096,
                max_cube_map_size: 4096,
                max_renderbuffer_size: 4096,
                max_samples: 1,
                max_color_attachments: 1,
                max_texture_units: 8,
                max_anisotropy: 1,
                supports_msaa: false,
                supports_mrt_ext: false,
                supports_depth_float: false,
                supports_volume: false,
                back_buffer_format: StorageFormat::Rgba8,
            },
            BackendKind::WebGl2 | BackendKind::Null => Self {
                backend,
                max_texture_size: 8192,
                max_cube_map_size: 8192,
                max_renderbuffer_size: 8192,
                max_samples: 4,
                max_color_attachments: 8,
                max_texture_units: 16,
                max_anisotropy: 16,
                supports_msaa: true,
                supports_mrt_ext: false,
                supports_depth_float: true,
                supports_volume: true,
                back_buffer_format: StorageFormat::Rgba8,
            },
        }
    }

    /// Whether draws can write multiple color attachments
    pub fn supports_mrt(&self) -> bool {
        !matches!(self.backend, BackendKind::WebGl1) || self.supports_mrt_ext
    }
}

// ===== BINDING STATE =====

/// Cached driver binding state, used to filter redundant binds.
#[derive(Debug, Default)]
pub struct BindingState {
    /// Outer `None` means the binding is unknown (e.g. after a blit);
    /// inner `None` is the default framebuffer.
    framebuffer: Option<Option<FramebufferId>>,
    texture_units: Vec<Option<TextureId>>,
}

impl BindingState {
    fn new(units: u32) -> Self {
        Self {
            framebuffer: None,
            texture_units: vec![None; units as usize],
        }
    }

    /// Currently bound framebuffer, if known
    pub fn framebuffer(&self) -> Option<Option<FramebufferId>> {
        self.framebuffer
    }

    /// Texture bound to a unit, if any
    pub fn texture_unit(&self, unit: u32) -> Option<TextureId> {
        self.texture_units.get(unit as usize).copied().flatten()
    }

    fn set_texture_unit(&mut self, unit: u32, id: TextureId) {
        if let Some(slot) = self.texture_units.get_mut(unit as usize) {
            *slot = Some(id);
        }
    }

    /// Drop every unit binding referencing a deleted texture
    fn clear_texture(&mut self, id: TextureId) {
        for slot in &mut self.texture_units {
            if *slot == Some(id) {
                *slot = None;
            }
        }
    }

    fn reset(&mut self) {
        self.framebuffer = None;
        for slot in &mut self.texture_units {
            *slot = None;
        }
    }
}

// ===== DEVICE CONTEXT =====

/// Split borrow of the device handed to render-target backends, so a
/// backend can issue driver calls and touch textures/VRAM while its own
/// target stays mutably borrowed.
pub struct DeviceContext<'a> {
    pub gl: &'a mut dyn GlContext,
    pub binding: &'a mut BindingState,
    pub caps: &'a DeviceCaps,
    pub textures: &'a mut SlotMap<TextureHandle, Texture>,
    pub vram: &'a mut VramTracker,
}

impl DeviceContext<'_> {
    /// Bind a framebuffer, skipping the driver call when already bound
    pub fn set_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if self.binding.framebuffer != Some(framebuffer) {
            self.gl.bind_framebuffer(framebuffer);
            self.binding.framebuffer = Some(framebuffer);
        }
    }

    /// Forget the cached framebuffer binding (a blit clobbered it)
    pub fn invalidate_framebuffer_binding(&mut self) {
        self.binding.framebuffer = None;
    }

    /// Ensure a texture has backend storage so it can be attached to a
    /// framebuffer. Clamps oversized attachments to the renderbuffer limit
    /// and allocates the base level.
    pub fn force_texture_backend(&mut self, handle: TextureHandle) -> Option<TextureId> {
        let max_size = self.caps.max_renderbuffer_size;
        let tex = self.textures.get_mut(handle)?;
        if let Some(id) = tex.backend_id() {
            return Some(id);
        }
        tex.clamp_size(max_size);
        let id = self.gl.create_texture();
        tex.set_backend_id(Some(id));
        self.gl.upload_level(id, 0, 0, tex.width(), tex.height(), None);
        Some(id)
    }
}

// ===== GRAPHICS DEVICE =====

/// The graphics device
pub struct GraphicsDevice {
    backend_kind: BackendKind,
    gl: Box<dyn GlContext>,
    caps: DeviceCaps,
    binding: BindingState,
    textures: SlotMap<TextureHandle, Texture>,
    targets: SlotMap<RenderTargetHandle, RenderTarget>,
    named_targets: FxHashMap<String, RenderTargetHandle>,
    vram: VramTracker,
    /// Backbuffer dimensions, used for targets with no attachments
    width: u32,
    height: u32,
    context_lost: bool,
}

impl GraphicsDevice {
    /// Create a device over a driver context
    pub fn new(backend: BackendKind, gl: Box<dyn GlContext>, width: u32, height: u32) -> Self {
        let caps = DeviceCaps::for_backend(backend);
        gfx_info!(
            LOG_SOURCE,
            "created {:?} device ({}x{}, {} samples max)",
            backend,
            width,
            height,
            caps.max_samples
        );
        let binding = BindingState::new(caps.max_texture_units);
        Self {
            backend_kind: backend,
            gl,
            caps,
            binding,
            textures: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            named_targets: FxHashMap::default(),
            vram: VramTracker::new(),
            width,
            height,
            context_lost: false,
        }
    }

    /// Headless device over the null context (no GPU required)
    pub fn headless(width: u32, height: u32) -> Self {
        Self::new(BackendKind::Null, Box::new(NullContext::new()), width, height)
    }

    // ===== ACCESSORS =====

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    pub fn vram(&self) -> &VramTracker {
        &self.vram
    }

    pub fn binding(&self) -> &BindingState {
        &self.binding
    }

    /// Backbuffer width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Backbuffer height
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn context_lost(&self) -> bool {
        self.context_lost
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    pub fn texture_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.textures.get_mut(handle)
    }

    pub fn render_target(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.targets.get(handle)
    }

    /// Look up a render target registered under a name
    pub fn render_target_by_name(&self, name: &str) -> Option<RenderTargetHandle> {
        self.named_targets.get(name).copied()
    }

    /// Split borrow for backend calls
    fn ctx(&mut self) -> DeviceContext<'_> {
        DeviceContext {
            gl: self.gl.as_mut(),
            binding: &mut self.binding,
            caps: &self.caps,
            textures: &mut self.textures,
            vram: &mut self.vram,
        }
    }

    // ===== TEXTURES =====

    /// Register a texture and account its VRAM footprint.
    ///
    /// Oversized dimensions are clamped to the device limit rather than
    /// rejected.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureHandle> {
        if desc.cubemap && desc.width != desc.height {
            return Err(Error::InvalidResource(format!(
                "cubemap texture '{}' must be square ({}x{})",
                desc.name, desc.width, desc.height
            )));
        }
        let mut texture = Texture::new(desc, self.caps.supports_volume);
        let max_size = if texture.cubemap() {
            self.caps.max_cube_map_size
        } else {
            self.caps.max_texture_size
        };
        if texture.width() > max_size || texture.height() > max_size {
            gfx_warn!(
                LOG_SOURCE,
                "texture '{}' ({}x{}) exceeds the device limit of {}, clamping",
                texture.name(),
                texture.width(),
                texture.height(),
                max_size
            );
            texture.clamp_size(max_size);
        }
        let size = texture.gpu_size() as i64;
        let profile = texture.profile();
        gfx_debug!(
            LOG_SOURCE,
            "created texture '{}' ({}x{}, {:?}, {} bytes)",
            texture.name(),
            texture.width(),
            texture.height(),
            texture.format(),
            size
        );
        let handle = self.textures.insert(texture);
        self.vram.adjust_texture(profile, size);
        Ok(handle)
    }

    /// Destroy a texture: driver delete, unit binding cleanup, VRAM credit
    pub fn destroy_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = self
            .textures
            .remove(handle)
            .ok_or_else(|| Error::InvalidResource("destroy_texture: stale handle".into()))?;
        if let Some(id) = texture.backend_id() {
            self.gl.delete_texture(id);
            self.binding.clear_texture(id);
        }
        self.vram
            .adjust_texture(texture.profile(), -(texture.gpu_size() as i64));
        Ok(())
    }

    /// Resize a render-target attachment texture in place. The backend
    /// texture is recreated on next use; VRAM is re-accounted for the new
    /// footprint.
    pub fn resize_texture(&mut self, handle: TextureHandle, width: u32, height: u32) -> Result<()> {
        let max_size = self.caps.max_renderbuffer_size;
        let texture = self
            .textures
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource("resize_texture: stale handle".into()))?;
        let old_size = texture.gpu_size() as i64;
        if let Some(id) = texture.backend_id() {
            self.gl.delete_texture(id);
            self.binding.clear_texture(id);
            texture.set_backend_id(None);
        }
        texture.resize(width.min(max_size), height.min(max_size));
        let new_size = texture.gpu_size() as i64;
        let profile = texture.profile();
        self.vram.adjust_texture(profile, new_size - old_size);
        Ok(())
    }

    /// Bind a texture to a unit, flushing pending level uploads and
    /// sampler-state changes first.
    pub fn set_texture(&mut self, handle: TextureHandle, unit: u32) -> Result<()> {
        if unit >= self.caps.max_texture_units {
            return Err(Error::InvalidResource(format!(
                "set_texture: unit {} exceeds the device limit of {}",
                unit, self.caps.max_texture_units
            )));
        }
        let Self {
            gl,
            binding,
            textures,
            ..
        } = self;
        let texture = textures
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource("set_texture: stale handle".into()))?;

        let id = match texture.backend_id() {
            Some(id) => id,
            None => {
                let id = gl.create_texture();
                texture.set_backend_id(Some(id));
                texture.dirty_all();
                id
            }
        };
        gl.bind_texture(unit, id);
        binding.set_texture_unit(unit, id);

        if texture.needs_upload() || texture.needs_mipmaps_upload() {
            for level in 0..texture.level_count() {
                if !texture.level_updated(level) {
                    continue;
                }
                let w = (texture.width() >> level).max(1);
                let h = (texture.height() >> level).max(1);
                for face in 0..texture.face_count() {
                    gl.upload_level(id, level, face, w, h, texture.level_pixels(level, face));
                }
            }
            // Mip chains regenerate from the base level; compressed
            // formats ship their chain pre-built.
            if texture.needs_mipmaps_upload() && !texture.format().is_compressed() {
                gl.generate_mipmaps(id);
            }
            texture.mark_uploaded();
        }

        if !texture.dirty().is_empty() {
            gl.apply_sampler(id, texture.sampler(), texture.dirty());
            texture.clear_dirty();
        }
        Ok(())
    }

    /// Synchronous base-level readback of one face
    pub fn read_texture(&mut self, handle: TextureHandle, face: u32) -> Result<Vec<u8>> {
        let texture = self
            .textures
            .get(handle)
            .ok_or_else(|| Error::InvalidResource("read_texture: stale handle".into()))?;
        let id = texture.backend_id().ok_or_else(|| {
            Error::InvalidResource(format!(
                "read_texture: texture '{}' has no backend storage",
                texture.name()
            ))
        })?;
        let len = calc_level_size(
            texture.format(),
            texture.width(),
            texture.height(),
            texture.depth(),
        ) as usize;
        Ok(self.gl.read_level(id, face, len))
    }

    // ===== RENDER TARGETS =====

    /// Register a render target. Pixel dimensions come from the first
    /// attachment (shifted by the mip level), falling back to the
    /// backbuffer for attachment-less targets; the sample count is clamped
    /// to device support. GPU-side construction is deferred to
    /// `init_render_target`.
    pub fn create_render_target(&mut self, mut desc: RenderTargetDesc) -> Result<RenderTargetHandle> {
        if desc.color_buffers.len() as u32 > self.caps.max_color_attachments {
            gfx_warn!(
                LOG_SOURCE,
                "render target '{}' requests {} color attachments, device supports {}; truncating",
                desc.name,
                desc.color_buffers.len(),
                self.caps.max_color_attachments
            );
            desc.color_buffers.truncate(self.caps.max_color_attachments as usize);
        }

        let size_source = desc.color_buffers.first().copied().or(desc.depth_buffer);
        let (width, height) = match size_source {
            Some(handle) => {
                let tex = self.textures.get(handle).ok_or_else(|| {
                    Error::InvalidResource(format!(
                        "create_render_target: stale attachment handle on '{}'",
                        desc.name
                    ))
                })?;
                (
                    (tex.width() >> desc.mip_level).max(1),
                    (tex.height() >> desc.mip_level).max(1),
                )
            }
            None => (self.width, self.height),
        };

        let samples = if self.caps.supports_msaa {
            desc.samples.clamp(1, self.caps.max_samples)
        } else {
            1
        };

        let backend = create_target_backend(self.backend_kind);
        let target = RenderTarget::new(desc, width, height, samples, backend);
        let name = target.name().to_string();
        gfx_debug!(
            LOG_SOURCE,
            "created render target '{}' ({}x{}, {} colors, samples {})",
            name,
            width,
            height,
            target.color_buffers().len(),
            samples
        );
        let handle = self.targets.insert(target);
        if !name.is_empty() {
            if let Some(old) = self.named_targets.insert(name.clone(), handle) {
                if self.targets.contains_key(old) {
                    gfx_warn!(
                        LOG_SOURCE,
                        "render target name '{}' reassigned to a new target",
                        name
                    );
                }
            }
        }
        Ok(handle)
    }

    /// Build the target's GPU object graph. Idempotent; a second call is
    /// a no-op until the target loses its context.
    pub fn init_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        let Self {
            gl,
            binding,
            caps,
            textures,
            vram,
            targets,
            ..
        } = self;
        let target = targets
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource("init_render_target: stale handle".into()))?;
        if target.initialized() {
            return Ok(());
        }
        let params = target.params();
        let mut ctx = DeviceContext {
            gl: gl.as_mut(),
            binding,
            caps,
            textures,
            vram,
        };
        target.backend_mut().init(&mut ctx, &params)?;
        target.mark_initialized();
        Ok(())
    }

    /// Bind a target for rendering, initializing it on first use.
    /// `None` binds the default framebuffer.
    pub fn bind_render_target(&mut self, handle: Option<RenderTargetHandle>) -> Result<()> {
        let handle = match handle {
            Some(handle) => handle,
            None => {
                self.ctx().set_framebuffer(None);
                return Ok(());
            }
        };
        self.init_render_target(handle)?;
        let Self {
            gl,
            binding,
            caps,
            textures,
            vram,
            targets,
            ..
        } = self;
        let target = targets
            .get(handle)
            .ok_or_else(|| Error::InvalidResource("bind_render_target: stale handle".into()))?;
        let framebuffer = target.backend().as_gl().and_then(|b| b.framebuffer());
        let mut ctx = DeviceContext {
            gl: gl.as_mut(),
            binding,
            caps,
            textures,
            vram,
        };
        ctx.set_framebuffer(framebuffer);
        Ok(())
    }

    /// Resolve a multisampled target into its single-sampled attachments
    pub fn resolve_render_target(
        &mut self,
        handle: RenderTargetHandle,
        color: bool,
        depth: bool,
    ) -> Result<()> {
        let Self {
            gl,
            binding,
            caps,
            textures,
            vram,
            targets,
            ..
        } = self;
        let target = targets
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource("resolve_render_target: stale handle".into()))?;
        if !target.initialized() {
            return Ok(());
        }
        let params = target.params();
        let mut ctx = DeviceContext {
            gl: gl.as_mut(),
            binding,
            caps,
            textures,
            vram,
        };
        target.backend_mut().resolve(&mut ctx, &params, color, depth);
        Ok(())
    }

    /// Destroy a render target and every GPU object it owns. Attachment
    /// textures are left alive.
    pub fn destroy_render_target(&mut self, handle: RenderTargetHandle) -> Result<()> {
        let mut target = self
            .targets
            .remove(handle)
            .ok_or_else(|| Error::InvalidResource("destroy_render_target: stale handle".into()))?;
        self.named_targets.retain(|_, &mut h| h != handle);
        let mut ctx = self.ctx();
        target.backend_mut().destroy(&mut ctx);
        Ok(())
    }

    // ===== CONTEXT LOSS =====

    /// The driver context died: drop every backend handle without driver
    /// deletes and mark all state for lazy rebuild on restore.
    pub fn lose_context(&mut self) {
        gfx_warn!(LOG_SOURCE, "graphics context lost");
        self.context_lost = true;
        for texture in self.textures.values_mut() {
            texture.lose_context();
        }
        for target in self.targets.values_mut() {
            // Renderbuffer storage died with the context; re-initialization
            // charges it again.
            if let Some(gl) = target.backend().as_gl() {
                self.vram.adjust_renderbuffer(-gl.renderbuffer_bytes());
            }
            target.lose_context();
        }
        self.binding.reset();
    }

    /// A fresh driver context is available; resources rebuild lazily as
    /// they are next used.
    pub fn restore_context(&mut self) {
        gfx_info!(LOG_SOURCE, "graphics context restored");
        self.context_lost = false;
    }
}

#[cfg(test)]
#[path = "graphics_device_tests.rs"]
mod tests;
