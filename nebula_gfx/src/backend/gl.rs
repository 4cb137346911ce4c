/// GL-style render-target backend.
///
/// Builds the framebuffer object graph for a render target: the
/// single-sampled framebuffer with its texture attachments, the optional
/// depth renderbuffer, and when multisampling is requested the MSAA
/// framebuffer with per-attachment renderbuffers plus the per-attachment
/// framebuffer pairs that make multi-target resolve possible.

use crate::device::DeviceContext;
use crate::error::Result;
use crate::gfx_error;
use crate::target::{SuppliedFramebuffer, TargetParams};
use crate::texture::TextureFormat;

use super::context::{
    Attachment, BlitMask, FramebufferId, FramebufferStatus, RenderbufferId, StorageFormat,
};
use super::TargetBackend;

const LOG_SOURCE: &str = "nebula::GlTargetBackend";

// ===== FRAMEBUFFER PAIR =====

/// One color attachment's resolve route when MSAA is combined with
/// multiple render targets.
///
/// Blitting resolves only the first color attachment of the read
/// framebuffer, so each attachment beyond the first needs its own pair:
/// `msaa_fb` exposes the shared MSAA renderbuffer as attachment 0 and
/// `resolve_fb` exposes the destination texture as attachment 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferPair {
    pub msaa_fb: FramebufferId,
    pub resolve_fb: FramebufferId,
}

// ===== GL TARGET BACKEND =====

/// GPU-side state of one render target on a GL-style backend
pub struct GlTargetBackend {
    /// Framebuffer draws render into. With MSAA this holds the
    /// multisampled renderbuffers; without it holds the texture
    /// attachments directly.
    framebuffer: Option<FramebufferId>,
    /// Single-sampled destination of the resolve; only set with MSAA
    resolve_framebuffer: Option<FramebufferId>,
    /// Multisampled color renderbuffers, one per color attachment
    msaa_color_buffers: Vec<RenderbufferId>,
    /// Multisampled depth(-stencil) renderbuffer
    msaa_depth_buffer: Option<RenderbufferId>,
    /// Single-sampled depth(-stencil) renderbuffer, used when no depth
    /// texture is attached
    depth_buffer: Option<RenderbufferId>,
    /// Per-attachment resolve routes; populated only for MSAA with more
    /// than one color attachment
    color_mrt_framebuffers: Vec<FramebufferPair>,
    /// VRAM charged for the renderbuffers allocated here
    renderbuffer_bytes: i64,
    /// Whether `framebuffer` was allocated here (false when adopted from
    /// a supplied framebuffer)
    owns_primary: bool,
    /// Whether `resolve_framebuffer` was allocated here
    owns_resolve: bool,
}

impl GlTargetBackend {
    pub fn new() -> Self {
        Self {
            framebuffer: None,
            resolve_framebuffer: None,
            msaa_color_buffers: Vec::new(),
            msaa_depth_buffer: None,
            depth_buffer: None,
            color_mrt_framebuffers: Vec::new(),
            renderbuffer_bytes: 0,
            owns_primary: true,
            owns_resolve: true,
        }
    }

    // ===== ACCESSORS =====

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn resolve_framebuffer(&self) -> Option<FramebufferId> {
        self.resolve_framebuffer
    }

    pub fn msaa_color_buffers(&self) -> &[RenderbufferId] {
        &self.msaa_color_buffers
    }

    pub fn msaa_depth_buffer(&self) -> Option<RenderbufferId> {
        self.msaa_depth_buffer
    }

    pub fn depth_renderbuffer(&self) -> Option<RenderbufferId> {
        self.depth_buffer
    }

    pub fn color_mrt_framebuffers(&self) -> &[FramebufferPair] {
        &self.color_mrt_framebuffers
    }

    /// VRAM currently charged for this target's renderbuffers
    pub fn renderbuffer_bytes(&self) -> i64 {
        self.renderbuffer_bytes
    }

    // ===== INTERNALS =====

    /// Create a renderbuffer with allocated storage, charging its
    /// footprint to the VRAM tracker.
    fn alloc_renderbuffer(
        &mut self,
        ctx: &mut DeviceContext<'_>,
        format: StorageFormat,
        width: u32,
        height: u32,
        samples: u8,
    ) -> RenderbufferId {
        let rb = ctx.gl.create_renderbuffer();
        ctx.gl.renderbuffer_storage(rb, format, width, height, samples);
        let bytes = i64::from(width)
            * i64::from(height)
            * i64::from(format.bytes_per_pixel())
            * i64::from(samples.max(1));
        ctx.vram.adjust_renderbuffer(bytes);
        self.renderbuffer_bytes += bytes;
        rb
    }

    /// Allocate and attach a depth(-stencil) renderbuffer on the currently
    /// bound framebuffer. `samples == 1` allocates single-sampled storage.
    fn setup_depth(&mut self, ctx: &mut DeviceContext<'_>, p: &TargetParams, samples: u8) {
        let (format, attachment) = if p.stencil {
            (StorageFormat::Depth24Stencil8, Attachment::DepthStencil)
        } else if ctx.caps.supports_depth_float {
            (StorageFormat::Depth32F, Attachment::Depth)
        } else {
            (StorageFormat::Depth16, Attachment::Depth)
        };
        let rb = self.alloc_renderbuffer(ctx, format, p.width, p.height, samples);
        ctx.gl.attach_renderbuffer(attachment, rb);
        if samples > 1 {
            self.msaa_depth_buffer = Some(rb);
        } else {
            self.depth_buffer = Some(rb);
        }
    }

    /// Log a completeness failure of the currently bound framebuffer.
    /// Never fatal: an incomplete target draws nothing but the frame
    /// continues, matching driver behavior.
    fn check_completeness(&self, ctx: &mut DeviceContext<'_>, p: &TargetParams, phase: &str) {
        let status = ctx.gl.framebuffer_status();
        if status != FramebufferStatus::Complete {
            gfx_error!(
                LOG_SOURCE,
                "{}framebuffer incomplete ({:?}) for render target '{}'",
                phase,
                status,
                p.name
            );
        }
    }

    /// Build one framebuffer pair per color attachment for multi-target
    /// resolve. Leaves an arbitrary framebuffer bound; the caller rebinds.
    fn create_msaa_mrt_framebuffers(&mut self, ctx: &mut DeviceContext<'_>, p: &TargetParams) {
        for (i, &handle) in p.color_buffers.iter().enumerate() {
            let msaa_fb = ctx.gl.create_framebuffer();
            ctx.set_framebuffer(Some(msaa_fb));
            ctx.gl
                .attach_renderbuffer(Attachment::Color(0), self.msaa_color_buffers[i]);

            let resolve_fb = ctx.gl.create_framebuffer();
            ctx.set_framebuffer(Some(resolve_fb));
            if let Some(tex) = ctx.textures.get(handle) {
                if let Some(id) = tex.backend_id() {
                    let face = if tex.cubemap() { p.face } else { 0 };
                    ctx.gl
                        .attach_texture(Attachment::Color(0), id, face, p.mip_level);
                }
            }

            self.color_mrt_framebuffers.push(FramebufferPair { msaa_fb, resolve_fb });
        }
    }

    /// Blit-based resolve from one framebuffer to another. The blit leaves
    /// the context's framebuffer binding undefined, so the cached binding
    /// is invalidated.
    fn internal_resolve(
        &self,
        ctx: &mut DeviceContext<'_>,
        src: Option<FramebufferId>,
        dst: Option<FramebufferId>,
        p: &TargetParams,
        mask: BlitMask,
    ) {
        assert!(
            src != dst,
            "source and destination framebuffers must differ when resolving"
        );
        ctx.gl.blit_framebuffer(src, dst, p.width, p.height, mask);
        ctx.invalidate_framebuffer_binding();
    }
}

impl Default for GlTargetBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderbuffer storage format matching a color texture's format
fn color_storage_format(format: TextureFormat) -> StorageFormat {
    match format {
        TextureFormat::RGB16F | TextureFormat::RGBA16F => StorageFormat::Rgba16F,
        TextureFormat::RGB32F | TextureFormat::RGBA32F => StorageFormat::Rgba32F,
        TextureFormat::R32F => StorageFormat::R32F,
        TextureFormat::SRGB8 | TextureFormat::SRGBA8 => StorageFormat::Srgba8,
        _ => StorageFormat::Rgba8,
    }
}

impl TargetBackend for GlTargetBackend {
    fn init(&mut self, ctx: &mut DeviceContext<'_>, p: &TargetParams) -> Result<()> {
        if p.supplied.is_supplied() {
            // Adopt the externally managed surface; attachment allocation
            // is the supplier's responsibility.
            self.framebuffer = match p.supplied {
                SuppliedFramebuffer::External(fb) => Some(fb),
                _ => None,
            };
            self.owns_primary = false;
        } else {
            let fb = ctx.gl.create_framebuffer();
            self.framebuffer = Some(fb);
            self.owns_primary = true;
            ctx.set_framebuffer(Some(fb));

            // Color texture attachments, in slot order
            let mut attachments: Vec<u32> = Vec::with_capacity(p.color_buffers.len());
            for (i, &handle) in p.color_buffers.iter().enumerate() {
                if let Some(id) = ctx.force_texture_backend(handle) {
                    let face = match ctx.textures.get(handle) {
                        Some(tex) if tex.cubemap() => p.face,
                        _ => 0,
                    };
                    let slot = i as u32;
                    ctx.gl
                        .attach_texture(Attachment::Color(slot), id, face, p.mip_level);
                    attachments.push(slot);
                }
            }
            if ctx.caps.supports_mrt() {
                ctx.gl.draw_buffers(&attachments);
            }

            let will_render_msaa = p.samples > 1 && ctx.caps.supports_msaa;
            if let Some(handle) = p.depth_buffer {
                // Depth capture texture wins over a renderbuffer
                if let Some(id) = ctx.force_texture_backend(handle) {
                    let face = match ctx.textures.get(handle) {
                        Some(tex) if tex.cubemap() => p.face,
                        _ => 0,
                    };
                    let attachment = if p.stencil {
                        Attachment::DepthStencil
                    } else {
                        Attachment::Depth
                    };
                    ctx.gl.attach_texture(attachment, id, face, 0);
                }
            } else if p.depth && !will_render_msaa {
                // With MSAA the depth renderbuffer lives on the MSAA
                // framebuffer instead
                self.setup_depth(ctx, p, 1);
            }

            self.check_completeness(ctx, p, "");
        }

        // MSAA phase: demote the framebuffer built above to the resolve
        // destination and render into a fresh multisampled one.
        if p.samples > 1 && ctx.caps.supports_msaa {
            self.resolve_framebuffer = self.framebuffer;
            self.owns_resolve = self.owns_primary;

            let msaa_fb = ctx.gl.create_framebuffer();
            self.framebuffer = Some(msaa_fb);
            self.owns_primary = true;
            ctx.set_framebuffer(Some(msaa_fb));

            if p.supplied.is_supplied() {
                // The supplied surface's layout is opaque; mirror the
                // backbuffer format in a single combined renderbuffer.
                let format = ctx.caps.back_buffer_format;
                let rb = self.alloc_renderbuffer(ctx, format, p.width, p.height, p.samples);
                ctx.gl.attach_renderbuffer(Attachment::Color(0), rb);
                self.msaa_color_buffers.push(rb);
            } else {
                for (i, &handle) in p.color_buffers.iter().enumerate() {
                    let format = ctx
                        .textures
                        .get(handle)
                        .map(|t| t.format())
                        .unwrap_or(TextureFormat::RGBA8);
                    let rb = self.alloc_renderbuffer(
                        ctx,
                        color_storage_format(format),
                        p.width,
                        p.height,
                        p.samples,
                    );
                    ctx.gl.attach_renderbuffer(Attachment::Color(i as u32), rb);
                    self.msaa_color_buffers.push(rb);
                }
            }

            if p.depth {
                self.setup_depth(ctx, p, p.samples);
            }

            self.check_completeness(ctx, p, "MSAA ");

            // A supplied surface carries no per-attachment destination
            // textures, only the single combined renderbuffer above, so
            // the pair route never applies to it.
            if p.color_buffers.len() > 1 && !p.supplied.is_supplied() {
                self.create_msaa_mrt_framebuffers(ctx, p);
                // Rendering continues into the MSAA framebuffer
                ctx.set_framebuffer(Some(msaa_fb));
                let attachments: Vec<u32> = (0..p.color_buffers.len() as u32).collect();
                ctx.gl.draw_buffers(&attachments);
            }
        }

        Ok(())
    }

    fn resolve(&mut self, ctx: &mut DeviceContext<'_>, p: &TargetParams, color: bool, depth: bool) {
        if p.samples <= 1 || !ctx.caps.supports_msaa {
            return;
        }

        if !self.color_mrt_framebuffers.is_empty() {
            // Multi-target path: each color attachment resolves through
            // its own framebuffer pair, depth through the primary pair.
            if color {
                for pair in &self.color_mrt_framebuffers {
                    self.internal_resolve(
                        ctx,
                        Some(pair.msaa_fb),
                        Some(pair.resolve_fb),
                        p,
                        BlitMask::COLOR,
                    );
                }
            }
            if depth && p.depth {
                let mut mask = BlitMask::DEPTH;
                if p.stencil {
                    mask |= BlitMask::STENCIL;
                }
                self.internal_resolve(ctx, self.framebuffer, self.resolve_framebuffer, p, mask);
            }
        } else {
            let mut mask = BlitMask::empty();
            if color {
                mask |= BlitMask::COLOR;
            }
            if depth && p.depth {
                mask |= BlitMask::DEPTH;
                if p.stencil {
                    mask |= BlitMask::STENCIL;
                }
            }
            if !mask.is_empty() {
                self.internal_resolve(ctx, self.framebuffer, self.resolve_framebuffer, p, mask);
            }
        }

        // Subsequent draws keep rendering into the MSAA framebuffer
        ctx.set_framebuffer(self.framebuffer);
    }

    fn destroy(&mut self, ctx: &mut DeviceContext<'_>) {
        if let Some(fb) = self.framebuffer.take() {
            if self.owns_primary {
                ctx.gl.delete_framebuffer(fb);
            }
        }
        if let Some(fb) = self.resolve_framebuffer.take() {
            if self.owns_resolve {
                ctx.gl.delete_framebuffer(fb);
            }
        }
        if let Some(rb) = self.depth_buffer.take() {
            ctx.gl.delete_renderbuffer(rb);
        }
        if let Some(rb) = self.msaa_depth_buffer.take() {
            ctx.gl.delete_renderbuffer(rb);
        }
        for rb in self.msaa_color_buffers.drain(..) {
            ctx.gl.delete_renderbuffer(rb);
        }
        for pair in self.color_mrt_framebuffers.drain(..) {
            ctx.gl.delete_framebuffer(pair.msaa_fb);
            ctx.gl.delete_framebuffer(pair.resolve_fb);
        }
        if self.renderbuffer_bytes != 0 {
            ctx.vram.adjust_renderbuffer(-self.renderbuffer_bytes);
            self.renderbuffer_bytes = 0;
        }
        ctx.invalidate_framebuffer_binding();
    }

    fn lose_context(&mut self) {
        // Handles died with the context; no driver deletes. The device
        // credits the renderbuffer VRAM before calling this.
        self.framebuffer = None;
        self.resolve_framebuffer = None;
        self.msaa_color_buffers.clear();
        self.msaa_depth_buffer = None;
        self.depth_buffer = None;
        self.color_mrt_framebuffers.clear();
        self.renderbuffer_bytes = 0;
        self.owns_primary = true;
        self.owns_resolve = true;
    }

    fn as_gl(&self) -> Option<&GlTargetBackend> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "gl_tests.rs"]
mod tests;
