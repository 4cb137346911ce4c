use super::*;

use crate::backend::mock_context::{CallLog, GlCall, MockContext};
use crate::device::vram::TextureProfile;
use crate::target::{RenderTargetDesc, SuppliedFramebuffer};
use crate::texture::{TextureDesc, TextureFormat, TextureLockOptions};

fn mock_device() -> (GraphicsDevice, CallLog) {
    let mock = MockContext::new();
    let log = mock.call_log();
    (
        GraphicsDevice::new(BackendKind::WebGl2, Box::new(mock), 640, 480),
        log,
    )
}

fn small_texture(device: &mut GraphicsDevice) -> TextureHandle {
    device
        .create_texture(TextureDesc {
            width: 4,
            height: 4,
            mipmaps: false,
            ..Default::default()
        })
        .unwrap()
}

fn count(log: &CallLog, f: impl Fn(&GlCall) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|c| f(c)).count()
}

// ===== TEXTURE LIFECYCLE =====

#[test]
fn test_create_texture_accounts_vram() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    assert_eq!(device.vram().tex, 4 * 4 * 4);
    assert!(device.texture(handle).is_some());
}

#[test]
fn test_vram_balances_to_zero_after_destroy() {
    let mut device = GraphicsDevice::headless(640, 480);
    let plain = small_texture(&mut device);
    let shadow = device
        .create_texture(TextureDesc {
            width: 8,
            height: 8,
            format: TextureFormat::DEPTH,
            mipmaps: false,
            profile: TextureProfile::Shadow,
            ..Default::default()
        })
        .unwrap();
    assert!(device.vram().tex > 0);
    assert_eq!(device.vram().tex_shadow, 8 * 8 * 4);

    device.destroy_texture(plain).unwrap();
    device.destroy_texture(shadow).unwrap();
    assert_eq!(device.vram().tex, 0);
    assert_eq!(device.vram().tex_shadow, 0);
}

#[test]
fn test_resize_reaccounts_vram() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    device.resize_texture(handle, 8, 8).unwrap();
    assert_eq!(device.vram().tex, 8 * 8 * 4);
    assert_eq!(device.texture(handle).unwrap().width(), 8);
}

#[test]
fn test_cubemap_must_be_square() {
    let mut device = GraphicsDevice::headless(640, 480);
    let result = device.create_texture(TextureDesc {
        width: 8,
        height: 4,
        cubemap: true,
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_oversized_texture_is_clamped() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = device
        .create_texture(TextureDesc {
            width: 100_000,
            height: 4,
            mipmaps: false,
            ..Default::default()
        })
        .unwrap();
    let max = device.caps().max_texture_size;
    assert_eq!(device.texture(handle).unwrap().width(), max);
}

#[test]
fn test_stale_texture_handle_errors() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    device.destroy_texture(handle).unwrap();
    assert!(device.destroy_texture(handle).is_err());
    assert!(device.texture(handle).is_none());
}

// ===== TEXTURE BINDING AND UPLOAD =====

#[test]
fn test_set_texture_uploads_then_caches() {
    let (mut device, log) = mock_device();
    let handle = small_texture(&mut device);
    {
        let tex = device.texture_mut(handle).unwrap();
        tex.lock(TextureLockOptions::default()).unwrap()[0] = 1;
        tex.unlock();
    }

    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::CreateTexture(_))), 1);
    assert_eq!(
        count(&log, |c| matches!(c, GlCall::UploadLevel { has_data: true, .. })),
        1
    );
    assert_eq!(count(&log, |c| matches!(c, GlCall::ApplySampler { .. })), 1);

    // Second bind has nothing left to flush
    log.lock().unwrap().clear();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::UploadLevel { .. })), 0);
    assert_eq!(count(&log, |c| matches!(c, GlCall::ApplySampler { .. })), 0);
    assert_eq!(count(&log, |c| matches!(c, GlCall::BindTexture { .. })), 1);
}

#[test]
fn test_set_texture_generates_mipmaps_once() {
    let (mut device, log) = mock_device();
    let handle = device
        .create_texture(TextureDesc {
            width: 16,
            height: 16,
            ..Default::default()
        })
        .unwrap();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::GenerateMipmaps(_))), 1);

    log.lock().unwrap().clear();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::GenerateMipmaps(_))), 0);

    // Touching the base level schedules regeneration
    device.texture_mut(handle).unwrap().upload();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::GenerateMipmaps(_))), 1);
}

#[test]
fn test_set_texture_uploads_every_cubemap_face() {
    let (mut device, log) = mock_device();
    let handle = device
        .create_texture(TextureDesc {
            width: 4,
            height: 4,
            cubemap: true,
            mipmaps: false,
            ..Default::default()
        })
        .unwrap();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(count(&log, |c| matches!(c, GlCall::UploadLevel { .. })), 6);
}

#[test]
fn test_set_texture_rejects_invalid_unit() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    let beyond = device.caps().max_texture_units;
    assert!(device.set_texture(handle, beyond).is_err());
}

#[test]
fn test_destroy_texture_clears_unit_binding() {
    let (mut device, log) = mock_device();
    let handle = small_texture(&mut device);
    device.set_texture(handle, 2).unwrap();
    assert!(device.binding().texture_unit(2).is_some());

    device.destroy_texture(handle).unwrap();
    assert!(device.binding().texture_unit(2).is_none());
    assert_eq!(count(&log, |c| matches!(c, GlCall::DeleteTexture(_))), 1);
}

#[test]
fn test_sampler_change_flushes_on_next_bind() {
    let (mut device, log) = mock_device();
    let handle = small_texture(&mut device);
    device.set_texture(handle, 0).unwrap();

    device
        .texture_mut(handle)
        .unwrap()
        .set_min_filter(crate::texture::Filter::Nearest);

    log.lock().unwrap().clear();
    device.set_texture(handle, 0).unwrap();
    assert_eq!(
        count(&log, |c| matches!(
            c,
            GlCall::ApplySampler { dirty, .. } if *dirty == crate::texture::TextureDirty::MIN_FILTER
        )),
        1
    );
}

// ===== READBACK =====

#[test]
fn test_read_texture_returns_level_size() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    device.set_texture(handle, 0).unwrap();
    let data = device.read_texture(handle, 0).unwrap();
    assert_eq!(data.len(), 4 * 4 * 4);
}

#[test]
fn test_read_texture_without_backend_storage_errors() {
    let mut device = GraphicsDevice::headless(640, 480);
    let handle = small_texture(&mut device);
    assert!(device.read_texture(handle, 0).is_err());
}

// ===== RENDER TARGET LIFECYCLE =====

#[test]
fn test_target_dimensions_follow_mip_level() {
    let mut device = GraphicsDevice::headless(640, 480);
    let color = device
        .create_texture(TextureDesc {
            width: 64,
            height: 64,
            ..Default::default()
        })
        .unwrap();
    let rt = device
        .create_render_target(RenderTargetDesc {
            color_buffers: vec![color],
            mip_level: 2,
            ..Default::default()
        })
        .unwrap();
    let target = device.render_target(rt).unwrap();
    assert_eq!(target.width(), 16);
    assert_eq!(target.height(), 16);
}

#[test]
fn test_attachment_less_target_uses_backbuffer_size() {
    let mut device = GraphicsDevice::headless(640, 480);
    let rt = device
        .create_render_target(RenderTargetDesc {
            supplied: SuppliedFramebuffer::Default,
            ..Default::default()
        })
        .unwrap();
    let target = device.render_target(rt).unwrap();
    assert_eq!(target.width(), 640);
    assert_eq!(target.height(), 480);
}

#[test]
fn test_samples_clamped_to_device_support() {
    let mut device = GraphicsDevice::headless(640, 480);
    let rt = device
        .create_render_target(RenderTargetDesc {
            samples: 16,
            supplied: SuppliedFramebuffer::Default,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(device.render_target(rt).unwrap().samples(), 4);

    let mut gl1 = GraphicsDevice::new(
        BackendKind::WebGl1,
        Box::new(crate::backend::NullContext::new()),
        640,
        480,
    );
    let rt = gl1
        .create_render_target(RenderTargetDesc {
            samples: 4,
            supplied: SuppliedFramebuffer::Default,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(gl1.render_target(rt).unwrap().samples(), 1);
}

#[test]
fn test_color_attachments_truncated_to_device_limit() {
    let mut device = GraphicsDevice::headless(640, 480);
    let colors: Vec<_> = (0..10)
        .map(|_| {
            device
                .create_texture(TextureDesc {
                    width: 16,
                    height: 16,
                    mipmaps: false,
                    ..Default::default()
                })
                .unwrap()
        })
        .collect();
    let rt = device
        .create_render_target(RenderTargetDesc {
            color_buffers: colors,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        device.render_target(rt).unwrap().color_buffers().len() as u32,
        device.caps().max_color_attachments
    );
}

#[test]
fn test_stale_attachment_handle_rejected() {
    let mut device = GraphicsDevice::headless(640, 480);
    let color = small_texture(&mut device);
    device.destroy_texture(color).unwrap();
    let result = device.create_render_target(RenderTargetDesc {
        color_buffers: vec![color],
        ..Default::default()
    });
    assert!(result.is_err());
}

#[test]
fn test_named_target_registry() {
    let mut device = GraphicsDevice::headless(640, 480);
    let rt = device
        .create_render_target(RenderTargetDesc {
            name: "shadow-cascade-0".to_string(),
            supplied: SuppliedFramebuffer::Default,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(device.render_target_by_name("shadow-cascade-0"), Some(rt));
    assert_eq!(device.render_target_by_name("missing"), None);

    device.destroy_render_target(rt).unwrap();
    assert_eq!(device.render_target_by_name("shadow-cascade-0"), None);
}

#[test]
fn test_bind_render_target_initializes_lazily() {
    let (mut device, log) = mock_device();
    let color = small_texture(&mut device);
    let rt = device
        .create_render_target(RenderTargetDesc {
            color_buffers: vec![color],
            ..Default::default()
        })
        .unwrap();
    assert!(!device.render_target(rt).unwrap().initialized());

    device.bind_render_target(Some(rt)).unwrap();
    assert!(device.render_target(rt).unwrap().initialized());

    let fb = device
        .render_target(rt)
        .unwrap()
        .backend()
        .as_gl()
        .unwrap()
        .framebuffer();
    let last_bind = log
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find_map(|c| match c {
            GlCall::BindFramebuffer(fb) => Some(*fb),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_bind, fb);

    device.bind_render_target(None).unwrap();
    assert_eq!(count(&log, |c| *c == GlCall::BindFramebuffer(None)), 1);
}

#[test]
fn test_destroy_target_keeps_attachment_textures() {
    let mut device = GraphicsDevice::headless(640, 480);
    let color = small_texture(&mut device);
    let rt = device
        .create_render_target(RenderTargetDesc {
            color_buffers: vec![color],
            ..Default::default()
        })
        .unwrap();
    device.init_render_target(rt).unwrap();
    device.destroy_render_target(rt).unwrap();
    assert!(device.texture(color).is_some());
    assert!(device.render_target(rt).is_none());
}

// ===== CONTEXT LOSS =====

#[test]
fn test_lose_context_marks_everything_for_rebuild() {
    let mut device = GraphicsDevice::headless(640, 480);
    let color = small_texture(&mut device);
    device.set_texture(color, 0).unwrap();
    let rt = device
        .create_render_target(RenderTargetDesc {
            color_buffers: vec![color],
            ..Default::default()
        })
        .unwrap();
    device.init_render_target(rt).unwrap();

    device.lose_context();
    assert!(device.context_lost());
    assert!(device.texture(color).unwrap().backend_id().is_none());
    assert!(device.texture(color).unwrap().needs_upload());
    assert!(!device.render_target(rt).unwrap().initialized());
    assert!(device.binding().texture_unit(0).is_none());

    device.restore_context();
    assert!(!device.context_lost());
    device.set_texture(color, 0).unwrap();
    device.init_render_target(rt).unwrap();
    assert!(device.render_target(rt).unwrap().initialized());
    assert!(device.texture(color).unwrap().backend_id().is_some());
}
