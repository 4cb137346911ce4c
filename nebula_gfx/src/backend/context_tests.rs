use super::*;
use crate::backend::null::NullContext;

#[test]
fn test_null_context_hands_out_sequential_handles() {
    let mut ctx = NullContext::new();
    assert_eq!(ctx.create_framebuffer(), FramebufferId(1));
    assert_eq!(ctx.create_framebuffer(), FramebufferId(2));
    assert_eq!(ctx.create_renderbuffer(), RenderbufferId(1));
    assert_eq!(ctx.create_texture(), TextureId(1));
    assert_eq!(ctx.create_texture(), TextureId(2));
}

#[test]
fn test_null_context_is_always_complete() {
    let mut ctx = NullContext::new();
    let fb = ctx.create_framebuffer();
    ctx.bind_framebuffer(Some(fb));
    assert_eq!(ctx.framebuffer_status(), FramebufferStatus::Complete);
}

#[test]
fn test_null_context_readback_is_zeroed() {
    let mut ctx = NullContext::new();
    let tex = ctx.create_texture();
    let data = ctx.read_level(tex, 0, 64);
    assert_eq!(data.len(), 64);
    assert!(data.iter().all(|&b| b == 0));
}

#[test]
fn test_blit_mask_composition() {
    let mask = BlitMask::COLOR | BlitMask::DEPTH;
    assert!(mask.contains(BlitMask::COLOR));
    assert!(!mask.contains(BlitMask::STENCIL));
    assert!((mask | BlitMask::STENCIL).contains(BlitMask::STENCIL));
}

#[test]
fn test_handles_compare_by_value() {
    assert_eq!(FramebufferId(3), FramebufferId(3));
    assert_ne!(FramebufferId(3), FramebufferId(4));
}
