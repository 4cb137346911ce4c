/// Backend module - the driver command surface and the render-target
/// backend implementations built on top of it.

// Module declarations
pub mod context;
pub mod gl;
pub mod null;

// Re-export everything from context.rs
pub use context::*;

// Re-export backend implementations
pub use gl::*;
pub use null::*;

// Mock recording context for tests (no GPU required)
#[cfg(test)]
pub mod mock_context;

use crate::device::DeviceContext;
use crate::error::Result;
use crate::target::TargetParams;

/// Which backend a device was created for.
///
/// Selected once at device creation; the concrete render-target backend is
/// constructed from it via `create_target_backend`. Further backends (e.g.
/// WebGPU) plug in as external crates implementing `TargetBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    WebGl1,
    WebGl2,
    Null,
}

/// Per-render-target backend state: owns the framebuffer object graph and
/// orchestrates creation, completeness validation, context-loss recovery
/// and MSAA resolve.
pub trait TargetBackend {
    /// Allocate every GPU object required to make the target renderable.
    /// Called exactly once per target; the idempotence guard lives on the
    /// device (`initialized` check in `init_render_target`).
    fn init(&mut self, ctx: &mut DeviceContext<'_>, params: &TargetParams) -> Result<()>;

    /// Copy the current frame's MSAA contents into their single-sampled
    /// destinations. No-op when MSAA is unsupported or `samples <= 1`.
    fn resolve(&mut self, ctx: &mut DeviceContext<'_>, params: &TargetParams, color: bool, depth: bool);

    /// Release all GPU objects through the context
    fn destroy(&mut self, ctx: &mut DeviceContext<'_>);

    /// Drop all handles without driver deletes (the context is gone) so the
    /// target is lazily rebuilt on next use
    fn lose_context(&mut self);

    /// Downcast to the GL backend (returns None for other backends)
    fn as_gl(&self) -> Option<&gl::GlTargetBackend> {
        None
    }
}

/// Construct the render-target backend for a backend kind
pub fn create_target_backend(kind: BackendKind) -> Box<dyn TargetBackend> {
    match kind {
        BackendKind::WebGl1 | BackendKind::WebGl2 => Box::new(gl::GlTargetBackend::new()),
        BackendKind::Null => Box::new(null::NullTargetBackend),
    }
}
