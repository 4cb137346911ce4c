/// Render target module

// Module declarations
pub mod render_target;

// Re-export everything from render_target.rs
pub use render_target::*;
