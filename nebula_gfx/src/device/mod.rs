/// Device module

// Module declarations
pub mod graphics_device;
pub mod vram;

// Re-exports
pub use graphics_device::*;
pub use vram::*;
