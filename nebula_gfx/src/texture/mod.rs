/// Texture module - pixel formats and the texture resource lifecycle

// Module declarations
pub mod format;
pub mod texture;

// Re-export everything from format.rs
pub use format::*;

// Re-export from texture.rs
pub use texture::*;
