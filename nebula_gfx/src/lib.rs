/*!
# Nebula GFX

Graphics resource management core for the Nebula rendering stack.

This crate owns the GPU resource lifecycle: textures with lazy backend
storage and dirty-state tracking, render targets built from texture
attachments (including MSAA and multiple-render-target configurations),
VRAM accounting, and context-loss recovery. Driver traffic goes through
the `GlContext` trait; backend implementations (WebGPU, native GL, etc.)
are provided as separate crates, with a headless `NullContext` built in.

## Architecture

- **GraphicsDevice**: owner of every resource, arena-addressed by handle
- **Texture**: logical pixel container with lazily created backend storage
- **RenderTarget**: attachment set with a per-backend framebuffer graph
- **GlContext**: the raw driver command surface
- **TargetBackend**: per-target GPU state (framebuffers, MSAA resolve)
*/

// Internal modules
mod error;
pub mod backend;
pub mod device;
pub mod log;
pub mod target;
pub mod texture;

// Main nebula namespace module
pub mod nebula {
    // Error types
    pub use crate::error::{Error, Result};

    // Device and handles
    pub use crate::device::{
        BindingState, DeviceCaps, DeviceContext, GraphicsDevice, RenderTargetHandle,
        TextureHandle, TextureProfile, VramTracker,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
        // Note: gfx_* macros are NOT re-exported here - they are internal only
    }

    // Texture sub-module
    pub mod texture {
        pub use crate::texture::*;
    }

    // Render-target sub-module
    pub mod target {
        pub use crate::target::*;
    }

    // Backend sub-module
    pub mod backend {
        pub use crate::backend::*;
    }
}

// Error types at crate root for `?` ergonomics inside the crate
pub use error::{Error, Result};
