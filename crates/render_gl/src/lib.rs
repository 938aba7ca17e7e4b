//! GL ES rendering core: device seam, surface setup, swap-chain render
//! targets and shader programs.

pub mod caps;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod glow_backend; // GlDevice over a live glow context
pub mod headless;     // GPU-less device and display
pub mod program;
pub mod surface;
pub mod texture;

pub use caps::GpuCaps;
pub use device::GlDevice;
pub use error::{DeviceError, FramebufferError, ProgramError, SurfaceError, TextureError};
pub use framebuffer::{DepthBufferPolicy, Framebuffer, FramebufferDesc, MultisampleStrategy};
pub use glow_backend::GlowDevice;
pub use headless::{HeadlessDisplay, RecordingDevice};
pub use program::{
    GlProgram, ProgramParm, ProgramParmType, ProgramSource, SceneMatrices, SceneMatricesBuffer, ShaderEnvironment,
};
pub use surface::{ContextPriority, DisplayBackend, GlSetup, SurfaceRequest};
pub use texture::GlTexture;
