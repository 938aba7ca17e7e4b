use crate::device::ShaderStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to create {kind}: {reason}")]
    Create { kind: &'static str, reason: String },
}

impl DeviceError {
    pub fn create(kind: &'static str, reason: impl Into<String>) -> Self {
        DeviceError::Create {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("display initialization failed")]
    DisplayInit,
    #[error("no acceptable display config for r{red} g{green} b{blue} depth {depth} samples {samples}")]
    NoMatchingConfig {
        red: i32,
        green: i32,
        blue: i32,
        depth: i32,
        samples: i32,
    },
    #[error("no GL ES context between version {requested} and 2")]
    ContextCreation { requested: i32 },
    #[error("pbuffer surface creation failed")]
    PbufferCreation,
    #[error("make current failed")]
    MakeCurrent,
}

#[derive(Error, Debug)]
pub enum FramebufferError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("texture swap chain is empty")]
    EmptySwapChain,
    #[error("swap chain has no image at index {0}")]
    MissingImage(usize),
    #[error("depth swap chain length {depth} does not match color length {color}")]
    DepthChainLength { color: usize, depth: usize },
    #[error("{kind} FBO {index} is not complete: {status:#x}")]
    Incomplete {
        kind: &'static str,
        index: usize,
        status: u32,
    },
}

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("failed to compile {} shader: {log}", .stage.name())]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link program: {log}")]
    Link { log: String },
}

#[derive(Error, Debug)]
pub enum TextureError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("pixel buffer holds {actual} bytes, {expected} expected for {width}x{height} RGBA8")]
    PixelSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
