//! GL device abstraction
//!
//! Everything above this module talks to the GPU through [`GlDevice`]. The
//! calls mirror the GL ES 3 entry points the framebuffer manager and the
//! program builder need, with typed handles instead of bare `GLuint`s so a
//! renderbuffer can never be passed where a texture is expected.

use crate::error::DeviceError;
use std::num::NonZeroU32;

macro_rules! gl_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub NonZeroU32);

            impl $name {
                pub fn raw(self) -> u32 {
                    self.0.get()
                }
            }
        )*
    };
}

gl_handle!(
    TextureId,
    RenderbufferId,
    FramebufferId,
    ShaderId,
    ProgramId,
    BufferId,
    /// A ring of textures owned by the compositor side of the device
    SwapChainId,
);

/// Resolved uniform location inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Raw GL internal formats used by render targets and textures
pub mod format {
    pub const RGBA8: u32 = 0x8058;
    pub const SRGB8_ALPHA8: u32 = 0x8C43;
    pub const DEPTH_COMPONENT16: u32 = 0x81A5;
    pub const DEPTH_COMPONENT24: u32 = 0x81A6;
    pub const DEPTH24_STENCIL8: u32 = 0x88F0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    Texture2D,
    Texture2DArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferTarget {
    Framebuffer,
    Draw,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Color0,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Storage flavor for `renderbuffer_storage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderbufferSamples {
    Single,
    /// Core ES 3.0 multisample storage, resolved with an explicit blit
    Multisample(i32),
    /// `EXT_multisampled_render_to_texture` storage, resolved implicitly
    RenderToTexture(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(u32),
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferMask: u32 {
        const COLOR = 0b01;
        const DEPTH = 0b10;
    }
}

pub trait GlDevice {
    /// Space separated extension names
    fn extension_string(&mut self) -> String;

    // ── Textures ──
    fn create_texture(&mut self) -> Result<TextureId, DeviceError>;
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>);
    fn tex_storage_3d(&mut self, target: TextureTarget, levels: i32, format: u32, width: i32, height: i32, depth: i32);
    /// Upload tightly packed RGBA8 pixels to the bound 2D texture
    fn tex_image_2d_rgba8(&mut self, width: i32, height: i32, pixels: &[u8]);
    fn generate_mipmap(&mut self, target: TextureTarget);
    fn set_texture_wrap(&mut self, target: TextureTarget, s: TextureWrap, t: TextureWrap);
    fn set_texture_filter(&mut self, target: TextureTarget, min: TextureFilter, mag: TextureFilter);
    fn set_texture_border_color(&mut self, target: TextureTarget, color: [f32; 4]);
    fn delete_texture(&mut self, texture: TextureId);

    // ── Swap chains ──
    fn create_texture_swap_chain(
        &mut self,
        target: TextureTarget,
        format: u32,
        width: i32,
        height: i32,
        levels: i32,
        count: usize,
    ) -> Result<SwapChainId, DeviceError>;
    fn swap_chain_length(&self, chain: SwapChainId) -> usize;
    fn swap_chain_texture(&self, chain: SwapChainId, index: usize) -> Option<TextureId>;
    fn destroy_texture_swap_chain(&mut self, chain: SwapChainId);

    // ── Renderbuffers ──
    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, DeviceError>;
    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferId>);
    fn renderbuffer_storage(&mut self, samples: RenderbufferSamples, format: u32, width: i32, height: i32);
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    // ── Framebuffers ──
    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError>;
    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>);
    /// `samples` selects the multisampled render-to-texture attachment
    fn framebuffer_texture_2d(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
    );
    fn framebuffer_texture_multiview(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
        base_view: i32,
        num_views: i32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        renderbuffer: Option<RenderbufferId>,
    );
    fn check_framebuffer_status(&mut self, target: FramebufferTarget) -> FramebufferStatus;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    /// `GL_SAMPLES` of the current binding
    fn current_samples(&mut self) -> i32;
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: BufferMask);
    fn invalidate_framebuffer(&mut self, target: FramebufferTarget, attachments: &[Attachment]);
    /// Same-size blit from the READ to the DRAW binding
    fn blit_framebuffer(&mut self, width: i32, height: i32, mask: BufferMask, filter: TextureFilter);

    // ── Shaders and programs ──
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError>;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    /// Compile and report `GL_COMPILE_STATUS`
    fn compile_shader(&mut self, shader: ShaderId) -> bool;
    fn shader_info_log(&mut self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);
    fn create_program(&mut self) -> Result<ProgramId, DeviceError>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn bind_attrib_location(&mut self, program: ProgramId, index: u32, name: &str);
    /// Link and report `GL_LINK_STATUS`
    fn link_program(&mut self, program: ProgramId) -> bool;
    fn program_info_log(&mut self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_block_index(&mut self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_block_binding(&mut self, program: ProgramId, block: u32, binding: u32);
    fn uniform_1i(&mut self, location: UniformLocation, value: i32);

    // ── Uniform buffers ──
    fn create_buffer(&mut self) -> Result<BufferId, DeviceError>;
    fn uniform_buffer_data(&mut self, buffer: BufferId, data: &[u8]);
    fn bind_uniform_buffer_base(&mut self, binding: u32, buffer: Option<BufferId>);
    fn delete_buffer(&mut self, buffer: BufferId);
}
