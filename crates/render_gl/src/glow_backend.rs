//! [`GlDevice`] over a live GL ES 3 context through `glow`
//!
//! Texture swap chains are plain texture rings owned by the device. The
//! `EXT_multisampled_render_to_texture` and `OVR_multiview` entry points are
//! not exposed by native `glow`, so those extensions are hidden from the
//! reported extension string. The framebuffer manager then falls back to the
//! blit resolve and to one conventional target per swap-chain image.

use crate::device::*;
use crate::error::DeviceError;
use glow::HasContext;
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Extensions whose entry points this backend cannot issue
const UNSUPPORTED_EXTENSIONS: [&str; 3] = [
    "GL_EXT_multisampled_render_to_texture",
    "GL_OVR_multiview2",
    "GL_OVR_multiview_multisampled_render_to_texture",
];

pub fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::Texture2DArray => glow::TEXTURE_2D_ARRAY,
    }
}

pub fn framebuffer_target(target: FramebufferTarget) -> u32 {
    match target {
        FramebufferTarget::Framebuffer => glow::FRAMEBUFFER,
        FramebufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
        FramebufferTarget::Read => glow::READ_FRAMEBUFFER,
    }
}

pub fn attachment(att: Attachment) -> u32 {
    match att {
        Attachment::Color0 => glow::COLOR_ATTACHMENT0,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
    }
}

pub fn wrap_mode(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
    }) as i32
}

pub fn filter_mode(filter: TextureFilter) -> u32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }
}

pub fn buffer_bits(mask: BufferMask) -> u32 {
    let mut bits = 0;
    if mask.contains(BufferMask::COLOR) {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.contains(BufferMask::DEPTH) {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    bits
}

pub fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// Space separated extension list with the unsupported entries removed
pub fn filter_extensions<'a>(extensions: impl IntoIterator<Item = &'a str>) -> String {
    let mut kept: Vec<&str> = extensions
        .into_iter()
        .filter(|ext| !UNSUPPORTED_EXTENSIONS.contains(ext))
        .collect();
    kept.sort_unstable();
    kept.join(" ")
}

/// GL ES device bound to one context
///
/// Every method issues GL calls; the context passed to [`GlowDevice::new`]
/// must stay current on the calling thread for the device's lifetime.
pub struct GlowDevice {
    gl: glow::Context,
    swap_chains: HashMap<u32, Vec<TextureId>>,
    next_chain: u32,
}

impl GlowDevice {
    /// # Safety
    /// `gl` must be current on this thread whenever the device is used.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            swap_chains: HashMap::new(),
            next_chain: 0,
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn tex(id: TextureId) -> glow::NativeTexture {
    glow::NativeTexture(id.0)
}

fn rb(id: RenderbufferId) -> glow::NativeRenderbuffer {
    glow::NativeRenderbuffer(id.0)
}

fn fbo(id: FramebufferId) -> glow::NativeFramebuffer {
    glow::NativeFramebuffer(id.0)
}

fn shader(id: ShaderId) -> glow::NativeShader {
    glow::NativeShader(id.0)
}

fn program(id: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(id.0)
}

fn buffer(id: BufferId) -> glow::NativeBuffer {
    glow::NativeBuffer(id.0)
}

// SAFETY (all blocks below): the constructor contract keeps the context current.
impl GlDevice for GlowDevice {
    fn extension_string(&mut self) -> String {
        filter_extensions(self.gl.supported_extensions().iter().map(String::as_str))
    }

    fn create_texture(&mut self) -> Result<TextureId, DeviceError> {
        unsafe { self.gl.create_texture() }
            .map(|t| TextureId(t.0))
            .map_err(|e| DeviceError::create("texture", e))
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>) {
        unsafe { self.gl.bind_texture(texture_target(target), texture.map(tex)) }
    }

    fn tex_storage_3d(&mut self, target: TextureTarget, levels: i32, format: u32, width: i32, height: i32, depth: i32) {
        unsafe {
            self.gl
                .tex_storage_3d(texture_target(target), levels, format, width, height, depth)
        }
    }

    fn tex_image_2d_rgba8(&mut self, width: i32, height: i32, pixels: &[u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            let levels = 1 + (width.max(height).max(1) as u32).ilog2() as i32;
            self.gl
                .tex_storage_2d(glow::TEXTURE_2D, levels, glow::RGBA8, width, height);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn generate_mipmap(&mut self, target: TextureTarget) {
        unsafe { self.gl.generate_mipmap(texture_target(target)) }
    }

    fn set_texture_wrap(&mut self, target: TextureTarget, s: TextureWrap, t: TextureWrap) {
        let target = texture_target(target);
        unsafe {
            self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, wrap_mode(s));
            self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, wrap_mode(t));
        }
    }

    fn set_texture_filter(&mut self, target: TextureTarget, min: TextureFilter, mag: TextureFilter) {
        let target = texture_target(target);
        unsafe {
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, filter_mode(min) as i32);
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, filter_mode(mag) as i32);
        }
    }

    fn set_texture_border_color(&mut self, target: TextureTarget, color: [f32; 4]) {
        unsafe {
            self.gl
                .tex_parameter_f32_slice(texture_target(target), glow::TEXTURE_BORDER_COLOR, &color)
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        unsafe { self.gl.delete_texture(tex(texture)) }
    }

    fn create_texture_swap_chain(
        &mut self,
        target: TextureTarget,
        format: u32,
        width: i32,
        height: i32,
        levels: i32,
        count: usize,
    ) -> Result<SwapChainId, DeviceError> {
        let layers = match target {
            TextureTarget::Texture2D => 1,
            TextureTarget::Texture2DArray => 2,
        };
        let gl_target = texture_target(target);
        let mut textures = Vec::with_capacity(count);
        for _ in 0..count {
            let id = match self.create_texture() {
                Ok(id) => id,
                Err(err) => {
                    for t in textures {
                        self.delete_texture(t);
                    }
                    return Err(err);
                }
            };
            unsafe {
                self.gl.bind_texture(gl_target, Some(tex(id)));
                if layers == 1 {
                    self.gl.tex_storage_2d(gl_target, levels, format, width, height);
                } else {
                    self.gl
                        .tex_storage_3d(gl_target, levels, format, width, height, layers);
                }
                self.gl.bind_texture(gl_target, None);
            }
            textures.push(id);
        }

        self.next_chain += 1;
        let id = NonZeroU32::new(self.next_chain).ok_or_else(|| DeviceError::create("swap chain", "id overflow"))?;
        self.swap_chains.insert(id.get(), textures);
        Ok(SwapChainId(id))
    }

    fn swap_chain_length(&self, chain: SwapChainId) -> usize {
        self.swap_chains.get(&chain.raw()).map_or(0, Vec::len)
    }

    fn swap_chain_texture(&self, chain: SwapChainId, index: usize) -> Option<TextureId> {
        self.swap_chains.get(&chain.raw()).and_then(|t| t.get(index).copied())
    }

    fn destroy_texture_swap_chain(&mut self, chain: SwapChainId) {
        if let Some(textures) = self.swap_chains.remove(&chain.raw()) {
            for t in textures {
                self.delete_texture(t);
            }
        }
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, DeviceError> {
        unsafe { self.gl.create_renderbuffer() }
            .map(|r| RenderbufferId(r.0))
            .map_err(|e| DeviceError::create("renderbuffer", e))
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferId>) {
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer.map(rb)) }
    }

    fn renderbuffer_storage(&mut self, samples: RenderbufferSamples, format: u32, width: i32, height: i32) {
        unsafe {
            match samples {
                RenderbufferSamples::Single => {
                    self.gl
                        .renderbuffer_storage(glow::RENDERBUFFER, format, width, height)
                }
                // render-to-texture storage is never selected on this backend
                RenderbufferSamples::Multisample(n) | RenderbufferSamples::RenderToTexture(n) => self
                    .gl
                    .renderbuffer_storage_multisample(glow::RENDERBUFFER, n, format, width, height),
            }
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        unsafe { self.gl.delete_renderbuffer(rb(renderbuffer)) }
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError> {
        unsafe { self.gl.create_framebuffer() }
            .map(|f| FramebufferId(f.0))
            .map_err(|e| DeviceError::create("framebuffer", e))
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>) {
        unsafe {
            self.gl
                .bind_framebuffer(framebuffer_target(target), framebuffer.map(fbo))
        }
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: FramebufferTarget,
        att: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
    ) {
        if samples.is_some() {
            tracing::warn!("multisampled render-to-texture attachment requested; attaching single-sampled");
        }
        unsafe {
            self.gl.framebuffer_texture_2d(
                framebuffer_target(target),
                attachment(att),
                glow::TEXTURE_2D,
                texture.map(tex),
                0,
            )
        }
    }

    fn framebuffer_texture_multiview(
        &mut self,
        _target: FramebufferTarget,
        _att: Attachment,
        _texture: Option<TextureId>,
        _samples: Option<i32>,
        _base_view: i32,
        _num_views: i32,
    ) {
        // GL_OVR_multiview2 is never advertised by this device
        tracing::error!("multiview attachment requested on a device without OVR_multiview");
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: FramebufferTarget,
        att: Attachment,
        renderbuffer: Option<RenderbufferId>,
    ) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                framebuffer_target(target),
                attachment(att),
                glow::RENDERBUFFER,
                renderbuffer.map(rb),
            )
        }
    }

    fn check_framebuffer_status(&mut self, target: FramebufferTarget) -> FramebufferStatus {
        let status = unsafe { self.gl.check_framebuffer_status(framebuffer_target(target)) };
        if status == glow::FRAMEBUFFER_COMPLETE {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::Incomplete(status)
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        unsafe { self.gl.delete_framebuffer(fbo(framebuffer)) }
    }

    fn current_samples(&mut self) -> i32 {
        unsafe { self.gl.get_parameter_i32(glow::SAMPLES) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear(&mut self, mask: BufferMask) {
        unsafe { self.gl.clear(buffer_bits(mask)) }
    }

    fn invalidate_framebuffer(&mut self, target: FramebufferTarget, attachments: &[Attachment]) {
        let atts: Vec<u32> = attachments.iter().map(|&a| attachment(a)).collect();
        unsafe { self.gl.invalidate_framebuffer(framebuffer_target(target), &atts) }
    }

    fn blit_framebuffer(&mut self, width: i32, height: i32, mask: BufferMask, filter: TextureFilter) {
        unsafe {
            self.gl.blit_framebuffer(
                0,
                0,
                width,
                height,
                0,
                0,
                width,
                height,
                buffer_bits(mask),
                filter_mode(filter),
            )
        }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        unsafe { self.gl.create_shader(shader_type(stage)) }
            .map(|s| ShaderId(s.0))
            .map_err(|e| DeviceError::create("shader", e))
    }

    fn shader_source(&mut self, id: ShaderId, source: &str) {
        unsafe { self.gl.shader_source(shader(id), source) }
    }

    fn compile_shader(&mut self, id: ShaderId) -> bool {
        unsafe {
            self.gl.compile_shader(shader(id));
            self.gl.get_shader_compile_status(shader(id))
        }
    }

    fn shader_info_log(&mut self, id: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(shader(id)) }
    }

    fn delete_shader(&mut self, id: ShaderId) {
        unsafe { self.gl.delete_shader(shader(id)) }
    }

    fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        unsafe { self.gl.create_program() }
            .map(|p| ProgramId(p.0))
            .map_err(|e| DeviceError::create("program", e))
    }

    fn attach_shader(&mut self, prog: ProgramId, id: ShaderId) {
        unsafe { self.gl.attach_shader(program(prog), shader(id)) }
    }

    fn bind_attrib_location(&mut self, prog: ProgramId, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program(prog), index, name) }
    }

    fn link_program(&mut self, prog: ProgramId) -> bool {
        unsafe {
            self.gl.link_program(program(prog));
            self.gl.get_program_link_status(program(prog))
        }
    }

    fn program_info_log(&mut self, prog: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(program(prog)) }
    }

    fn delete_program(&mut self, prog: ProgramId) {
        unsafe { self.gl.delete_program(program(prog)) }
    }

    fn use_program(&mut self, prog: Option<ProgramId>) {
        unsafe { self.gl.use_program(prog.map(program)) }
    }

    fn uniform_location(&mut self, prog: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe { self.gl.get_uniform_location(program(prog), name) }.map(|loc| UniformLocation(loc.0))
    }

    fn uniform_block_index(&mut self, prog: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_uniform_block_index(program(prog), name) }
    }

    fn uniform_block_binding(&mut self, prog: ProgramId, block: u32, binding: u32) {
        unsafe { self.gl.uniform_block_binding(program(prog), block, binding) }
    }

    fn uniform_1i(&mut self, location: UniformLocation, value: i32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_i32(Some(&loc), value) }
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        unsafe { self.gl.create_buffer() }
            .map(|b| BufferId(b.0))
            .map_err(|e| DeviceError::create("buffer", e))
    }

    fn uniform_buffer_data(&mut self, id: BufferId, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer(id)));
            self.gl
                .buffer_data_u8_slice(glow::UNIFORM_BUFFER, data, glow::DYNAMIC_DRAW);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn bind_uniform_buffer_base(&mut self, binding: u32, id: Option<BufferId>) {
        unsafe {
            self.gl
                .bind_buffer_base(glow::UNIFORM_BUFFER, binding, id.map(buffer))
        }
    }

    fn delete_buffer(&mut self, id: BufferId) {
        unsafe { self.gl.delete_buffer(buffer(id)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::GpuCaps;
    use crate::framebuffer::{Framebuffer, FramebufferDesc, MultisampleStrategy};
    use crate::headless::{GlCall, RecordingDevice};

    #[test]
    fn test_unsupported_extensions_are_hidden() {
        let ext = filter_extensions([
            "GL_OVR_multiview2",
            "GL_EXT_multisampled_render_to_texture",
            "GL_OVR_multiview_multisampled_render_to_texture",
            "GL_EXT_texture_border_clamp",
        ]);
        assert_eq!(ext, "GL_EXT_texture_border_clamp");
        let caps = GpuCaps::from_extensions(ext.split_whitespace());
        assert!(!caps.multiview);
        assert!(!caps.multisampled_render_to_texture);
        assert!(!caps.multiview_multisampled_render_to_texture);
    }

    #[test]
    fn test_multiview_request_builds_conventional_targets() {
        let ext = filter_extensions(["GL_OVR_multiview2", "GL_EXT_multisampled_render_to_texture"]);
        let mut dev = RecordingDevice::new(&ext);
        let caps = GpuCaps::query(&mut dev);
        let mut fb = Framebuffer::new(
            &mut dev,
            &caps,
            FramebufferDesc {
                width: 64,
                height: 32,
                multisamples: 4,
                use_multiview: true,
                ..FramebufferDesc::default()
            },
        )
        .expect("framebuffer");

        assert!(!fb.desc().use_multiview);
        assert_eq!(fb.strategy(), MultisampleStrategy::Blit);
        let calls = dev.take_calls();
        assert!(!calls
            .iter()
            .any(|c| matches!(c, GlCall::FramebufferTexture { multiview: true, .. })));

        fb.bind(&mut dev);
        assert_eq!(
            dev.take_calls().first(),
            Some(&GlCall::BindFramebuffer(FramebufferTarget::Framebuffer, fb.render_framebuffer(0)))
        );
        fb.destroy(&mut dev);
        assert_eq!(dev.live_objects(), 0);
    }

    #[test]
    fn test_enum_mapping() {
        assert_eq!(buffer_bits(BufferMask::COLOR | BufferMask::DEPTH), glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        assert_eq!(framebuffer_target(FramebufferTarget::Read), glow::READ_FRAMEBUFFER);
        assert_eq!(attachment(Attachment::Depth), glow::DEPTH_ATTACHMENT);
        assert_eq!(wrap_mode(TextureWrap::ClampToBorder), glow::CLAMP_TO_BORDER as i32);
        assert_eq!(texture_target(TextureTarget::Texture2DArray), glow::TEXTURE_2D_ARRAY);
    }
}
