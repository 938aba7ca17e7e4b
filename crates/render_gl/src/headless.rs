//! Headless backends
//!
//! [`RecordingDevice`] implements [`GlDevice`] without a GPU: it hands out
//! handles, tracks which objects are alive and records the framebuffer and
//! program calls so the frame sequence can be inspected. [`HeadlessDisplay`]
//! does the same for the display seam. Both drive the frame loop when no
//! window system is available.

use crate::device::*;
use crate::error::DeviceError;
use crate::surface::{
    ConfigAttrib, ContextPriority, DisplayBackend, DisplayString, EGL_OPENGL_ES3_BIT, EGL_PBUFFER_BIT,
    EGL_WINDOW_BIT,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::rc::Rc;

/// Calls worth asserting on, in issue order
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    BindFramebuffer(FramebufferTarget, Option<FramebufferId>),
    FramebufferTexture {
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
        multiview: bool,
    },
    FramebufferRenderbuffer(FramebufferTarget, Attachment, Option<RenderbufferId>),
    RenderbufferStorage(RenderbufferSamples, u32),
    ClearColor([f32; 4]),
    Clear(BufferMask),
    Invalidate(FramebufferTarget, Vec<Attachment>),
    Blit { width: i32, height: i32, mask: BufferMask },
    TextureBorderColor([f32; 4]),
    UseProgram(Option<ProgramId>),
    BindAttribLocation(u32, String),
    Uniform1i(UniformLocation, i32),
    UniformBlockBinding(u32, u32),
    BindUniformBufferBase(u32, Option<BufferId>),
}

#[derive(Debug, Default)]
struct Live {
    textures: HashSet<u32>,
    renderbuffers: HashSet<u32>,
    framebuffers: HashSet<u32>,
    shaders: HashSet<u32>,
    programs: HashSet<u32>,
    buffers: HashSet<u32>,
}

/// GPU-less [`GlDevice`]
#[derive(Debug)]
pub struct RecordingDevice {
    pub extensions: String,
    /// Upper bound on samples reported by `current_samples`
    pub max_samples: i32,
    /// Swap chain length handed out regardless of the requested count
    pub swap_chain_length: Option<usize>,
    pub fail_compile: Option<ShaderStage>,
    pub fail_link: bool,
    /// Status check number (0-based) that reports incomplete
    pub fail_status_check: Option<usize>,
    pub calls: Vec<GlCall>,
    next_id: u32,
    live: Live,
    swap_chains: HashMap<u32, Vec<TextureId>>,
    shader_sources: HashMap<u32, (ShaderStage, String)>,
    program_shaders: HashMap<u32, Vec<u32>>,
    linked: HashSet<u32>,
    locations: HashMap<(u32, String), u32>,
    status_checks: usize,
    last_samples: i32,
    uploads: usize,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new("")
    }
}

impl RecordingDevice {
    pub fn new(extensions: &str) -> Self {
        Self {
            extensions: extensions.to_string(),
            max_samples: 4,
            swap_chain_length: None,
            fail_compile: None,
            fail_link: false,
            fail_status_check: None,
            calls: Vec::new(),
            next_id: 0,
            live: Live::default(),
            swap_chains: HashMap::new(),
            shader_sources: HashMap::new(),
            program_shaders: HashMap::new(),
            linked: HashSet::new(),
            locations: HashMap::new(),
            status_checks: 0,
            last_samples: 0,
            uploads: 0,
        }
    }

    fn next(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN)
    }

    /// Number of GL objects and swap chains still alive
    pub fn live_objects(&self) -> usize {
        self.live.textures.len()
            + self.live.renderbuffers.len()
            + self.live.framebuffers.len()
            + self.live.shaders.len()
            + self.live.programs.len()
            + self.live.buffers.len()
            + self.swap_chains.len()
    }

    pub fn live_textures(&self) -> usize {
        self.live.textures.len()
    }

    pub fn live_renderbuffers(&self) -> usize {
        self.live.renderbuffers.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.live.framebuffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.live.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.live.programs.len()
    }

    pub fn live_swap_chains(&self) -> usize {
        self.swap_chains.len()
    }

    pub fn texture_uploads(&self) -> usize {
        self.uploads
    }

    pub fn shader_source_of(&self, shader: ShaderId) -> Option<&str> {
        self.shader_sources.get(&shader.raw()).map(|(_, src)| src.as_str())
    }

    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    fn attached_sources(&self, program: ProgramId) -> impl Iterator<Item = &str> + '_ {
        self.program_shaders
            .get(&program.raw())
            .into_iter()
            .flatten()
            .filter_map(|id| self.shader_sources.get(id).map(|(_, src)| src.as_str()))
    }

    fn declares(&self, program: ProgramId, name: &str) -> bool {
        self.linked.contains(&program.raw()) && self.attached_sources(program).any(|src| contains_word(src, name))
    }
}

fn contains_word(source: &str, word: &str) -> bool {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == word)
}

fn glsl_version(source: &str) -> u32 {
    source
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("#version "))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(100)
}

impl GlDevice for RecordingDevice {
    fn extension_string(&mut self) -> String {
        self.extensions.clone()
    }

    fn create_texture(&mut self) -> Result<TextureId, DeviceError> {
        let id = self.next();
        self.live.textures.insert(id.get());
        Ok(TextureId(id))
    }

    fn bind_texture(&mut self, _target: TextureTarget, _texture: Option<TextureId>) {}

    fn tex_storage_3d(&mut self, _target: TextureTarget, _levels: i32, _format: u32, _w: i32, _h: i32, _depth: i32) {}

    fn tex_image_2d_rgba8(&mut self, _width: i32, _height: i32, _pixels: &[u8]) {
        self.uploads += 1;
    }

    fn generate_mipmap(&mut self, _target: TextureTarget) {}

    fn set_texture_wrap(&mut self, _target: TextureTarget, _s: TextureWrap, _t: TextureWrap) {}

    fn set_texture_filter(&mut self, _target: TextureTarget, _min: TextureFilter, _mag: TextureFilter) {}

    fn set_texture_border_color(&mut self, _target: TextureTarget, color: [f32; 4]) {
        self.calls.push(GlCall::TextureBorderColor(color));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.live.textures.remove(&texture.raw());
    }

    fn create_texture_swap_chain(
        &mut self,
        _target: TextureTarget,
        _format: u32,
        _width: i32,
        _height: i32,
        _levels: i32,
        count: usize,
    ) -> Result<SwapChainId, DeviceError> {
        let count = self.swap_chain_length.unwrap_or(count);
        let textures = (0..count).map(|_| TextureId(self.next())).collect();
        let id = self.next();
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
        self.swap_chains.remove(&chain.raw());
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, DeviceError> {
        let id = self.next();
        self.live.renderbuffers.insert(id.get());
        Ok(RenderbufferId(id))
    }

    fn bind_renderbuffer(&mut self, _renderbuffer: Option<RenderbufferId>) {}

    fn renderbuffer_storage(&mut self, samples: RenderbufferSamples, format: u32, _width: i32, _height: i32) {
        self.last_samples = match samples {
            RenderbufferSamples::Single => 0,
            RenderbufferSamples::Multisample(n) | RenderbufferSamples::RenderToTexture(n) => n,
        };
        self.calls.push(GlCall::RenderbufferStorage(samples, format));
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.live.renderbuffers.remove(&renderbuffer.raw());
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, DeviceError> {
        let id = self.next();
        self.live.framebuffers.insert(id.get());
        Ok(FramebufferId(id))
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>) {
        self.calls.push(GlCall::BindFramebuffer(target, framebuffer));
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
    ) {
        if let Some(n) = samples {
            self.last_samples = n;
        }
        self.calls.push(GlCall::FramebufferTexture {
            target,
            attachment,
            texture,
            samples,
            multiview: false,
        });
    }

    fn framebuffer_texture_multiview(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        texture: Option<TextureId>,
        samples: Option<i32>,
        _base_view: i32,
        _num_views: i32,
    ) {
        if let Some(n) = samples {
            self.last_samples = n;
        }
        self.calls.push(GlCall::FramebufferTexture {
            target,
            attachment,
            texture,
            samples,
            multiview: true,
        });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: FramebufferTarget,
        attachment: Attachment,
        renderbuffer: Option<RenderbufferId>,
    ) {
        self.calls.push(GlCall::FramebufferRenderbuffer(target, attachment, renderbuffer));
    }

    fn check_framebuffer_status(&mut self, _target: FramebufferTarget) -> FramebufferStatus {
        let check = self.status_checks;
        self.status_checks += 1;
        if self.fail_status_check == Some(check) {
            // GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            FramebufferStatus::Incomplete(0x8CD6)
        } else {
            FramebufferStatus::Complete
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.live.framebuffers.remove(&framebuffer.raw());
    }

    fn current_samples(&mut self) -> i32 {
        self.last_samples.min(self.max_samples)
    }

    fn viewport(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn scissor(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(GlCall::ClearColor(rgba));
    }

    fn clear(&mut self, mask: BufferMask) {
        self.calls.push(GlCall::Clear(mask));
    }

    fn invalidate_framebuffer(&mut self, target: FramebufferTarget, attachments: &[Attachment]) {
        self.calls.push(GlCall::Invalidate(target, attachments.to_vec()));
    }

    fn blit_framebuffer(&mut self, width: i32, height: i32, mask: BufferMask, _filter: TextureFilter) {
        self.calls.push(GlCall::Blit { width, height, mask });
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        let id = self.next();
        self.live.shaders.insert(id.get());
        self.shader_sources.insert(id.get(), (stage, String::new()));
        Ok(ShaderId(id))
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        if let Some(entry) = self.shader_sources.get_mut(&shader.raw()) {
            entry.1 = source.to_string();
        }
    }

    fn compile_shader(&mut self, shader: ShaderId) -> bool {
        let stage = self.shader_sources.get(&shader.raw()).map(|(stage, _)| *stage);
        stage.is_some() && stage != self.fail_compile
    }

    fn shader_info_log(&mut self, shader: ShaderId) -> String {
        match self.shader_sources.get(&shader.raw()) {
            Some((stage, _)) if Some(*stage) == self.fail_compile => {
                "0:1: S0001: syntax error".to_string()
            }
            _ => String::new(),
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.live.shaders.remove(&shader.raw());
    }

    fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        let id = self.next();
        self.live.programs.insert(id.get());
        Ok(ProgramId(id))
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.program_shaders.entry(program.raw()).or_default().push(shader.raw());
    }

    fn bind_attrib_location(&mut self, _program: ProgramId, index: u32, name: &str) {
        self.calls.push(GlCall::BindAttribLocation(index, name.to_string()));
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        if self.fail_link {
            return false;
        }
        self.linked.insert(program.raw());
        true
    }

    fn program_info_log(&mut self, _program: ProgramId) -> String {
        if self.fail_link {
            "L0001: varying mismatch".to_string()
        } else {
            String::new()
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.live.programs.remove(&program.raw());
        self.linked.remove(&program.raw());
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if !self.declares(program, name) {
            return None;
        }
        let next = self.locations.len() as u32;
        let loc = *self.locations.entry((program.raw(), name.to_string())).or_insert(next);
        Some(UniformLocation(loc))
    }

    fn uniform_block_index(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        // ES 1.00 has no uniform blocks
        let es3 = self.attached_sources(program).all(|src| glsl_version(src) >= 300);
        if !es3 || !self.declares(program, name) {
            return None;
        }
        let next = self.locations.len() as u32;
        Some(*self.locations.entry((program.raw(), name.to_string())).or_insert(next))
    }

    fn uniform_block_binding(&mut self, _program: ProgramId, block: u32, binding: u32) {
        self.calls.push(GlCall::UniformBlockBinding(block, binding));
    }

    fn uniform_1i(&mut self, location: UniformLocation, value: i32) {
        self.calls.push(GlCall::Uniform1i(location, value));
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        let id = self.next();
        self.live.buffers.insert(id.get());
        Ok(BufferId(id))
    }

    fn uniform_buffer_data(&mut self, _buffer: BufferId, _data: &[u8]) {}

    fn bind_uniform_buffer_base(&mut self, binding: u32, buffer: Option<BufferId>) {
        self.calls.push(GlCall::BindUniformBufferBase(binding, buffer));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.live.buffers.remove(&buffer.raw());
    }
}

// ── Display ──

/// Attribute set of one headless display config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
    pub depth: i32,
    pub stencil: i32,
    pub samples: i32,
    pub surface_type: i32,
    pub renderable_type: i32,
}

impl HeadlessConfig {
    /// ES3 renderable, window and pbuffer capable, no depth or samples
    pub fn rgba(red: i32, green: i32, blue: i32, alpha: i32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
            depth: 0,
            stencil: 0,
            samples: 0,
            surface_type: EGL_WINDOW_BIT | EGL_PBUFFER_BIT,
            renderable_type: EGL_OPENGL_ES3_BIT,
        }
    }
}

/// Observable display state, shared so tests can inspect it after the
/// display has moved into a [`crate::surface::GlSetup`]
#[derive(Debug, Default)]
pub struct DisplayStats {
    pub live_contexts: usize,
    pub live_surfaces: usize,
    pub current: bool,
    pub terminated: bool,
    pub terminate_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessContext {
    pub version: i32,
    pub priority: ContextPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessSurface {
    pub width: i32,
    pub height: i32,
}

pub struct HeadlessDisplay {
    pub configs: Vec<HeadlessConfig>,
    pub max_context_version: i32,
    pub supports_priority: bool,
    pub fail_pbuffer: bool,
    stats: Rc<RefCell<DisplayStats>>,
}

impl HeadlessDisplay {
    pub fn new(configs: Vec<HeadlessConfig>) -> Self {
        Self {
            configs,
            max_context_version: 3,
            supports_priority: true,
            fail_pbuffer: false,
            stats: Rc::new(RefCell::new(DisplayStats::default())),
        }
    }

    pub fn stats(&self) -> Rc<RefCell<DisplayStats>> {
        Rc::clone(&self.stats)
    }

    pub fn is_current(&self) -> bool {
        self.stats.borrow().current
    }
}

impl DisplayBackend for HeadlessDisplay {
    type Config = usize;
    type Context = HeadlessContext;
    type Surface = HeadlessSurface;

    fn initialize(&mut self) -> Option<(i32, i32)> {
        Some((1, 5))
    }

    fn query_string(&self, name: DisplayString) -> String {
        match name {
            DisplayString::Vendor => "headless".to_string(),
            DisplayString::ClientApis => "OpenGL_ES".to_string(),
            DisplayString::Version => "1.5 headless".to_string(),
            DisplayString::Extensions => "EGL_KHR_create_context EGL_IMG_context_priority".to_string(),
        }
    }

    fn configs(&self) -> Vec<usize> {
        (0..self.configs.len()).collect()
    }

    fn config_attrib(&self, config: usize, attrib: ConfigAttrib) -> i32 {
        let Some(c) = self.configs.get(config) else {
            return 0;
        };
        match attrib {
            ConfigAttrib::Red => c.red,
            ConfigAttrib::Green => c.green,
            ConfigAttrib::Blue => c.blue,
            ConfigAttrib::Alpha => c.alpha,
            ConfigAttrib::Depth => c.depth,
            ConfigAttrib::Stencil => c.stencil,
            ConfigAttrib::Samples => c.samples,
            ConfigAttrib::SurfaceType => c.surface_type,
            ConfigAttrib::RenderableType => c.renderable_type,
        }
    }

    fn create_context(
        &mut self,
        _config: usize,
        version: i32,
        priority: Option<ContextPriority>,
    ) -> Option<HeadlessContext> {
        if version > self.max_context_version {
            return None;
        }
        self.stats.borrow_mut().live_contexts += 1;
        let priority = match priority {
            Some(p) if self.supports_priority => p,
            _ => ContextPriority::Medium,
        };
        Some(HeadlessContext { version, priority })
    }

    fn context_priority(&self, context: &HeadlessContext) -> ContextPriority {
        context.priority
    }

    fn create_pbuffer_surface(&mut self, _config: usize, width: i32, height: i32) -> Option<HeadlessSurface> {
        if self.fail_pbuffer {
            return None;
        }
        self.stats.borrow_mut().live_surfaces += 1;
        Some(HeadlessSurface { width, height })
    }

    fn make_current(&mut self, surface: Option<&HeadlessSurface>, context: Option<&HeadlessContext>) -> bool {
        self.stats.borrow_mut().current = surface.is_some() && context.is_some();
        true
    }

    fn destroy_context(&mut self, _context: HeadlessContext) {
        self.stats.borrow_mut().live_contexts -= 1;
    }

    fn destroy_surface(&mut self, _surface: HeadlessSurface) {
        self.stats.borrow_mut().live_surfaces -= 1;
    }

    fn terminate(&mut self) {
        let mut stats = self.stats.borrow_mut();
        stats.terminated = true;
        stats.terminate_calls += 1;
    }
}
