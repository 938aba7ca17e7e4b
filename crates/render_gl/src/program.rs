//! Shader program builder
//!
//! Every program gets a generated `#version` line, caller directives, the
//! `DISABLE_MULTIVIEW` switch and a stage header prepended to its source.
//! The vertex header provides `TransformVertex` over the per-view scene
//! matrices so shaders are written once for both multiview and per-eye
//! rendering.

use crate::device::*;
use crate::error::ProgramError;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Lowest GLSL version a program is compiled with unless image_external forces 100
pub const GLSL_PROGRAM_VERSION: u32 = 300;

/// Capacity of the per-program parameter table
pub const MAX_PROGRAM_PARMS: usize = 16;

const IMAGE_EXTERNAL: &str = "GL_OES_EGL_image_external";

const VERTEX_HEADER: &str = r#"
#ifndef DISABLE_MULTIVIEW
 #define DISABLE_MULTIVIEW 0
#endif
#define NUM_VIEWS 2
#if __VERSION__ < 300
  #define in attribute
  #define out varying
#else
  #define attribute in
  #define varying out
#endif
#if defined( GL_OVR_multiview2 ) && ! DISABLE_MULTIVIEW && __VERSION__ >= 300
  #extension GL_OVR_multiview2 : require
  layout(num_views=NUM_VIEWS) in;
  #define VIEW_ID gl_ViewID_OVR
#else
  uniform lowp int ViewID;
  #define VIEW_ID ViewID
#endif

uniform highp mat4 ModelMatrix;
#if __VERSION__ >= 300
uniform SceneMatrices
{
	highp mat4 ViewMatrix[NUM_VIEWS];
	highp mat4 ProjectionMatrix[NUM_VIEWS];
} sm;
#define TransformVertex(localPos) (sm.ProjectionMatrix[VIEW_ID] * ( sm.ViewMatrix[VIEW_ID] * ( ModelMatrix * localPos )))
#else
uniform highp mat4 ViewMatrix[NUM_VIEWS];
uniform highp mat4 ProjectionMatrix[NUM_VIEWS];
highp vec4 TransformVertex( highp vec4 oPos )
{
	highp vec4 hPos = ProjectionMatrix[VIEW_ID] * ( ViewMatrix[VIEW_ID] * ( ModelMatrix * oPos ) );
	return hPos;
}
#endif
"#;

const FRAGMENT_HEADER: &str = r#"
#if __VERSION__ < 300
	#define in varying
#else
	#define varying in
	#define gl_FragColor fragColor
	out mediump vec4 fragColor;
	#define texture2D texture
	#define textureCube texture
#endif
"#;

/// Fixed vertex attribute locations bound before linking
pub const VERTEX_ATTRIBUTES: [(u32, &str); 10] = [
    (0, "Position"),
    (1, "Normal"),
    (2, "Tangent"),
    (3, "Binormal"),
    (4, "VertexColor"),
    (5, "TexCoord"),
    (6, "TexCoord1"),
    (7, "JointIndices"),
    (8, "JointWeights"),
    (9, "FontParms"),
];

/// Per-build shader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderEnvironment {
    pub use_multiview: bool,
    pub min_version: u32,
}

impl Default for ShaderEnvironment {
    fn default() -> Self {
        Self {
            use_multiview: false,
            min_version: GLSL_PROGRAM_VERSION,
        }
    }
}

impl ShaderEnvironment {
    pub fn new(use_multiview: bool) -> Self {
        Self {
            use_multiview,
            ..Self::default()
        }
    }

    /// Version a program is compiled with
    pub fn program_version(&self, requested: u32, source: &ProgramSource<'_>) -> u32 {
        let mut version = requested;
        if version < self.min_version {
            tracing::warn!(
                requested,
                minimum = self.min_version,
                "program GLSL version below the required minimum"
            );
            version = self.min_version;
        }
        // without multiview, image_external samplers only compile reliably under ES 1.00
        if !self.use_multiview
            && (source.fragment_directives.contains(IMAGE_EXTERNAL) || source.fragment.contains(IMAGE_EXTERNAL))
        {
            tracing::info!("program GLSL version 100 due to {IMAGE_EXTERNAL} use");
            version = 100;
        }
        version
    }

    /// Full source handed to the compiler for one stage
    pub fn assemble(&self, stage: ShaderStage, version: u32, directives: &str, source: &str) -> String {
        let body = strip_version_line(source);
        if body.len() != source.len() {
            tracing::warn!("#version in shader source is ignored; the version is chosen at build time");
        }
        let header = match stage {
            ShaderStage::Vertex => VERTEX_HEADER,
            ShaderStage::Fragment => FRAGMENT_HEADER,
        };
        let modifier = if version > 100 { "es" } else { "" };

        let mut out = String::with_capacity(header.len() + directives.len() + body.len() + 64);
        out.push_str(&format!("#version {version} {modifier}\n"));
        out.push_str(directives);
        out.push_str(&format!(
            "#define DISABLE_MULTIVIEW {}\n",
            if self.use_multiview { 0 } else { 1 }
        ));
        out.push_str(header);
        out.push_str(body);
        out
    }
}

fn strip_version_line(source: &str) -> &str {
    if !source.starts_with("#version ") {
        return source;
    }
    match source.find('\n') {
        Some(end) => &source[end + 1..],
        None => "",
    }
}

/// Vertex and fragment sources with their optional directive blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramSource<'a> {
    pub vertex_directives: &'a str,
    pub vertex: &'a str,
    pub fragment_directives: &'a str,
    pub fragment: &'a str,
}

impl<'a> ProgramSource<'a> {
    pub fn new(vertex: &'a str, fragment: &'a str) -> Self {
        Self {
            vertex,
            fragment,
            ..Self::default()
        }
    }

    pub fn with_directives(mut self, vertex_directives: &'a str, fragment_directives: &'a str) -> Self {
        self.vertex_directives = vertex_directives;
        self.fragment_directives = fragment_directives;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramParmType {
    Int,
    IntVector2,
    IntVector3,
    IntVector4,
    Float,
    FloatVector2,
    FloatVector3,
    FloatVector4,
    FloatMatrix4,
    /// Sampler; gets the next texture unit
    TextureSampled,
    /// Uniform block; gets the next uniform-buffer binding point
    BufferUniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramParm<'a> {
    pub name: &'a str,
    pub kind: ProgramParmType,
}

impl<'a> ProgramParm<'a> {
    pub const fn new(name: &'a str, kind: ProgramParmType) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParmBinding {
    Texture { location: Option<UniformLocation>, unit: u32 },
    Buffer { block: Option<u32>, binding: u32 },
    Value { location: Option<UniformLocation> },
}

impl ParmBinding {
    pub fn is_resolved(&self) -> bool {
        match self {
            ParmBinding::Texture { location, .. } | ParmBinding::Value { location } => location.is_some(),
            ParmBinding::Buffer { block, .. } => block.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParm {
    pub name: String,
    pub kind: ProgramParmType,
    pub binding: ParmBinding,
}

/// `SceneMatrices` uniform block index and the binding point it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBinding {
    pub block: u32,
    pub binding: u32,
}

/// A linked program, or the empty sentinel when `program` is `None`
#[derive(Debug, Default)]
pub struct GlProgram {
    program: Option<ProgramId>,
    vertex_shader: Option<ShaderId>,
    fragment_shader: Option<ShaderId>,
    version: u32,
    uniforms: Vec<ResolvedParm>,
    texture_bindings: u32,
    buffer_bindings: u32,
    view_id: Option<UniformLocation>,
    model_matrix: Option<UniformLocation>,
    view_matrix: Option<UniformLocation>,
    projection_matrix: Option<UniformLocation>,
    scene_matrices: Option<BlockBinding>,
}

fn compile_shader<D: GlDevice>(
    dev: &mut D,
    env: &ShaderEnvironment,
    stage: ShaderStage,
    version: u32,
    directives: &str,
    source: &str,
) -> Result<ShaderId, ProgramError> {
    let full = env.assemble(stage, version, directives, source);
    let shader = dev.create_shader(stage)?;
    dev.shader_source(shader, &full);
    if dev.compile_shader(shader) {
        return Ok(shader);
    }

    tracing::warn!("compiling {} shader: ****** failed ******", stage.name());
    for (n, line) in full.lines().enumerate() {
        tracing::warn!("{:03}  {}", n + 1, line);
    }
    let log = dev.shader_info_log(shader);
    tracing::warn!("{log}");
    dev.delete_shader(shader);
    Err(ProgramError::Compile { stage, log })
}

impl GlProgram {
    /// Compile, link and resolve parameters
    ///
    /// # Panics
    /// When more than [`MAX_PROGRAM_PARMS`] parameters are passed.
    pub fn build<D: GlDevice>(
        dev: &mut D,
        env: &ShaderEnvironment,
        source: &ProgramSource<'_>,
        parms: &[ProgramParm<'_>],
        requested_version: u32,
    ) -> Result<Self, ProgramError> {
        assert!(
            parms.len() <= MAX_PROGRAM_PARMS,
            "{} program parameters exceed the table capacity of {MAX_PROGRAM_PARMS}",
            parms.len()
        );

        let mut p = GlProgram {
            version: env.program_version(requested_version, source),
            ..GlProgram::default()
        };
        if let Err(err) = p.compile_and_link(dev, env, source) {
            p.free(dev);
            return Err(err);
        }
        p.resolve_bindings(dev, parms);
        Ok(p)
    }

    /// [`GlProgram::build`] that logs failures and returns the empty sentinel,
    /// or panics when `abort_on_error` is set
    pub fn build_or_empty<D: GlDevice>(
        dev: &mut D,
        env: &ShaderEnvironment,
        source: &ProgramSource<'_>,
        parms: &[ProgramParm<'_>],
        requested_version: u32,
        abort_on_error: bool,
    ) -> Self {
        match Self::build(dev, env, source, parms, requested_version) {
            Ok(program) => program,
            Err(err) => {
                tracing::error!("{err}");
                if abort_on_error {
                    panic!("shader program build failed: {err}");
                }
                GlProgram::default()
            }
        }
    }

    fn compile_and_link<D: GlDevice>(
        &mut self,
        dev: &mut D,
        env: &ShaderEnvironment,
        source: &ProgramSource<'_>,
    ) -> Result<(), ProgramError> {
        let vertex = compile_shader(
            dev,
            env,
            ShaderStage::Vertex,
            self.version,
            source.vertex_directives,
            source.vertex,
        )?;
        self.vertex_shader = Some(vertex);
        let fragment = compile_shader(
            dev,
            env,
            ShaderStage::Fragment,
            self.version,
            source.fragment_directives,
            source.fragment,
        )?;
        self.fragment_shader = Some(fragment);

        let program = dev.create_program()?;
        self.program = Some(program);
        dev.attach_shader(program, vertex);
        dev.attach_shader(program, fragment);
        for (index, name) in VERTEX_ATTRIBUTES {
            dev.bind_attrib_location(program, index, name);
        }

        if !dev.link_program(program) {
            let log = dev.program_info_log(program);
            tracing::error!("linking program failed: {log}");
            return Err(ProgramError::Link { log });
        }
        Ok(())
    }

    fn resolve_bindings<D: GlDevice>(&mut self, dev: &mut D, parms: &[ProgramParm<'_>]) {
        let Some(program) = self.program else {
            return;
        };
        dev.use_program(Some(program));

        for parm in parms {
            let binding = match parm.kind {
                ProgramParmType::TextureSampled => {
                    let location = dev.uniform_location(program, parm.name);
                    let unit = self.texture_bindings;
                    self.texture_bindings += 1;
                    if let Some(loc) = location {
                        dev.uniform_1i(loc, unit as i32);
                    }
                    ParmBinding::Texture { location, unit }
                }
                ProgramParmType::BufferUniform => {
                    let block = dev.uniform_block_index(program, parm.name);
                    let binding = self.buffer_bindings;
                    self.buffer_bindings += 1;
                    if let Some(block) = block {
                        dev.uniform_block_binding(program, block, binding);
                    }
                    ParmBinding::Buffer { block, binding }
                }
                _ => ParmBinding::Value {
                    location: dev.uniform_location(program, parm.name),
                },
            };
            if !binding.is_resolved() {
                tracing::warn!(name = parm.name, kind = ?parm.kind, "invalid shader parameter");
            }
            self.uniforms.push(ResolvedParm {
                name: parm.name.to_string(),
                kind: parm.kind,
                binding,
            });
        }

        self.view_id = dev.uniform_location(program, "ViewID");
        self.model_matrix = dev.uniform_location(program, "ModelMatrix");
        self.view_matrix = dev.uniform_location(program, "ViewMatrix");
        self.projection_matrix = dev.uniform_location(program, "ProjectionMatrix");
        // absent from v100 programs
        if let Some(block) = dev.uniform_block_index(program, "SceneMatrices") {
            let binding = self.buffer_bindings;
            self.buffer_bindings += 1;
            dev.uniform_block_binding(program, block, binding);
            self.scene_matrices = Some(BlockBinding { block, binding });
        }

        for unit in 0..MAX_PROGRAM_PARMS as i32 {
            if let Some(loc) = dev.uniform_location(program, &format!("Texture{unit}")) {
                dev.uniform_1i(loc, unit);
            }
        }

        dev.use_program(None);
    }

    /// Delete the program and its shaders; safe to call more than once
    pub fn free<D: GlDevice>(&mut self, dev: &mut D) {
        dev.use_program(None);
        if let Some(program) = self.program.take() {
            dev.delete_program(program);
        }
        if let Some(shader) = self.vertex_shader.take() {
            dev.delete_shader(shader);
        }
        if let Some(shader) = self.fragment_shader.take() {
            dev.delete_shader(shader);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn vertex_shader(&self) -> Option<ShaderId> {
        self.vertex_shader
    }

    pub fn fragment_shader(&self) -> Option<ShaderId> {
        self.fragment_shader
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn uniforms(&self) -> &[ResolvedParm] {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<&ResolvedParm> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    pub fn texture_binding_count(&self) -> u32 {
        self.texture_bindings
    }

    pub fn buffer_binding_count(&self) -> u32 {
        self.buffer_bindings
    }

    pub fn view_id(&self) -> Option<UniformLocation> {
        self.view_id
    }

    pub fn model_matrix(&self) -> Option<UniformLocation> {
        self.model_matrix
    }

    pub fn view_matrix(&self) -> Option<UniformLocation> {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Option<UniformLocation> {
        self.projection_matrix
    }

    pub fn scene_matrices(&self) -> Option<BlockBinding> {
        self.scene_matrices
    }
}

/// std140 layout of the `SceneMatrices` block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneMatrices {
    pub view: [[[f32; 4]; 4]; 2],
    pub projection: [[[f32; 4]; 4]; 2],
}

impl SceneMatrices {
    pub fn new(view: [Mat4; 2], projection: [Mat4; 2]) -> Self {
        Self {
            view: view.map(|m| m.to_cols_array_2d()),
            projection: projection.map(|m| m.to_cols_array_2d()),
        }
    }
}

impl Default for SceneMatrices {
    fn default() -> Self {
        Self::new([Mat4::IDENTITY; 2], [Mat4::IDENTITY; 2])
    }
}

/// Uniform buffer holding the per-view scene matrices
#[derive(Debug, Default)]
pub struct SceneMatricesBuffer {
    buffer: Option<BufferId>,
}

impl SceneMatricesBuffer {
    pub fn new<D: GlDevice>(dev: &mut D) -> Result<Self, ProgramError> {
        let buffer = dev.create_buffer()?;
        dev.uniform_buffer_data(buffer, bytemuck::bytes_of(&SceneMatrices::default()));
        Ok(Self { buffer: Some(buffer) })
    }

    pub fn update<D: GlDevice>(&self, dev: &mut D, matrices: &SceneMatrices) {
        if let Some(buffer) = self.buffer {
            dev.uniform_buffer_data(buffer, bytemuck::bytes_of(matrices));
        }
    }

    /// Bind at the program's `SceneMatrices` binding point, if it has one
    pub fn bind<D: GlDevice>(&self, dev: &mut D, program: &GlProgram) {
        if let Some(scene) = program.scene_matrices() {
            dev.bind_uniform_buffer_base(scene.binding, self.buffer);
        }
    }

    pub fn destroy<D: GlDevice>(&mut self, dev: &mut D) {
        if let Some(buffer) = self.buffer.take() {
            dev.delete_buffer(buffer);
        }
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }
}
