use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::backend::RenderBackend;
use crate::error::CanvasError;
use crate::reflect::{self, InterfaceVar, StageInterface, UniformBlockLayout};
use crate::types::{ShaderSource, ShaderStage, ATTRIBUTE_VERTEX_POSITION};

/// A stage that parsed and validated, ready to be handed to a backend.
#[derive(Clone, Debug)]
pub struct StageModule {
    stage: ShaderStage,
    source: Arc<str>,
    interface: StageInterface,
}

impl StageModule {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn interface(&self) -> &StageInterface {
        &self.interface
    }
}

/// Parses and validates one stage with the naga GLSL front end.
///
/// Diagnostics carry source spans so the log reads like a compiler error.
pub fn compile_stage(stage: ShaderStage, source: &Arc<str>) -> Result<StageModule, CanvasError> {
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.to_naga());
    let module: naga::Module =
        frontend
            .parse(&options, source)
            .map_err(|errors| CanvasError::ShaderCompile {
                stage,
                log: errors.emit_to_string(source),
            })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| CanvasError::ShaderCompile {
            stage,
            log: err.emit_to_string(source),
        })?;

    Ok(StageModule {
        stage,
        source: Arc::clone(source),
        interface: reflect::stage_interface(&module, stage),
    })
}

/// Process-unique identity of a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ProgramId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// What the link step learned about the pair: the interface a backend needs
/// to build its pipeline and the binder needs to resolve names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramLayout {
    vertex_inputs: Vec<InterfaceVar>,
    uniform_block: Option<UniformBlockLayout>,
}

impl ProgramLayout {
    pub fn vertex_inputs(&self) -> &[InterfaceVar] {
        &self.vertex_inputs
    }

    /// Location and component count of `aVertexPosition`, if declared.
    pub fn vertex_position(&self) -> Option<&InterfaceVar> {
        self.vertex_inputs
            .iter()
            .find(|input| input.name.as_deref() == Some(ATTRIBUTE_VERTEX_POSITION))
    }

    /// Members of the uniform block merged across stages, fragment first.
    pub fn uniform_block(&self) -> Option<&UniformBlockLayout> {
        self.uniform_block.as_ref()
    }

    /// Bytes the backend must allocate for the uniform block, 16-byte aligned.
    pub fn uniform_block_size(&self) -> u32 {
        let span = self.uniform_block.as_ref().map_or(0, |block| block.span);
        span.max(16).next_multiple_of(16)
    }
}

/// A linked program plus the two stages attached to it.
///
/// Fields drop in declaration order, so the program is released before the
/// stage handles.
pub struct CompiledProgram<B: RenderBackend> {
    id: ProgramId,
    program: B::Program,
    _vertex: B::Stage,
    _fragment: B::Stage,
    layout: ProgramLayout,
}

impl<B: RenderBackend> CompiledProgram<B> {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn handle(&self) -> &B::Program {
        &self.program
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }
}

impl<B: RenderBackend> fmt::Debug for CompiledProgram<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Compiles both stages and links them into a program owned by the caller.
///
/// Stops at the first failure: a vertex error never looks at the fragment
/// stage, and a compile error never links. Handles created before a failure
/// are dropped (released) on the way out.
pub fn build_program<B: RenderBackend>(
    backend: &mut B,
    source: &ShaderSource,
) -> Result<CompiledProgram<B>, CanvasError> {
    let vertex_module = compile_stage(ShaderStage::Vertex, source.stage(ShaderStage::Vertex))?;
    let vertex = backend.create_stage(&vertex_module)?;

    let fragment_module =
        compile_stage(ShaderStage::Fragment, source.stage(ShaderStage::Fragment))?;
    let fragment = backend.create_stage(&fragment_module)?;

    let layout = link_interface(&vertex_module, &fragment_module)?;
    let program = backend.link_program(&vertex, &fragment, &layout)?;

    let id = ProgramId::next();
    tracing::debug!(
        %id,
        vertex_inputs = layout.vertex_inputs.len(),
        uniform_bytes = layout.uniform_block_size(),
        "linked shader program"
    );

    Ok(CompiledProgram {
        id,
        program,
        _vertex: vertex,
        _fragment: fragment,
        layout,
    })
}

/// CPU half of linking: checks the two stage interfaces against each other
/// and against what the canvas can feed.
pub fn link_interface(
    vertex: &StageModule,
    fragment: &StageModule,
) -> Result<ProgramLayout, CanvasError> {
    let mut problems = Vec::new();
    let vs = vertex.interface();
    let fs = fragment.interface();

    if !vs.has_entry_point {
        problems.push("vertex shader has no `main` entry point".to_string());
    }
    if !fs.has_entry_point {
        problems.push("fragment shader has no `main` entry point".to_string());
    }

    for input in &fs.inputs {
        if !vs.outputs.iter().any(|output| output.location == input.location) {
            problems.push(format!(
                "fragment input `{}` at location {} is not written by the vertex shader",
                input.label(),
                input.location
            ));
        }
    }

    for input in &vs.inputs {
        if input.name.as_deref() != Some(ATTRIBUTE_VERTEX_POSITION) {
            problems.push(format!(
                "vertex input `{}` at location {} has no buffer; only `{}` is supplied",
                input.label(),
                input.location,
                ATTRIBUTE_VERTEX_POSITION
            ));
        } else if !matches!(input.components, Some(2..=4)) {
            problems.push(format!(
                "`{ATTRIBUTE_VERTEX_POSITION}` must be a vec2, vec3 or vec4 of floats"
            ));
        }
    }

    for (stage, interface) in [(vertex.stage(), vs), (fragment.stage(), fs)] {
        for resource in &interface.foreign_resources {
            problems.push(format!(
                "{stage} shader declares {resource}; only the uniform block at set 0, binding 0 is bound"
            ));
        }
    }

    let uniform_block = match (fs.uniform_block.as_ref(), vs.uniform_block.as_ref()) {
        (Some(frag), Some(vert)) => {
            for member in &vert.members {
                if let Some(other) = frag.member(&member.name) {
                    if other.offset != member.offset || other.kind != member.kind {
                        problems.push(format!(
                            "uniform `{}` is declared differently by the vertex and fragment shaders",
                            member.name
                        ));
                    }
                }
            }
            let mut merged = frag.clone();
            merged.span = frag.span.max(vert.span);
            for member in &vert.members {
                if merged.member(&member.name).is_none() {
                    merged.members.push(member.clone());
                }
            }
            Some(merged)
        }
        (Some(block), None) | (None, Some(block)) => Some(block.clone()),
        (None, None) => None,
    };

    if !problems.is_empty() {
        return Err(CanvasError::link(problems.join("\n")));
    }

    Ok(ProgramLayout {
        vertex_inputs: vs.inputs.clone(),
        uniform_block,
    })
}
