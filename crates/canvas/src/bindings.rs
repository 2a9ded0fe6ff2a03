use crate::backend::RenderBackend;
use crate::compile::{CompiledProgram, ProgramId};
use crate::error::CanvasError;
use crate::reflect::{MemberKind, UniformBlockLayout};
use crate::types::{ATTRIBUTE_VERTEX_POSITION, UNIFORM_MOUSE, UNIFORM_RESOLUTION, UNIFORM_TIME};

/// Resolved `aVertexPosition` input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeLocation {
    location: u32,
    components: u32,
}

impl AttributeLocation {
    pub fn location(&self) -> u32 {
        self.location
    }

    pub fn components(&self) -> u32 {
        self.components
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeBindings {
    vertex_position: AttributeLocation,
}

impl AttributeBindings {
    pub fn vertex_position(&self) -> AttributeLocation {
        self.vertex_position
    }
}

/// Byte offset and float count of one uniform inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    offset: u32,
    components: u32,
}

impl UniformSlot {
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn components(&self) -> u32 {
        self.components
    }
}

/// Uniform locations; `None` means the program does not declare it and the
/// value is skipped every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UniformBindings {
    pub time: Option<UniformSlot>,
    pub mouse: Option<UniformSlot>,
    pub resolution: Option<UniformSlot>,
    block_size: u32,
}

impl UniformBindings {
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
}

/// Everything resolved for one program, tagged with that program's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramBindings {
    program: ProgramId,
    attributes: AttributeBindings,
    uniforms: UniformBindings,
}

impl ProgramBindings {
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn attributes(&self) -> &AttributeBindings {
        &self.attributes
    }

    pub fn uniforms(&self) -> &UniformBindings {
        &self.uniforms
    }

    /// Whether these bindings were resolved against `program`.
    pub fn belongs_to<B: RenderBackend>(&self, program: &CompiledProgram<B>) -> bool {
        self.program == program.id()
    }
}

/// Resolves the fixed attribute and uniform names of a linked program.
///
/// A missing `aVertexPosition` is fatal; missing uniforms are recorded as
/// absent.
pub fn resolve<B: RenderBackend>(program: &CompiledProgram<B>) -> Result<ProgramBindings, CanvasError> {
    let layout = program.layout();
    let position = layout
        .vertex_position()
        .ok_or_else(|| CanvasError::BufferBinding {
            name: ATTRIBUTE_VERTEX_POSITION.to_string(),
        })?;
    let attributes = AttributeBindings {
        vertex_position: AttributeLocation {
            location: position.location,
            components: position.components.unwrap_or(2),
        },
    };

    let block = layout.uniform_block();
    let uniforms = UniformBindings {
        time: block.and_then(|block| slot(block, UNIFORM_TIME, 1..=1)),
        mouse: block.and_then(|block| slot(block, UNIFORM_MOUSE, 2..=4)),
        resolution: block.and_then(|block| slot(block, UNIFORM_RESOLUTION, 2..=4)),
        block_size: layout.uniform_block_size(),
    };

    tracing::debug!(
        program = %program.id(),
        attribute_location = attributes.vertex_position.location,
        time = uniforms.time.is_some(),
        mouse = uniforms.mouse.is_some(),
        resolution = uniforms.resolution.is_some(),
        "resolved program bindings"
    );

    Ok(ProgramBindings {
        program: program.id(),
        attributes,
        uniforms,
    })
}

fn slot(
    block: &UniformBlockLayout,
    name: &str,
    accepted: std::ops::RangeInclusive<u32>,
) -> Option<UniformSlot> {
    let member = block.member(name)?;
    match member.kind {
        MemberKind::Float { components } if accepted.contains(&components) => Some(UniformSlot {
            offset: member.offset,
            components,
        }),
        ref kind => {
            tracing::warn!(uniform = name, ?kind, "uniform has an unsupported type; skipping it");
            None
        }
    }
}
