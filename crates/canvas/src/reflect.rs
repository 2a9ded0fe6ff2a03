//! Reads the stage interface (entry point inputs/outputs and bound resources)
//! out of a parsed naga module so linking and binding never touch the IR.

use wgpu::naga;

use crate::types::ShaderStage;

const ENTRY_POINT: &str = "main";

/// A user-defined `in`/`out` variable of an entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceVar {
    pub name: Option<String>,
    pub location: u32,
    /// Float component count, `None` when the variable is not a float scalar
    /// or vector.
    pub components: Option<u32>,
}

impl InterfaceVar {
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Scalar shape of a uniform block member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// `float`, `vec2`, `vec3` or `vec4` of 32-bit floats.
    Float { components: u32 },
    Other { description: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMember {
    pub name: String,
    pub offset: u32,
    pub kind: MemberKind,
}

/// Layout of the set 0 / binding 0 uniform block as declared by one stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub span: u32,
    pub members: Vec<BlockMember>,
}

impl UniformBlockLayout {
    pub fn member(&self, name: &str) -> Option<&BlockMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageInterface {
    pub has_entry_point: bool,
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
    pub uniform_block: Option<UniformBlockLayout>,
    /// Bound resources other than the uniform block, described for diagnostics.
    pub foreign_resources: Vec<String>,
}

pub(crate) fn stage_interface(module: &naga::Module, stage: ShaderStage) -> StageInterface {
    let mut interface = StageInterface::default();

    if let Some(entry) = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage.to_naga() && entry.name == ENTRY_POINT)
    {
        interface.has_entry_point = true;
        for argument in &entry.function.arguments {
            if let Some(naga::Binding::Location { location, .. }) = argument.binding {
                interface.inputs.push(InterfaceVar {
                    name: argument.name.clone(),
                    location,
                    components: float_components(module, argument.ty),
                });
            }
        }
        if let Some(result) = entry.function.result.as_ref() {
            collect_outputs(module, result, &mut interface.outputs);
        }
    }

    for (_, variable) in module.global_variables.iter() {
        let Some(binding) = variable.binding.as_ref() else {
            continue;
        };
        let name = variable.name.as_deref().unwrap_or("<anonymous>");
        if variable.space == naga::AddressSpace::Uniform
            && binding.group == 0
            && binding.binding == 0
        {
            match block_layout(module, variable.ty) {
                Some(layout) => interface.uniform_block = Some(layout),
                None => interface.foreign_resources.push(format!(
                    "uniform `{name}` at set 0, binding 0 is not a block"
                )),
            }
        } else {
            interface.foreign_resources.push(format!(
                "resource `{name}` at set {}, binding {}",
                binding.group, binding.binding
            ));
        }
    }

    interface
}

fn collect_outputs(module: &naga::Module, result: &naga::FunctionResult, out: &mut Vec<InterfaceVar>) {
    match result.binding {
        Some(naga::Binding::Location { location, .. }) => out.push(InterfaceVar {
            name: None,
            location,
            components: float_components(module, result.ty),
        }),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { ref members, .. } = module.types[result.ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = member.binding {
                        out.push(InterfaceVar {
                            name: member.name.clone(),
                            location,
                            components: float_components(module, member.ty),
                        });
                    }
                }
            }
        }
    }
}

fn block_layout(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<UniformBlockLayout> {
    let naga::TypeInner::Struct { ref members, span } = module.types[ty].inner else {
        return None;
    };
    let members = members
        .iter()
        .filter_map(|member| {
            let name = member.name.clone()?;
            let kind = match float_components(module, member.ty) {
                Some(components) => MemberKind::Float { components },
                None => MemberKind::Other {
                    description: format!("{:?}", module.types[member.ty].inner),
                },
            };
            Some(BlockMember {
                name,
                offset: member.offset,
                kind,
            })
        })
        .collect();
    Some(UniformBlockLayout { span, members })
}

fn float_components(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<u32> {
    let is_f32 = |scalar: &naga::Scalar| scalar.kind == naga::ScalarKind::Float && scalar.width == 4;
    match module.types[ty].inner {
        naga::TypeInner::Scalar(ref scalar) if is_f32(scalar) => Some(1),
        naga::TypeInner::Vector { size, ref scalar } if is_f32(scalar) => Some(match size {
            naga::VectorSize::Bi => 2,
            naga::VectorSize::Tri => 3,
            naga::VectorSize::Quad => 4,
        }),
        _ => None,
    }
}
