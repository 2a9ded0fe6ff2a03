use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::compile::{ProgramLayout, StageModule};
use crate::error::CanvasError;
use crate::types::ShaderStage;

pub struct GpuStage {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
}

/// Linked pipeline plus the uniform block it reads.
pub struct GpuProgram {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) uniform_bind_group: wgpu::BindGroup,
    _uniform_layout: wgpu::BindGroupLayout,
}

pub struct GpuGeometry {
    pub(crate) buffer: wgpu::Buffer,
}

pub(crate) fn create_stage(
    device: &wgpu::Device,
    module: &StageModule,
) -> Result<GpuStage, CanvasError> {
    let label = match module.stage() {
        ShaderStage::Vertex => "canvas vertex",
        ShaderStage::Fragment => "canvas fragment",
    };
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(module.source().to_owned()),
            stage: module.stage().to_naga(),
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(CanvasError::ShaderCompile {
            stage: module.stage(),
            log: err.to_string(),
        });
    }
    Ok(GpuStage {
        module: shader,
        stage: module.stage(),
    })
}

/// Builds the render pipeline inside a validation error scope; anything the
/// scope catches is reported as a link error.
pub(crate) fn link_program(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    vertex: &GpuStage,
    fragment: &GpuStage,
    layout: &ProgramLayout,
) -> Result<GpuProgram, CanvasError> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(CanvasError::link("stages attached in the wrong slots"));
    }

    let position = layout
        .vertex_position()
        .ok_or_else(|| CanvasError::link("vertex shader declares no `aVertexPosition` input"))?;
    let components = position.components.unwrap_or(2);
    let attributes = [wgpu::VertexAttribute {
        format: vertex_format(components),
        offset: 0,
        shader_location: position.location,
    }];
    let buffers = [wgpu::VertexBufferLayout {
        array_stride: u64::from(components) * std::mem::size_of::<f32>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    }];

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("uniform layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform buffer"),
        size: u64::from(layout.uniform_block_size()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("uniform bind group"),
        layout: &uniform_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("canvas pipeline layout"),
        bind_group_layouts: &[&uniform_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("canvas pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: Some("main"),
            buffers: &buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment.module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(CanvasError::link(err.to_string()));
    }

    Ok(GpuProgram {
        pipeline,
        uniform_buffer,
        uniform_bind_group,
        _uniform_layout: uniform_layout,
    })
}

pub(crate) fn upload_geometry(device: &wgpu::Device, vertices: &[f32]) -> GpuGeometry {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad vertices"),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    GpuGeometry { buffer }
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        3 => wgpu::VertexFormat::Float32x3,
        4 => wgpu::VertexFormat::Float32x4,
        _ => wgpu::VertexFormat::Float32x2,
    }
}
