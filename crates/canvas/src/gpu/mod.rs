//! `wgpu` implementation of [`RenderBackend`].
//!
//! - `context` owns the instance, surface, device and queue and reconfigures
//!   the surface on resize.
//! - `pipeline` turns checked stages into shader modules and links them into
//!   a triangle-strip pipeline with one uniform buffer at set 0, binding 0.

mod context;
mod pipeline;

use std::sync::Arc;

use winit::window::Window;

use crate::backend::RenderBackend;
use crate::compile::{ProgramLayout, StageModule};
use crate::error::CanvasError;
use crate::types::{GpuPowerPreference, Resolution};

use context::GpuContext;
pub use pipeline::{GpuGeometry, GpuProgram, GpuStage};

/// Owns the GPU context of one session.
pub struct WgpuBackend {
    context: GpuContext,
}

impl WgpuBackend {
    pub fn new(
        window: Arc<Window>,
        size: Resolution,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self, CanvasError> {
        let context = GpuContext::new(window, size, gpu_power)?;
        Ok(Self { context })
    }
}

impl RenderBackend for WgpuBackend {
    type Stage = GpuStage;
    type Program = GpuProgram;
    type Geometry = GpuGeometry;

    fn create_stage(&mut self, module: &StageModule) -> Result<Self::Stage, CanvasError> {
        pipeline::create_stage(&self.context.device, module)
    }

    fn link_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
        layout: &ProgramLayout,
    ) -> Result<Self::Program, CanvasError> {
        pipeline::link_program(
            &self.context.device,
            self.context.surface_format,
            vertex,
            fragment,
            layout,
        )
    }

    fn upload_geometry(
        &mut self,
        vertices: &[f32],
        _components: u32,
    ) -> Result<Self::Geometry, CanvasError> {
        Ok(pipeline::upload_geometry(&self.context.device, vertices))
    }

    fn resize(&mut self, size: Resolution) {
        self.context.resize(size);
    }

    fn draw(
        &mut self,
        program: &Self::Program,
        geometry: &Self::Geometry,
        uniforms: &[u8],
        vertex_count: u32,
    ) -> Result<(), CanvasError> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return Err(CanvasError::draw("surface lost; reconfigured for the next frame"));
            }
            Err(err) => return Err(CanvasError::draw(format!("failed to acquire frame: {err}"))),
        };

        self.context
            .queue
            .write_buffer(&program.uniform_buffer, 0, uniforms);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("canvas encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("canvas pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &program.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, geometry.buffer.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
