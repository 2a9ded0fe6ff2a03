//! Seams between the canvas core and whatever actually talks to the GPU and
//! the host page.
//!
//! The core only ever sees these traits: the `wgpu` implementation lives in
//! [`crate::gpu`], the `winit` host in [`crate::window`], and tests plug in a
//! recording backend.

use crate::compile::{ProgramLayout, StageModule};
use crate::error::CanvasError;
use crate::types::{CanvasOffset, Resolution};

/// Resource creation and drawing against one acquired context.
///
/// Handles release their GPU resources when dropped.
pub trait RenderBackend {
    type Stage;
    type Program;
    type Geometry;

    /// Creates a stage handle from source that already parsed and validated.
    fn create_stage(&mut self, module: &StageModule) -> Result<Self::Stage, CanvasError>;

    /// Links two stages into a program; failures map to `ProgramLink`.
    fn link_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
        layout: &ProgramLayout,
    ) -> Result<Self::Program, CanvasError>;

    /// Uploads static vertex data, `components` floats per vertex.
    fn upload_geometry(
        &mut self,
        vertices: &[f32],
        components: u32,
    ) -> Result<Self::Geometry, CanvasError>;

    /// Synchronizes the backing pixel size of the drawable.
    fn resize(&mut self, size: Resolution);

    /// Issues one triangle-strip draw of `vertex_count` vertices with the
    /// given uniform block bytes.
    fn draw(
        &mut self,
        program: &Self::Program,
        geometry: &Self::Geometry,
        uniforms: &[u8],
        vertex_count: u32,
    ) -> Result<(), CanvasError>;
}

/// Host frame pacing.
pub trait FrameScheduler {
    /// Asks for one more tick.
    fn request_frame(&self);

    /// Revokes an outstanding request. Schedulers that cannot revoke leave
    /// this empty; a stopped loop ignores late ticks anyway.
    fn cancel_frame(&self) {}
}

/// The drawable target a session mounts onto.
pub trait MountSurface: FrameScheduler {
    type Backend: RenderBackend;

    /// Creates the context exclusively owned by one session.
    fn acquire_context(&self) -> Result<Self::Backend, CanvasError>;

    /// Current client size, used as the initial backing size.
    fn backing_size(&self) -> Resolution;

    /// Position of the canvas inside the host page.
    fn offset(&self) -> CanvasOffset;
}
