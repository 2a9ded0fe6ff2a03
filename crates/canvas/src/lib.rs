//! Shader preview canvas: compiles a GLSL vertex/fragment pair, draws it over
//! a full-screen quad every frame and keeps `u_time`, `u_mouse` and
//! `u_resolution` current.
//!
//! ```text
//!   ShaderSource + MountSurface
//!          │
//!          ▼
//!   RenderSession::create ──▶ build_program ──▶ bindings::resolve ──▶ GeometryBuffer
//!          │                                                              │
//!          ▼                                                              ▼
//!   RenderLoop (Idle → Running → Stopped) ◀── UniformState ◀── ResizeFeeder / PointerFeeder
//!          │
//!          └─▶ RenderBackend::draw (triangle strip, 4 vertices)
//! ```
//!
//! The core never talks to the GPU directly. It sees a [`RenderBackend`] and a
//! [`MountSurface`]; [`gpu::WgpuBackend`] and [`window::WindowMount`] are the
//! real implementations. Shader text goes through naga's GLSL front end
//! before any GPU object exists, so compile and interface errors are reported
//! the same way on every backend. [`CanvasHost`] owns at most one session and
//! rebuilds it whenever the shader pair changes.

mod backend;
mod bindings;
mod compile;
mod error;
mod feeders;
mod geometry;
pub mod gpu;
mod reflect;
mod runtime;
mod session;
mod types;
mod uniforms;
pub mod window;

#[cfg(test)]
mod testing;

pub use backend::{FrameScheduler, MountSurface, RenderBackend};
pub use bindings::{
    resolve as resolve_bindings, AttributeBindings, AttributeLocation, ProgramBindings,
    UniformBindings, UniformSlot,
};
pub use compile::{
    build_program, compile_stage, link_interface, CompiledProgram, ProgramId, ProgramLayout,
    StageModule,
};
pub use error::{CanvasError, ErrorSink, TracingSink};
pub use feeders::{canvas_pointer, PointerFeeder, ResizeFeeder};
pub use geometry::{quad_vertex_data, GeometryBuffer, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use reflect::{BlockMember, InterfaceVar, MemberKind, StageInterface, UniformBlockLayout};
pub use runtime::{LoopState, RenderLoop, SessionClock};
pub use session::{CanvasHost, RenderSession};
pub use types::{
    CanvasOffset, GpuPowerPreference, Point, Resolution, ShaderSource, ShaderStage,
    ATTRIBUTE_VERTEX_POSITION, UNIFORM_MOUSE, UNIFORM_RESOLUTION, UNIFORM_TIME,
};
pub use uniforms::UniformState;
