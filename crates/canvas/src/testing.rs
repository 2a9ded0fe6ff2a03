//! GPU-free doubles: a backend that records what it is asked to do and a
//! mount that hands it out.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backend::{FrameScheduler, MountSurface, RenderBackend};
use crate::compile::{ProgramLayout, StageModule};
use crate::error::CanvasError;
use crate::types::{CanvasOffset, Resolution, ShaderStage};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    StageCreated(u64, ShaderStage),
    StageReleased(u64),
    ProgramLinked(u64),
    ProgramReleased(u64),
    GeometryUploaded { components: u32, floats: usize },
    GeometryReleased,
    Resized(Resolution),
    Draw(u64),
    ContextReleased,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub program: u64,
    pub uniforms: Vec<u8>,
    pub vertex_count: u32,
}

impl DrawCall {
    pub fn floats(&self) -> Vec<f32> {
        self.uniforms
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect()
    }
}

/// Everything a recording backend saw, shared with the test.
#[derive(Debug, Default)]
pub struct BackendLog {
    events: RefCell<Vec<Event>>,
    draws: RefCell<Vec<DrawCall>>,
    fail_draws: Cell<bool>,
    fail_uploads: Cell<bool>,
    next_id: Cell<u64>,
}

impl BackendLog {
    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| matches(event)).count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.draws.borrow().clone()
    }

    pub fn resizes(&self) -> Vec<Resolution> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Resized(size) => Some(*size),
                _ => None,
            })
            .collect()
    }

    pub fn stages_created(&self) -> usize {
        self.count(|event| matches!(event, Event::StageCreated(..)))
    }

    pub fn stages_released(&self) -> usize {
        self.count(|event| matches!(event, Event::StageReleased(_)))
    }

    pub fn programs_linked(&self) -> usize {
        self.count(|event| matches!(event, Event::ProgramLinked(_)))
    }

    pub fn programs_released(&self) -> usize {
        self.count(|event| matches!(event, Event::ProgramReleased(_)))
    }

    pub fn geometry_uploads(&self) -> usize {
        self.count(|event| matches!(event, Event::GeometryUploaded { .. }))
    }

    pub fn geometry_releases(&self) -> usize {
        self.count(|event| matches!(event, Event::GeometryReleased))
    }

    /// Index of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.borrow().iter().position(|seen| seen == event)
    }

    pub fn fail_draws(&self, fail: bool) {
        self.fail_draws.set(fail);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.set(fail);
    }
}

pub struct RecordedStage {
    id: u64,
    log: Rc<BackendLog>,
}

impl Drop for RecordedStage {
    fn drop(&mut self) {
        self.log.push(Event::StageReleased(self.id));
    }
}

pub struct RecordedProgram {
    id: u64,
    log: Rc<BackendLog>,
}

impl RecordedProgram {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for RecordedProgram {
    fn drop(&mut self) {
        self.log.push(Event::ProgramReleased(self.id));
    }
}

pub struct RecordedGeometry {
    log: Rc<BackendLog>,
}

impl Drop for RecordedGeometry {
    fn drop(&mut self) {
        self.log.push(Event::GeometryReleased);
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    log: Rc<BackendLog>,
    link_failure: Option<String>,
}

impl RecordingBackend {
    pub fn with_log(log: Rc<BackendLog>) -> Self {
        Self {
            log,
            link_failure: None,
        }
    }

    pub fn failing_link(mut self, log: &str) -> Self {
        self.link_failure = Some(log.to_string());
        self
    }

    pub fn log(&self) -> &BackendLog {
        &self.log
    }
}

impl Drop for RecordingBackend {
    fn drop(&mut self) {
        self.log.push(Event::ContextReleased);
    }
}

impl RenderBackend for RecordingBackend {
    type Stage = RecordedStage;
    type Program = RecordedProgram;
    type Geometry = RecordedGeometry;

    fn create_stage(&mut self, module: &StageModule) -> Result<Self::Stage, CanvasError> {
        let id = self.log.next_id();
        self.log.push(Event::StageCreated(id, module.stage()));
        Ok(RecordedStage {
            id,
            log: Rc::clone(&self.log),
        })
    }

    fn link_program(
        &mut self,
        _vertex: &Self::Stage,
        _fragment: &Self::Stage,
        _layout: &ProgramLayout,
    ) -> Result<Self::Program, CanvasError> {
        if let Some(log) = &self.link_failure {
            return Err(CanvasError::link(log.clone()));
        }
        let id = self.log.next_id();
        self.log.push(Event::ProgramLinked(id));
        Ok(RecordedProgram {
            id,
            log: Rc::clone(&self.log),
        })
    }

    fn upload_geometry(
        &mut self,
        vertices: &[f32],
        components: u32,
    ) -> Result<Self::Geometry, CanvasError> {
        if self.log.fail_uploads.get() {
            return Err(CanvasError::context("out of memory allocating the vertex buffer"));
        }
        self.log.push(Event::GeometryUploaded {
            components,
            floats: vertices.len(),
        });
        Ok(RecordedGeometry {
            log: Rc::clone(&self.log),
        })
    }

    fn resize(&mut self, size: Resolution) {
        self.log.push(Event::Resized(size));
    }

    fn draw(
        &mut self,
        program: &Self::Program,
        _geometry: &Self::Geometry,
        uniforms: &[u8],
        vertex_count: u32,
    ) -> Result<(), CanvasError> {
        if self.log.fail_draws.get() {
            return Err(CanvasError::draw("surface lost"));
        }
        self.log.push(Event::Draw(program.id));
        self.log.draws.borrow_mut().push(DrawCall {
            program: program.id,
            uniforms: uniforms.to_vec(),
            vertex_count,
        });
        Ok(())
    }
}

/// Mount that counts scheduler calls and hands out recording backends
/// sharing one log.
pub struct FakeMount {
    log: Rc<BackendLog>,
    size: Resolution,
    offset: CanvasOffset,
    context_failure: Option<String>,
    requested: Cell<u32>,
    cancelled: Cell<u32>,
}

impl FakeMount {
    pub fn new(size: Resolution) -> Self {
        Self {
            log: Rc::default(),
            size,
            offset: CanvasOffset::default(),
            context_failure: None,
            requested: Cell::new(0),
            cancelled: Cell::new(0),
        }
    }

    pub fn with_offset(mut self, offset: CanvasOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn without_context(mut self, reason: &str) -> Self {
        self.context_failure = Some(reason.to_string());
        self
    }

    pub fn log(&self) -> &BackendLog {
        &self.log
    }

    pub fn frames_requested(&self) -> u32 {
        self.requested.get()
    }

    pub fn frames_cancelled(&self) -> u32 {
        self.cancelled.get()
    }
}

impl FrameScheduler for FakeMount {
    fn request_frame(&self) {
        self.requested.set(self.requested.get() + 1);
    }

    fn cancel_frame(&self) {
        self.cancelled.set(self.cancelled.get() + 1);
    }
}

impl MountSurface for FakeMount {
    type Backend = RecordingBackend;

    fn acquire_context(&self) -> Result<Self::Backend, CanvasError> {
        match &self.context_failure {
            Some(reason) => Err(CanvasError::context(reason.clone())),
            None => Ok(RecordingBackend::with_log(Rc::clone(&self.log))),
        }
    }

    fn backing_size(&self) -> Resolution {
        self.size
    }

    fn offset(&self) -> CanvasOffset {
        self.offset
    }
}

pub mod shaders {
    pub const VERTEX: &str = include_str!("../../../shaders/vertex.glsl");
    pub const FOUR_QUADRANT: &str = include_str!("../../../shaders/four_quadrant.glsl");

    pub const BROKEN_FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(1.0;
}
";

    pub const TIME_ONLY_FRAGMENT: &str = "#version 450
layout(set = 0, binding = 0) uniform Uniforms {
    float u_time;
};
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(fract(u_time), 0.0, 0.0, 1.0);
}
";

    pub const UNUSED_MOUSE_FRAGMENT: &str = "#version 450
layout(set = 0, binding = 0) uniform Uniforms {
    float u_time;
    vec2 u_mouse;
    vec2 u_resolution;
};
layout(location = 0) out vec4 fragColor;
void main() {
    vec2 st = gl_FragCoord.xy / u_resolution;
    fragColor = vec4(st, abs(sin(u_time)), 1.0);
}
";

    pub const INT_TIME_FRAGMENT: &str = "#version 450
layout(set = 0, binding = 0) uniform Uniforms {
    int u_time;
    vec2 u_resolution;
};
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(gl_FragCoord.xy / u_resolution, float(u_time), 1.0);
}
";

    pub const TEXTURED_FRAGMENT: &str = "#version 450
layout(set = 0, binding = 1) uniform texture2D u_texture;
layout(set = 0, binding = 2) uniform sampler u_sampler;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = texture(sampler2D(u_texture, u_sampler), vec2(0.5, 0.5));
}
";

    pub const VARYING_VERTEX: &str = "#version 450
layout(location = 0) in vec2 aVertexPosition;
layout(location = 0) out vec2 v_uv;
void main() {
    v_uv = aVertexPosition * 0.5 + 0.5;
    gl_Position = vec4(aVertexPosition, 0.0, 1.0);
}
";

    pub const VARYING_FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(v_uv, 0.0, 1.0);
}
";

    pub const VERTEX_WITH_COLOR: &str = "#version 450
layout(location = 0) in vec2 aVertexPosition;
layout(location = 1) in vec3 a_color;
layout(location = 0) out vec3 v_color;
void main() {
    v_color = a_color;
    gl_Position = vec4(aVertexPosition, 0.0, 1.0);
}
";

    pub const VERTEX_WITHOUT_INPUTS: &str = "#version 450
void main() {
    gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
}
";

    pub const VERTEX_WITH_SHIFTED_BLOCK: &str = "#version 450
layout(set = 0, binding = 0) uniform Uniforms {
    vec2 u_mouse;
    float u_time;
};
layout(location = 0) in vec2 aVertexPosition;
void main() {
    gl_Position = vec4(aVertexPosition + u_mouse * 0.0, u_time * 0.0, 1.0);
}
";
}
