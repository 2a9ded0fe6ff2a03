use std::time::Instant;

use crate::backend::{FrameScheduler, MountSurface, RenderBackend};
use crate::bindings::{self, ProgramBindings};
use crate::compile::{build_program, CompiledProgram, ProgramId};
use crate::error::{CanvasError, ErrorSink};
use crate::feeders::{PointerFeeder, ResizeFeeder};
use crate::geometry::GeometryBuffer;
use crate::runtime::{LoopState, RenderLoop};
use crate::types::{Point, Resolution, ShaderSource};
use crate::uniforms::UniformState;

/// One mounted shader pair: context, program, quad, uniform state, feeders
/// and loop, created and destroyed together.
///
/// Field order is drop order: GPU objects go before the context that made
/// them.
pub struct RenderSession<B: RenderBackend> {
    program: CompiledProgram<B>,
    geometry: GeometryBuffer<B>,
    bindings: ProgramBindings,
    uniforms: UniformState,
    resize: ResizeFeeder,
    pointer: PointerFeeder,
    render_loop: RenderLoop,
    source: ShaderSource,
    backend: B,
}

impl<B: RenderBackend> RenderSession<B> {
    /// Builds a session on `mount` and starts its loop.
    ///
    /// Any failure releases what was created so far and leaves nothing
    /// running.
    pub fn create<M>(mount: &M, source: ShaderSource) -> Result<Self, CanvasError>
    where
        M: MountSurface<Backend = B>,
    {
        let mut backend = mount.acquire_context()?;
        let size = mount.backing_size();
        if !size.is_empty() {
            backend.resize(size);
        }

        let program = build_program(&mut backend, &source)?;
        let bindings = bindings::resolve(&program)?;
        let geometry = GeometryBuffer::upload(&mut backend, bindings.attributes())?;

        let mut session = Self {
            program,
            geometry,
            bindings,
            uniforms: UniformState::new(size),
            resize: ResizeFeeder::default(),
            pointer: PointerFeeder::new(mount.offset()),
            render_loop: RenderLoop::new(),
            source,
            backend,
        };
        session.resize.attach();
        session.pointer.attach();
        session.render_loop.start(mount);

        tracing::info!(
            program = %session.program.id(),
            resolution = %size,
            "render session started"
        );
        Ok(session)
    }

    /// Handles one scheduler tick. Draw failures go to `sink` and the loop
    /// keeps running.
    pub fn frame(&mut self, scheduler: &impl FrameScheduler, now: Instant, sink: &mut impl ErrorSink) {
        let Some(time) = self.render_loop.begin_tick(scheduler, now) else {
            return;
        };
        self.uniforms.time = time;

        if !self.bindings.belongs_to(&self.program) {
            sink.report(&CanvasError::draw(format!(
                "bindings of {} cannot drive {}",
                self.bindings.program(),
                self.program.id()
            )));
            return;
        }

        let block = self.uniforms.encode(self.bindings.uniforms());
        match self.backend.draw(
            self.program.handle(),
            self.geometry.handle(),
            &block,
            self.geometry.vertex_count(),
        ) {
            Ok(()) => self.render_loop.finish_tick(),
            Err(err) => sink.report(&err),
        }
    }

    /// Feeds a new client size; the next frame draws with it.
    pub fn observe_resize(&mut self, size: Resolution) {
        if let Some(backing) = self.resize.observe(&mut self.uniforms, size) {
            self.backend.resize(backing);
        }
    }

    /// Feeds a page-space pointer position.
    pub fn observe_pointer(&mut self, page: Point) {
        self.pointer.observe(&mut self.uniforms, page);
    }

    /// Stops the loop, detaches the feeders and releases every GPU object,
    /// the context last.
    pub fn destroy(mut self, scheduler: &impl FrameScheduler) {
        self.render_loop.stop(scheduler);
        self.detach();
    }

    fn detach(&mut self) {
        self.resize.detach();
        self.pointer.detach();
    }

    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    pub fn program_id(&self) -> ProgramId {
        self.program.id()
    }

    pub fn program(&self) -> &CompiledProgram<B> {
        &self.program
    }

    pub fn bindings(&self) -> &ProgramBindings {
        &self.bindings
    }

    pub fn uniforms(&self) -> &UniformState {
        &self.uniforms
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn frame_count(&self) -> u64 {
        self.render_loop.frame_count()
    }
}

impl<B: RenderBackend> Drop for RenderSession<B> {
    fn drop(&mut self) {
        if self.render_loop.is_running() {
            tracing::debug!(program = %self.program.id(), "session dropped without destroy");
        }
        self.detach();
    }
}

/// Host-side owner of at most one live session.
///
/// Routes host events into the session and reports every failure to the
/// sink. Changing the source always tears the old session down before the
/// new one is built.
pub struct CanvasHost<M: MountSurface, S: ErrorSink> {
    session: Option<RenderSession<M::Backend>>,
    mount: Option<M>,
    source: Option<ShaderSource>,
    sink: S,
}

impl<M: MountSurface, S: ErrorSink> CanvasHost<M, S> {
    pub fn new(sink: S) -> Self {
        Self {
            session: None,
            mount: None,
            source: None,
            sink,
        }
    }

    /// Mounts onto `mount` with `source`, replacing any previous mount.
    pub fn mount(&mut self, mount: M, source: ShaderSource) {
        self.unmount();
        self.mount = Some(mount);
        self.source = Some(source);
        self.rebuild();
    }

    /// Swaps the shader pair. An equal pair is not a change and returns
    /// `false`.
    pub fn set_source(&mut self, source: ShaderSource) -> bool {
        if self.source.as_ref() == Some(&source) {
            tracing::debug!("shader pair unchanged; keeping the current session");
            return false;
        }
        self.teardown();
        self.source = Some(source);
        self.rebuild();
        true
    }

    /// Destroys the session and hands the mount back.
    pub fn unmount(&mut self) -> Option<M> {
        self.teardown();
        self.source = None;
        self.mount.take()
    }

    pub fn resize(&mut self, size: Resolution) {
        if let Some(session) = self.session.as_mut() {
            session.observe_resize(size);
        }
    }

    pub fn pointer_moved(&mut self, page: Point) {
        if let Some(session) = self.session.as_mut() {
            session.observe_pointer(page);
        }
    }

    pub fn frame(&mut self, now: Instant) {
        if let (Some(session), Some(mount)) = (self.session.as_mut(), self.mount.as_ref()) {
            session.frame(mount, now, &mut self.sink);
        }
    }

    pub fn session(&self) -> Option<&RenderSession<M::Backend>> {
        self.session.as_ref()
    }

    pub fn mount_surface(&self) -> Option<&M> {
        self.mount.as_ref()
    }

    pub fn source(&self) -> Option<&ShaderSource> {
        self.source.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            match self.mount.as_ref() {
                Some(mount) => session.destroy(mount),
                None => drop(session),
            }
        }
    }

    fn rebuild(&mut self) {
        let (Some(mount), Some(source)) = (self.mount.as_ref(), self.source.as_ref()) else {
            return;
        };
        match RenderSession::create(mount, source.clone()) {
            Ok(session) => self.session = Some(session),
            Err(err) => self.sink.report(&err),
        }
    }
}

impl<M: MountSurface, S: ErrorSink> Drop for CanvasHost<M, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{shaders, Event, FakeMount};
    use crate::types::{CanvasOffset, ShaderStage};

    fn four_quadrant() -> ShaderSource {
        ShaderSource::new(shaders::VERTEX, shaders::FOUR_QUADRANT)
    }

    #[test]
    fn session_starts_running_with_mount_size() {
        let mount = FakeMount::new(Resolution::new(640, 480));

        let session = RenderSession::create(&mount, four_quadrant()).unwrap();

        assert_eq!(session.loop_state(), LoopState::Running);
        assert_eq!(session.uniforms().resolution, Resolution::new(640, 480));
        assert_eq!(mount.frames_requested(), 1);
        assert_eq!(mount.log().resizes(), vec![Resolution::new(640, 480)]);
    }

    #[test]
    fn frames_draw_the_quad_with_current_uniforms() {
        let mount = FakeMount::new(Resolution::new(200, 100));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();
        let mut sink: Vec<CanvasError> = Vec::new();
        let t0 = Instant::now();

        session.frame(&mount, t0, &mut sink);
        session.observe_pointer(Point::new(50.0, 25.0));
        session.frame(&mount, t0 + Duration::from_secs(2), &mut sink);

        assert!(sink.is_empty());
        let draws = mount.log().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].vertex_count, 4);
        assert_eq!(draws[0].floats()[0], 0.0);
        assert_eq!(draws[1].floats(), vec![2.0, 0.0, 50.0, 75.0, 200.0, 100.0, 0.0, 0.0]);
        assert_eq!(session.frame_count(), 2);
        // one request at start plus one per tick
        assert_eq!(mount.frames_requested(), 3);
    }

    #[test]
    fn resize_reaches_next_frame_and_backing_store() {
        let mount = FakeMount::new(Resolution::new(200, 100));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();
        let mut sink: Vec<CanvasError> = Vec::new();

        session.observe_resize(Resolution::new(1024, 768));
        session.frame(&mount, Instant::now(), &mut sink);

        assert_eq!(session.uniforms().resolution, Resolution::new(1024, 768));
        assert_eq!(
            mount.log().resizes(),
            vec![Resolution::new(200, 100), Resolution::new(1024, 768)]
        );
        assert_eq!(&mount.log().draws()[0].floats()[4..6], &[1024.0, 768.0]);
    }

    #[test]
    fn zero_area_resize_keeps_backing_store() {
        let mount = FakeMount::new(Resolution::new(200, 100));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();

        session.observe_resize(Resolution::new(0, 0));

        assert_eq!(session.uniforms().resolution, Resolution::new(0, 0));
        assert_eq!(mount.log().resizes(), vec![Resolution::new(200, 100)]);
    }

    #[test]
    fn pointer_accounts_for_canvas_offset() {
        let mount = FakeMount::new(Resolution::new(300, 200)).with_offset(CanvasOffset::new(8.0, 16.0));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();

        session.observe_pointer(Point::new(108.0, 66.0));

        assert_eq!(session.uniforms().mouse, Point::new(100.0, 150.0));
    }

    #[test]
    fn draw_errors_are_reported_and_the_loop_continues() {
        let mount = FakeMount::new(Resolution::new(64, 64));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();
        let mut sink: Vec<CanvasError> = Vec::new();

        mount.log().fail_draws(true);
        session.frame(&mount, Instant::now(), &mut sink);
        mount.log().fail_draws(false);
        session.frame(&mount, Instant::now(), &mut sink);

        assert_eq!(sink.len(), 1);
        assert!(!sink[0].is_fatal());
        assert_eq!(session.loop_state(), LoopState::Running);
        assert_eq!(session.frame_count(), 1);
    }

    #[test]
    fn destroy_stops_the_loop_and_releases_everything() {
        let mount = FakeMount::new(Resolution::new(64, 64));
        let session = RenderSession::create(&mount, four_quadrant()).unwrap();

        session.destroy(&mount);

        assert_eq!(mount.frames_cancelled(), 1);
        let log = mount.log();
        assert_eq!(log.stages_created(), log.stages_released());
        assert_eq!(log.programs_linked(), log.programs_released());
        assert_eq!(log.geometry_uploads(), 1);
        assert_eq!(log.geometry_releases(), 1);
        let geometry_released = log.position(&Event::GeometryReleased).unwrap();
        let context_released = log.position(&Event::ContextReleased).unwrap();
        assert!(geometry_released < context_released);
        assert_eq!(log.events().last(), Some(&Event::ContextReleased));
    }

    #[test]
    fn quad_is_uploaded_once_after_link_and_before_the_first_draw() {
        let mount = FakeMount::new(Resolution::new(64, 64));
        let mut session = RenderSession::create(&mount, four_quadrant()).unwrap();
        let mut sink: Vec<CanvasError> = Vec::new();
        let t0 = Instant::now();

        session.frame(&mount, t0, &mut sink);
        session.frame(&mount, t0 + Duration::from_millis(16), &mut sink);

        let log = mount.log();
        let program = session.program().handle().id();
        let upload = Event::GeometryUploaded {
            components: 2,
            floats: 8,
        };
        assert_eq!(log.geometry_uploads(), 1);
        let linked = log.position(&Event::ProgramLinked(program)).unwrap();
        let uploaded = log.position(&upload).unwrap();
        let first_draw = log.position(&Event::Draw(program)).unwrap();
        assert!(linked < uploaded);
        assert!(uploaded < first_draw);
        assert_eq!(log.geometry_releases(), 0);
    }

    #[test]
    fn failed_upload_releases_the_program_and_never_starts() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        let mount = FakeMount::new(Resolution::new(64, 64));
        mount.log().fail_uploads(true);

        host.mount(mount, four_quadrant());
        host.frame(Instant::now());

        assert!(host.session().is_none());
        assert_eq!(host.sink().len(), 1);
        assert!(host.sink()[0].is_fatal());
        assert!(matches!(
            host.sink()[0],
            CanvasError::ContextUnavailable { .. }
        ));
        let mount = host.mount_surface().unwrap();
        let log = mount.log();
        assert_eq!(mount.frames_requested(), 0);
        assert!(log.draws().is_empty());
        assert_eq!(log.geometry_uploads(), 0);
        assert_eq!(log.programs_linked(), 1);
        assert_eq!(log.programs_released(), 1);
        assert_eq!(log.stages_created(), log.stages_released());
        assert_eq!(log.events().last(), Some(&Event::ContextReleased));
    }

    #[test]
    fn missing_context_is_fatal() {
        let mount = FakeMount::new(Resolution::new(64, 64)).without_context("no adapter");

        let err = RenderSession::create(&mount, four_quadrant()).err().unwrap();

        assert_eq!(err, CanvasError::context("no adapter"));
        assert_eq!(mount.frames_requested(), 0);
    }

    #[test]
    fn host_reports_setup_failures_and_stays_blank() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());

        host.mount(
            FakeMount::new(Resolution::new(64, 64)),
            ShaderSource::new(shaders::VERTEX, shaders::BROKEN_FRAGMENT),
        );
        host.frame(Instant::now());

        assert!(host.session().is_none());
        assert_eq!(host.sink().len(), 1);
        assert!(matches!(
            host.sink()[0],
            CanvasError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        let mount = host.mount_surface().unwrap();
        assert!(mount.log().draws().is_empty());
        assert_eq!(mount.log().programs_linked(), 0);
    }

    #[test]
    fn host_reports_missing_vertex_position() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());

        host.mount(
            FakeMount::new(Resolution::new(64, 64)),
            ShaderSource::new(shaders::VERTEX_WITHOUT_INPUTS, shaders::FOUR_QUADRANT),
        );

        assert!(host.session().is_none());
        assert_eq!(
            host.sink().as_slice(),
            &[CanvasError::BufferBinding {
                name: "aVertexPosition".into()
            }]
        );
    }

    #[test]
    fn swapping_sources_tears_down_before_rebuilding() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        host.mount(FakeMount::new(Resolution::new(64, 64)), four_quadrant());
        let first = host.session().unwrap().program().handle().id();
        host.frame(Instant::now());

        let changed = host.set_source(ShaderSource::new(shaders::VERTEX, shaders::TIME_ONLY_FRAGMENT));
        host.frame(Instant::now());

        assert!(changed);
        let second = host.session().unwrap().program().handle().id();
        assert_ne!(first, second);

        let events = host.mount_surface().unwrap().log().events();
        let released = events
            .iter()
            .position(|event| *event == Event::ProgramReleased(first))
            .expect("old program released");
        let context_released = events
            .iter()
            .position(|event| *event == Event::ContextReleased)
            .expect("old context released");
        let linked = events
            .iter()
            .position(|event| *event == Event::ProgramLinked(second))
            .expect("new program linked");
        assert!(released < context_released);
        assert!(context_released < linked);

        // one quad per session, released with the old one
        let upload = Event::GeometryUploaded {
            components: 2,
            floats: 8,
        };
        let uploads: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| **event == upload)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(uploads.len(), 2);
        let geometry_released = events
            .iter()
            .position(|event| *event == Event::GeometryReleased)
            .expect("old quad released");
        assert!(geometry_released < context_released);
        assert!(linked < uploads[1]);
        let second_draw = events
            .iter()
            .position(|event| *event == Event::Draw(second))
            .expect("new program drawn");
        assert!(uploads[1] < second_draw);

        // every draw after the swap uses the new program
        let draws = host.mount_surface().unwrap().log().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].program, first);
        assert_eq!(draws[1].program, second);
        assert_eq!(draws[1].uniforms.len(), 16);
    }

    #[test]
    fn equal_source_is_not_a_change() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        host.mount(FakeMount::new(Resolution::new(64, 64)), four_quadrant());
        let id = host.session().unwrap().program_id();

        assert!(!host.set_source(four_quadrant()));

        assert_eq!(host.session().unwrap().program_id(), id);
        assert_eq!(host.mount_surface().unwrap().log().programs_linked(), 1);
    }

    #[test]
    fn recreating_the_session_resets_time() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        host.mount(FakeMount::new(Resolution::new(64, 64)), four_quadrant());
        let t0 = Instant::now();
        host.frame(t0);
        host.frame(t0 + Duration::from_secs(3));

        host.set_source(ShaderSource::new(shaders::VERTEX, shaders::TIME_ONLY_FRAGMENT));
        host.frame(t0 + Duration::from_secs(4));

        let draws = host.mount_surface().unwrap().log().draws();
        assert_eq!(draws[1].floats()[0], 3.0);
        assert_eq!(draws[2].floats()[0], 0.0);
    }

    #[test]
    fn unused_mouse_uniform_still_draws() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        host.mount(
            FakeMount::new(Resolution::new(64, 64)),
            ShaderSource::new(shaders::VERTEX, shaders::UNUSED_MOUSE_FRAGMENT),
        );
        host.pointer_moved(Point::new(1.0, 1.0));
        host.frame(Instant::now());

        assert!(host.sink().is_empty());
        assert_eq!(host.mount_surface().unwrap().log().draws().len(), 1);
    }

    #[test]
    fn unmount_stops_the_loop_and_returns_the_mount() {
        let mut host = CanvasHost::new(Vec::<CanvasError>::new());
        host.mount(FakeMount::new(Resolution::new(64, 64)), four_quadrant());

        let mount = host.unmount().unwrap();
        host.frame(Instant::now());

        assert!(host.session().is_none());
        assert_eq!(mount.frames_cancelled(), 1);
        assert!(mount.log().draws().is_empty());
        assert_eq!(mount.log().events().last(), Some(&Event::ContextReleased));
    }
}
