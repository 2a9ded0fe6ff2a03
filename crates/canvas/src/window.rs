use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::backend::{FrameScheduler, MountSurface};
use crate::error::{CanvasError, TracingSink};
use crate::gpu::WgpuBackend;
use crate::session::CanvasHost;
use crate::types::{CanvasOffset, GpuPowerPreference, Point, Resolution, ShaderSource};

/// A `winit` window as a mount surface.
///
/// Every session acquires its own `wgpu` surface for the window. The host
/// drops the previous session before acquiring, so a window never carries
/// two surfaces at once.
pub struct WindowMount {
    window: Arc<Window>,
    offset: CanvasOffset,
    gpu_power: GpuPowerPreference,
}

impl WindowMount {
    pub fn new(window: Arc<Window>, offset: CanvasOffset, gpu_power: GpuPowerPreference) -> Self {
        Self {
            window,
            offset,
            gpu_power,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl FrameScheduler for WindowMount {
    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

impl MountSurface for WindowMount {
    type Backend = WgpuBackend;

    fn acquire_context(&self) -> Result<Self::Backend, CanvasError> {
        WgpuBackend::new(Arc::clone(&self.window), self.backing_size(), self.gpu_power)
    }

    fn backing_size(&self) -> Resolution {
        let size = self.window.inner_size();
        Resolution::new(size.width, size.height)
    }

    fn offset(&self) -> CanvasOffset {
        self.offset
    }
}

/// Page navigation requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    /// Re-read the current page's files.
    Reload,
}

/// A shader pair plus the title of the page it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedSource {
    pub title: String,
    pub source: ShaderSource,
}

/// Supplies shader pairs to the window as the user moves between pages.
pub trait ShaderRouter {
    fn load(&mut self) -> Result<RoutedSource>;

    fn navigate(&mut self, navigation: Navigation) -> Result<RoutedSource>;
}

/// Window settings fixed at startup.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub size: Resolution,
    pub offset: CanvasOffset,
    pub gpu_power: GpuPowerPreference,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: Resolution::new(960, 540),
            offset: CanvasOffset::default(),
            gpu_power: GpuPowerPreference::default(),
        }
    }
}

/// Opens the preview window and runs until it is closed.
pub fn run<R>(config: WindowConfig, mut router: R) -> Result<()>
where
    R: ShaderRouter + 'static,
{
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let initial = router.load()?;
    let window = WindowBuilder::new()
        .with_title(initial.title.as_str())
        .with_inner_size(PhysicalSize::new(config.size.width, config.size.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut host = CanvasHost::new(TracingSink);
    host.mount(
        WindowMount::new(Arc::clone(&window), config.offset, config.gpu_power),
        initial.source,
    );

    event_loop.set_control_flow(ControlFlow::Wait);
    event_loop
        .run(move |event, elwt| {
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    host.unmount();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    host.resize(Resolution::new(size.width, size.height));
                }
                WindowEvent::CursorMoved { position, .. } => {
                    host.pointer_moved(Point::new(position.x as f32, position.y as f32));
                }
                WindowEvent::KeyboardInput { event, .. } => match key_action(&event) {
                    Some(KeyAction::Navigate(navigation)) => match router.navigate(navigation) {
                        Ok(routed) => {
                            window.set_title(&routed.title);
                            host.set_source(routed.source);
                        }
                        Err(err) => tracing::error!("failed to load page: {err:#}"),
                    },
                    Some(KeyAction::Close) => {
                        host.unmount();
                        elwt.exit();
                    }
                    None => {}
                },
                WindowEvent::RedrawRequested => host.frame(Instant::now()),
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Navigate(Navigation),
    Close,
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    action_for_key(&event.logical_key)
}

fn action_for_key(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::ArrowRight | NamedKey::Space) => {
            Some(KeyAction::Navigate(Navigation::Next))
        }
        Key::Named(NamedKey::ArrowLeft) => Some(KeyAction::Navigate(Navigation::Previous)),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        Key::Character(value) if value.eq_ignore_ascii_case("r") => {
            Some(KeyAction::Navigate(Navigation::Reload))
        }
        Key::Character(value) if value.as_str() == " " => Some(KeyAction::Navigate(Navigation::Next)),
        _ => None,
    }
}
