//! Feeders translate host observations into [`UniformState`] writes.
//!
//! Both are owned by the session and attached for exactly as long as its
//! loop runs; a detached feeder drops whatever it is given.

use crate::types::{CanvasOffset, Point, Resolution};
use crate::uniforms::UniformState;

/// Tracks the host container's client size.
#[derive(Debug, Default)]
pub struct ResizeFeeder {
    attached: bool,
}

impl ResizeFeeder {
    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Records a new client size.
    ///
    /// Returns the size the backing store should be synchronized to, or
    /// `None` when nothing should reach the backend (detached, or a
    /// zero-area size that a surface cannot be configured with).
    pub fn observe(&self, state: &mut UniformState, size: Resolution) -> Option<Resolution> {
        if !self.attached {
            return None;
        }
        state.resolution = size;
        (!size.is_empty()).then_some(size)
    }
}

/// Converts page-space pointer positions into canvas-local ones with the
/// origin at the bottom-left corner.
#[derive(Debug)]
pub struct PointerFeeder {
    offset: CanvasOffset,
    attached: bool,
}

impl PointerFeeder {
    pub fn new(offset: CanvasOffset) -> Self {
        Self {
            offset,
            attached: false,
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn observe(&self, state: &mut UniformState, page: Point) {
        if !self.attached {
            return;
        }
        state.mouse = canvas_pointer(page, self.offset, state.resolution.height as f32);
    }
}

/// `x = px - left`, `y = -(py - height - top)`.
pub fn canvas_pointer(page: Point, offset: CanvasOffset, height: f32) -> Point {
    Point::new(page.x - offset.left, -(page.y - height - offset.top))
}
