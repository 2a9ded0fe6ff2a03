use std::fmt;
use std::sync::Arc;

use wgpu::naga;

/// Name of the vertex attribute fed from the quad buffer.
pub const ATTRIBUTE_VERTEX_POSITION: &str = "aVertexPosition";
/// Seconds since the first frame of the session.
pub const UNIFORM_TIME: &str = "u_time";
/// Pointer position in canvas-local pixels, origin bottom-left.
pub const UNIFORM_MOUSE: &str = "u_mouse";
/// Backing-store size of the canvas in pixels.
pub const UNIFORM_RESOLUTION: &str = "u_resolution";

/// Immutable (vertex, fragment) source pair.
///
/// Sessions compare pairs by value: handing the host an equal pair is not a
/// change, any difference in either text forces a full rebuild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    vertex: Arc<str>,
    fragment: Arc<str>,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<Arc<str>>, fragment: impl Into<Arc<str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn vertex(&self) -> &Arc<str> {
        &self.vertex
    }

    pub fn fragment(&self) -> &Arc<str> {
        &self.fragment
    }

    pub(crate) fn stage(&self, stage: ShaderStage) -> &Arc<str> {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// Programmable stage a source text belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Backing-store size of the drawable surface in physical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A point in pixels: page coordinates for raw pointer events, canvas-local
/// coordinates once converted by the pointer feeder.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position of the canvas' top-left corner inside the host page.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanvasOffset {
    pub left: f32,
    pub top: f32,
}

impl CanvasOffset {
    pub const fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }
}

/// Adapter selection hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}
