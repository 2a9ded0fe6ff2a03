use crate::backend::RenderBackend;
use crate::bindings::AttributeBindings;
use crate::error::CanvasError;

/// Corners of the full-screen quad in triangle-strip order.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[1.0, 1.0], [-1.0, 1.0], [1.0, -1.0], [-1.0, -1.0]];

/// Vertices drawn per frame.
pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

/// Expands the quad to `components` floats per vertex, filling z with 0 and
/// w with 1 the way GL does for short attributes.
pub fn quad_vertex_data(components: u32) -> Vec<f32> {
    let components = components.clamp(2, 4) as usize;
    let mut data = Vec::with_capacity(QUAD_VERTICES.len() * components);
    for [x, y] in QUAD_VERTICES {
        data.extend_from_slice(&[x, y, 0.0, 1.0][..components]);
    }
    data
}

/// The quad uploaded once per session; never written again.
pub struct GeometryBuffer<B: RenderBackend> {
    handle: B::Geometry,
    vertex_count: u32,
}

impl<B: RenderBackend> GeometryBuffer<B> {
    pub fn upload(backend: &mut B, attributes: &AttributeBindings) -> Result<Self, CanvasError> {
        let components = attributes.vertex_position().components();
        let data = quad_vertex_data(components);
        let handle = backend.upload_geometry(&data, components)?;
        tracing::trace!(components, "uploaded quad geometry");
        Ok(Self {
            handle,
            vertex_count: QUAD_VERTEX_COUNT,
        })
    }

    pub fn handle(&self) -> &B::Geometry {
        &self.handle
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
