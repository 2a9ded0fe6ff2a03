use crate::bindings::{UniformBindings, UniformSlot};
use crate::types::{Point, Resolution};

/// Host-fed values pushed to the program every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UniformState {
    /// Seconds since the session's first frame.
    pub time: f32,
    /// Canvas-local pointer position, origin bottom-left.
    pub mouse: Point,
    pub resolution: Resolution,
}

impl UniformState {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Writes the declared values into a fresh uniform block image.
    ///
    /// Absent slots are left zeroed; vector slots wider than the value are
    /// zero-padded.
    pub fn encode(&self, bindings: &UniformBindings) -> Vec<u8> {
        let mut block = vec![0u8; bindings.block_size() as usize];
        if let Some(slot) = bindings.time {
            write_floats(&mut block, slot, &[self.time]);
        }
        if let Some(slot) = bindings.mouse {
            write_floats(&mut block, slot, &[self.mouse.x, self.mouse.y]);
        }
        if let Some(slot) = bindings.resolution {
            write_floats(
                &mut block,
                slot,
                &[self.resolution.width as f32, self.resolution.height as f32],
            );
        }
        block
    }
}

fn write_floats(block: &mut [u8], slot: UniformSlot, values: &[f32]) {
    let count = values.len().min(slot.components() as usize);
    let bytes: &[u8] = bytemuck::cast_slice(&values[..count]);
    let start = slot.offset() as usize;
    match block.get_mut(start..start + bytes.len()) {
        Some(target) => target.copy_from_slice(bytes),
        None => tracing::warn!(offset = start, "uniform slot lies outside the block"),
    }
}
