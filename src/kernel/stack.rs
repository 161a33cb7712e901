//! Per-invocation register file.

use glam::Vec3;

/// Number of `f32` slots in a register file.
pub const STACK_SIZE: usize = 255;

/// Offset meaning "this value is not needed". Never dereferenced.
pub const STACK_INVALID: u32 = 255;

/// Returns `true` if `offset` refers to a real register.
#[inline]
pub fn stack_valid(offset: u32) -> bool {
    offset != STACK_INVALID
}

/// Flat register file owned by a single lane.
///
/// Offsets are assigned by the compiler. A float3 occupies three consecutive
/// slots starting at its offset. Reading or writing past the end is a
/// contract violation and panics through the slice bounds check.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterFile {
    slots: [f32; STACK_SIZE],
}

impl RegisterFile {
    /// A register file with every slot zeroed.
    pub fn new() -> Self {
        Self {
            slots: [0.0; STACK_SIZE],
        }
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.slots.fill(0.0);
    }

    /// Read a float.
    #[inline]
    pub fn load_float(&self, offset: u32) -> f32 {
        self.slots[offset as usize]
    }

    /// Read a float3.
    #[inline]
    pub fn load_float3(&self, offset: u32) -> Vec3 {
        let a = offset as usize;
        Vec3::new(self.slots[a], self.slots[a + 1], self.slots[a + 2])
    }

    /// Write a float.
    #[inline]
    pub fn store_float(&mut self, offset: u32, value: f32) {
        self.slots[offset as usize] = value;
    }

    /// Write a float3.
    #[inline]
    pub fn store_float3(&mut self, offset: u32, value: Vec3) {
        let a = offset as usize;
        self.slots[a] = value.x;
        self.slots[a + 1] = value.y;
        self.slots[a + 2] = value.z;
    }

    /// All slots, for inspection.
    pub fn as_slice(&self) -> &[f32] {
        &self.slots
    }

    /// All slots, for seeding lane inputs.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.slots
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
