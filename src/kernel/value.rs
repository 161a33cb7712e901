//! Constant loads: the register-level form of constant sources.

use glam::Vec3;

use super::stack::{stack_valid, RegisterFile};

/// Store a float constant.
#[inline]
pub fn value_f(stack: &mut RegisterFile, value: f32, out_offset: u32) {
    if stack_valid(out_offset) {
        stack.store_float(out_offset, value);
    }
}

/// Store a float3 constant.
#[inline]
pub fn value_v(stack: &mut RegisterFile, value: Vec3, out_offset: u32) {
    if stack_valid(out_offset) {
        stack.store_float3(out_offset, value);
    }
}
