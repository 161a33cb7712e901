//! Kernel module: stack-machine operations evaluated once per sample.
//!
//! Every operation is a pure function of a register file and its operand
//! words. It writes at most one result and skips the write when the result
//! offset is [`STACK_INVALID`].

// IMPORTANT: kernel code runs once per sample on every lane. Do not log, allocate,
// or call assert_invariant from anything in this module tree.

pub mod pack;
pub mod stack;
pub mod value;
pub mod vector_rotate;

use glam::Vec3;

pub use pack::{pack_uchar3, pack_uchar4, unpack_uchar3, unpack_uchar4};
pub use stack::{stack_valid, RegisterFile, STACK_INVALID, STACK_SIZE};
pub use vector_rotate::RotateMode;

/// One compiled operation instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Load a float constant.
    ValueF {
        /// Constant to store.
        value: f32,
        /// Result offset.
        out: u32,
    },
    /// Load a float3 constant.
    ValueV {
        /// Constant to store.
        value: [f32; 3],
        /// Result offset.
        out: u32,
    },
    /// Rotate a vector; see [`vector_rotate::vector_rotate`].
    VectorRotate {
        /// Packed mode, vector offset and rotation offset.
        input_offsets: u32,
        /// Packed center offset, axis offset and angle offset.
        axis_offsets: u32,
        /// Result offset.
        out: u32,
    },
}

impl Instruction {
    /// Build a vector-rotate instruction from unpacked offsets.
    #[allow(clippy::too_many_arguments)]
    pub fn vector_rotate(
        mode: RotateMode,
        vector: u8,
        rotation: u8,
        center: u8,
        axis: u8,
        angle: u8,
        out: u32,
    ) -> Self {
        Instruction::VectorRotate {
            input_offsets: pack_uchar3(mode.as_u8(), vector, rotation),
            axis_offsets: pack_uchar3(center, axis, angle),
            out,
        }
    }
}

/// Evaluate a single instruction.
#[inline]
pub fn eval_instruction(instruction: &Instruction, stack: &mut RegisterFile) {
    match *instruction {
        Instruction::ValueF { value, out } => value::value_f(stack, value, out),
        Instruction::ValueV { value, out } => value::value_v(stack, Vec3::from_array(value), out),
        Instruction::VectorRotate {
            input_offsets,
            axis_offsets,
            out,
        } => vector_rotate::vector_rotate(stack, input_offsets, axis_offsets, out),
    }
}

/// Evaluate a program front to back on one register file.
pub fn eval_program(program: &[Instruction], stack: &mut RegisterFile) {
    for instruction in program {
        eval_instruction(instruction, stack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_chains_through_registers() {
        let program = [
            Instruction::ValueV {
                value: [1.0, 0.0, 0.0],
                out: 0,
            },
            Instruction::ValueV {
                value: [0.0, 0.0, 0.0],
                out: 3,
            },
            Instruction::ValueF {
                value: std::f32::consts::PI,
                out: 6,
            },
            // Rotation and axis registers are never read by a fixed-axis mode.
            Instruction::vector_rotate(RotateMode::AxisZ, 0, 255, 3, 255, 6, 7),
        ];
        let mut regs = RegisterFile::new();
        eval_program(&program, &mut regs);
        let r = regs.load_float3(7);
        assert!((r - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5, "{r:?}");
    }

    #[test]
    fn unused_result_writes_nothing() {
        let mut regs = RegisterFile::new();
        regs.store_float3(0, Vec3::new(1.0, 2.0, 3.0));
        let before = regs.clone();
        eval_instruction(
            &Instruction::vector_rotate(RotateMode::EulerXyz, 0, 3, 6, 9, 12, STACK_INVALID),
            &mut regs,
        );
        assert_eq!(regs, before);
    }
}
