//! Vector rotate operation.
//!
//! Rotates a vector around a pivot point, either by Euler angles in one of
//! six axis orders or by an angle around an axis.
//!
//! Operand layout:
//!
//! | word | field 0 | field 1        | field 2          |
//! |------|---------|----------------|------------------|
//! | 1    | mode    | vector offset  | rotation offset  |
//! | 2    | center  | axis offset    | angle offset     |

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::pack::unpack_uchar3;
use super::stack::{stack_valid, RegisterFile};

/// Rotation mode selector, stored as the first byte of the first operand word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RotateMode {
    /// Rotate around a caller-supplied axis, normalized before use.
    #[default]
    AxisAngle = 0,
    /// Rotate around +X.
    AxisX = 1,
    /// Rotate around +Y.
    AxisY = 2,
    /// Rotate around +Z.
    AxisZ = 3,
    /// Euler rotation, XYZ order.
    EulerXyz = 4,
    /// Euler rotation, XZY order.
    EulerXzy = 5,
    /// Euler rotation, YXZ order.
    EulerYxz = 6,
    /// Euler rotation, YZX order.
    EulerYzx = 7,
    /// Euler rotation, ZXY order.
    EulerZxy = 8,
    /// Euler rotation, ZYX order.
    EulerZyx = 9,
}

impl RotateMode {
    /// All modes, in selector order.
    pub const ALL: [RotateMode; 10] = [
        RotateMode::AxisAngle,
        RotateMode::AxisX,
        RotateMode::AxisY,
        RotateMode::AxisZ,
        RotateMode::EulerXyz,
        RotateMode::EulerXzy,
        RotateMode::EulerYxz,
        RotateMode::EulerYzx,
        RotateMode::EulerZxy,
        RotateMode::EulerZyx,
    ];

    /// Decode a selector byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Decode a selector field as the kernel does: unknown values fall back to
    /// the default Euler order.
    #[inline]
    pub fn from_selector(value: u32) -> Self {
        u8::try_from(value)
            .ok()
            .and_then(Self::from_u8)
            .unwrap_or(RotateMode::EulerXyz)
    }

    /// Selector byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse the authored `rotation_type` property.
    pub fn from_property(value: &str) -> Option<Self> {
        let mode = match value {
            "AXIS_ANGLE" => RotateMode::AxisAngle,
            "X_AXIS" => RotateMode::AxisX,
            "Y_AXIS" => RotateMode::AxisY,
            "Z_AXIS" => RotateMode::AxisZ,
            "EULER_XYZ" => RotateMode::EulerXyz,
            "EULER_XZY" => RotateMode::EulerXzy,
            "EULER_YXZ" => RotateMode::EulerYxz,
            "EULER_YZX" => RotateMode::EulerYzx,
            "EULER_ZXY" => RotateMode::EulerZxy,
            "EULER_ZYX" => RotateMode::EulerZyx,
            _ => return None,
        };
        Some(mode)
    }

    /// `true` for the four axis-angle modes.
    pub fn is_axis(self) -> bool {
        matches!(
            self,
            RotateMode::AxisAngle | RotateMode::AxisX | RotateMode::AxisY | RotateMode::AxisZ
        )
    }
}

/// Rotation matrix for Euler angles applied X, then Y, then Z.
pub fn euler_to_mat3(euler: Vec3) -> Mat3 {
    let (sx, cx) = euler.x.sin_cos();
    let (sy, cy) = euler.y.sin_cos();
    let (sz, cz) = euler.z.sin_cos();
    Mat3::from_cols(
        Vec3::new(cy * cz, cy * sz, -sy),
        Vec3::new(sy * sx * cz - cx * sz, sy * sx * sz + cx * cz, cy * sx),
        Vec3::new(sy * cx * cz + sx * sz, sy * cx * sz - sx * cz, cy * cx),
    )
}

/// Rotate `p` around the unit vector `axis` by `angle` radians.
pub fn rotate_around_axis(p: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    let t = 1.0 - cos;
    Vec3::new(
        (cos + t * axis.x * axis.x) * p.x
            + (t * axis.x * axis.y - axis.z * sin) * p.y
            + (t * axis.x * axis.z + axis.y * sin) * p.z,
        (t * axis.x * axis.y + axis.z * sin) * p.x
            + (cos + t * axis.y * axis.y) * p.y
            + (t * axis.y * axis.z - axis.x * sin) * p.z,
        (t * axis.x * axis.z - axis.y * sin) * p.x
            + (t * axis.y * axis.z + axis.x * sin) * p.y
            + (cos + t * axis.z * axis.z) * p.z,
    )
}

/// Express a rotation in `mode`'s axis order in terms of the default order.
#[inline]
fn permute_euler(mode: RotateMode, r: Vec3) -> Vec3 {
    match mode {
        RotateMode::EulerXzy => Vec3::new(-r.x, -r.z, -r.y),
        RotateMode::EulerYxz => Vec3::new(-r.y, -r.x, -r.z),
        RotateMode::EulerYzx => Vec3::new(r.y, r.z, r.x),
        RotateMode::EulerZxy => Vec3::new(r.z, r.x, r.y),
        RotateMode::EulerZyx => Vec3::new(-r.z, -r.y, -r.x),
        _ => r,
    }
}

/// Rotate `vector` around `center` by an Euler rotation.
#[inline]
pub fn rotate_euler(mode: RotateMode, vector: Vec3, center: Vec3, rotation: Vec3) -> Vec3 {
    euler_to_mat3(permute_euler(mode, rotation)) * (vector - center) + center
}

/// Rotate `vector` around `center` by `angle` about an axis.
///
/// `custom_axis` is only read in [`RotateMode::AxisAngle`]. A zero axis
/// leaves `vector` unchanged.
#[inline]
pub fn rotate_axis(
    mode: RotateMode,
    vector: Vec3,
    center: Vec3,
    custom_axis: Vec3,
    angle: f32,
) -> Vec3 {
    let axis = match mode {
        RotateMode::AxisX => Vec3::X,
        RotateMode::AxisY => Vec3::Y,
        RotateMode::AxisZ => Vec3::Z,
        _ => custom_axis.normalize_or_zero(),
    };
    if axis == Vec3::ZERO {
        vector
    } else {
        rotate_around_axis(vector - center, axis, angle) + center
    }
}

/// Evaluate one vector-rotate instruction against `stack`.
pub fn vector_rotate(
    stack: &mut RegisterFile,
    input_offsets: u32,
    axis_offsets: u32,
    result_offset: u32,
) {
    let (mode, vector_offset, rotation_offset) = unpack_uchar3(input_offsets);
    let (center_offset, axis_offset, angle_offset) = unpack_uchar3(axis_offsets);
    let mode = RotateMode::from_selector(mode);

    let vector = stack.load_float3(vector_offset);
    let center = stack.load_float3(center_offset);

    let result = if mode.is_axis() {
        let axis = if mode == RotateMode::AxisAngle {
            stack.load_float3(axis_offset)
        } else {
            Vec3::ZERO
        };
        let angle = stack.load_float(angle_offset);
        rotate_axis(mode, vector, center, axis, angle)
    } else {
        let rotation = stack.load_float3(rotation_offset);
        rotate_euler(mode, vector, center, rotation)
    };

    if stack_valid(result_offset) {
        stack.store_float3(result_offset, result);
    }
}
