//! Socket value types shared by the authored tree and the data-flow graph.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// The value type carried by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    /// Single float.
    Float,
    /// Signed integer.
    Int,
    /// Three-component vector.
    Vector,
    /// Three-component RGB color.
    Color,
}

impl SocketType {
    /// Number of register slots a value of this type occupies.
    pub fn slot_count(self) -> usize {
        match self {
            SocketType::Float | SocketType::Int => 1,
            SocketType::Vector | SocketType::Color => 3,
        }
    }
}

/// Direction of a socket relative to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Consumes a value.
    Input,
    /// Produces a value.
    Output,
}

/// A literal socket value, used for authored defaults and synthesized constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketValue {
    /// Float literal.
    Float(f32),
    /// Integer literal.
    Int(i32),
    /// Vector literal.
    Vector([f32; 3]),
    /// Color literal.
    Color([f32; 3]),
}

/// Bit-exact identity of a [`SocketValue`], usable as a hash key.
///
/// Two values share a key only if they have the same type and the same bit
/// pattern, so `0.0` and `-0.0` differ and every NaN payload is its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueKey {
    ty: SocketType,
    bits: [u32; 3],
}

/// `v` as a float, if the float converts back to exactly `v`.
fn int_to_float(v: i32) -> Option<f32> {
    let f = v as f32;
    (f as i64 == i64::from(v)).then_some(f)
}

/// `v` as an integer, if it is integral, in range and not negative zero.
fn float_to_int(v: f32) -> Option<i32> {
    let in_range = (-2_147_483_648.0..2_147_483_648.0).contains(&v);
    let negative_zero = v == 0.0 && v.is_sign_negative();
    (v.fract() == 0.0 && in_range && !negative_zero).then_some(v as i32)
}

impl SocketValue {
    /// The zero value of a socket type.
    pub fn zero(ty: SocketType) -> Self {
        match ty {
            SocketType::Float => SocketValue::Float(0.0),
            SocketType::Int => SocketValue::Int(0),
            SocketType::Vector => SocketValue::Vector([0.0; 3]),
            SocketType::Color => SocketValue::Color([0.0; 3]),
        }
    }

    /// The type of this value.
    pub fn value_type(&self) -> SocketType {
        match self {
            SocketValue::Float(_) => SocketType::Float,
            SocketValue::Int(_) => SocketType::Int,
            SocketValue::Vector(_) => SocketType::Vector,
            SocketValue::Color(_) => SocketType::Color,
        }
    }

    /// Converts this value to `ty` if no information is lost.
    ///
    /// Scalars broadcast to vectors and colors, vectors and colors convert
    /// into each other, integers widen to floats when exactly representable
    /// and integral floats in `i32` range narrow to integers. Anything else
    /// returns `None`.
    pub fn coerce(&self, ty: SocketType) -> Option<SocketValue> {
        if self.value_type() == ty {
            return Some(*self);
        }
        match (*self, ty) {
            (SocketValue::Float(v), SocketType::Int) => float_to_int(v).map(SocketValue::Int),
            (SocketValue::Float(v), SocketType::Vector) => Some(SocketValue::Vector([v; 3])),
            (SocketValue::Float(v), SocketType::Color) => Some(SocketValue::Color([v; 3])),
            (SocketValue::Int(v), SocketType::Float) => int_to_float(v).map(SocketValue::Float),
            (SocketValue::Int(v), SocketType::Vector) => {
                int_to_float(v).map(|f| SocketValue::Vector([f; 3]))
            }
            (SocketValue::Int(v), SocketType::Color) => {
                int_to_float(v).map(|f| SocketValue::Color([f; 3]))
            }
            (SocketValue::Vector(v), SocketType::Color) => Some(SocketValue::Color(v)),
            (SocketValue::Color(v), SocketType::Vector) => Some(SocketValue::Vector(v)),
            _ => None,
        }
    }

    /// Bit-exact grouping key.
    pub fn key(&self) -> ValueKey {
        let bits = match *self {
            SocketValue::Float(v) => [v.to_bits(), 0, 0],
            SocketValue::Int(v) => [v as u32, 0, 0],
            SocketValue::Vector(v) | SocketValue::Color(v) => {
                [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()]
            }
        };
        ValueKey {
            ty: self.value_type(),
            bits,
        }
    }
}
