//! 4×4 placement transforms.

use serde::{Deserialize, Serialize};

/// Row-major 4×4 affine transform placing an instance in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform(pub [f64; 16]);

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// A pure translation.
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY.0;
        m[3] = x;
        m[7] = y;
        m[11] = z;
        Self(m)
    }

    /// Build from a slice of exactly 16 values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let m: [f64; 16] = values.try_into().ok()?;
        Some(Self(m))
    }

    /// Whether this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
