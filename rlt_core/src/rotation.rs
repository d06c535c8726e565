//! # Rotation Matrices from Euler Angles
//!
//! Builds the 3×3 rotation matrix of a coordinate frame from three Euler
//! angles (degrees) and an axis order.
//!
//! ## Convention
//!
//! Used identically for every node, interface and target frame:
//!
//! - Angles are positional in the order, in degrees: for `abc` the vector is
//!   `[about a, about b, about c]`, so `zyx` with `[90, 0, 0]` turns about z.
//! - Elemental rotations are right-handed (positive angle turns
//!   counter-clockwise when looking down the positive axis toward the origin).
//! - For an order `abc` the rotations are applied to vectors first about `a`,
//!   then `b`, then `c` (fixed axes): `R = R_c · R_b · R_a`.
//! - The result maps local components to global components:
//!   `v_global = R · v_local`, and `R.transpose()` maps back.
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector3;
//! use rlt_core::rotation::{rotation_matrix, RotationOrder};
//!
//! let r = rotation_matrix(&Vector3::new(0.0, 0.0, 90.0), RotationOrder::Xyz);
//! let x_local = Vector3::new(1.0, 0.0, 0.0);
//! let x_global = r * x_local;
//! assert!((x_global - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
//! ```

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::RltError;

/// Order in which the three elemental rotations are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

/// Coordinate axis of an elemental rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl RotationOrder {
    /// All six orders
    pub const ALL: [RotationOrder; 6] = [
        RotationOrder::Xyz,
        RotationOrder::Xzy,
        RotationOrder::Yxz,
        RotationOrder::Yzx,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
    ];

    /// Axes in application order (first applied first)
    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;
        match self {
            RotationOrder::Xyz => [X, Y, Z],
            RotationOrder::Xzy => [X, Z, Y],
            RotationOrder::Yxz => [Y, X, Z],
            RotationOrder::Yzx => [Y, Z, X],
            RotationOrder::Zxy => [Z, X, Y],
            RotationOrder::Zyx => [Z, Y, X],
        }
    }

    /// Lowercase string form ("xyz", "zyx", ...)
    pub fn as_str(self) -> &'static str {
        match self {
            RotationOrder::Xyz => "xyz",
            RotationOrder::Xzy => "xzy",
            RotationOrder::Yxz => "yxz",
            RotationOrder::Yzx => "yzx",
            RotationOrder::Zxy => "zxy",
            RotationOrder::Zyx => "zyx",
        }
    }
}

impl FromStr for RotationOrder {
    type Err = RltError;

    /// Case-insensitive parse; anything but the six permutations is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        RotationOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == lowered)
            .ok_or_else(|| RltError::InvalidRotationOrder {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-handed elemental rotation about one axis (angle in radians)
pub fn axis_rotation(axis: Axis, angle_rad: f64) -> Matrix3<f64> {
    let (s, c) = angle_rad.sin_cos();
    match axis {
        Axis::X => Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, c, -s,
            0.0, s, c,
        ),
        Axis::Y => Matrix3::new(
            c, 0.0, s,
            0.0, 1.0, 0.0,
            -s, 0.0, c,
        ),
        Axis::Z => Matrix3::new(
            c, -s, 0.0,
            s, c, 0.0,
            0.0, 0.0, 1.0,
        ),
    }
}

/// Build the local-to-global rotation matrix for a frame.
///
/// `euler_angles_deg[i]` is the angle (degrees) about the i-th axis of
/// `order`. See the module docs for the convention.
pub fn rotation_matrix(euler_angles_deg: &Vector3<f64>, order: RotationOrder) -> Matrix3<f64> {
    order
        .axes()
        .iter()
        .zip(euler_angles_deg.iter())
        .fold(Matrix3::identity(), |acc, (&axis, angle)| axis_rotation(axis, angle.to_radians()) * acc)
}
