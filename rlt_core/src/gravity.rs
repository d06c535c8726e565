//! # Gravity Contribution
//!
//! Weight of each node's mass acting at its center of gravity, added to the
//! node's own applied load before aggregation.
//!
//! ```text
//! W_global = g · d̂ · m            d̂ = normalised gravity direction
//! F_local  = Rᵀ · W_global
//! M_local  = cog × F_local        cog given in the node's local frame
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::transfer::{Frame, Load};

/// Standard gravitational acceleration (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Gravity settings: magnitude and global direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gravity {
    /// Acceleration magnitude (m/s²). Zero disables gravity.
    pub value: f64,
    /// Direction in the global frame. Normalised on use.
    pub direction: Vector3<f64>,
}

impl Default for Gravity {
    fn default() -> Self {
        Gravity {
            value: STANDARD_GRAVITY,
            direction: Self::default_direction(),
        }
    }
}

impl Gravity {
    pub fn new(value: f64, direction: Vector3<f64>) -> Self {
        Gravity { value, direction }
    }

    /// Global -Z
    pub fn default_direction() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -1.0)
    }

    /// Whether gravity contributes anything
    pub fn is_enabled(&self) -> bool {
        self.value != 0.0
    }

    /// Unit direction; a zero-length direction falls back to global -Z.
    pub fn unit_direction(&self) -> Vector3<f64> {
        let norm = self.direction.norm();
        if norm > 0.0 {
            self.direction / norm
        } else {
            Self::default_direction()
        }
    }

    /// Gravitational acceleration vector in the global frame
    pub fn acceleration(&self) -> Vector3<f64> {
        self.unit_direction() * self.value
    }
}

/// Weight load of a body, in its own local frame, about its local origin.
///
/// Returns zero when gravity is disabled or the mass is not positive.
pub fn gravity_load(mass: f64, cog: &Vector3<f64>, frame: &Frame, gravity: &Gravity) -> Load {
    if !gravity.is_enabled() || mass <= 0.0 {
        return Load::zero();
    }
    let weight_global = gravity.acceleration() * mass;
    let force = frame.rotation.transpose() * weight_global;
    Load {
        force,
        moment: cog.cross(&force),
    }
}
