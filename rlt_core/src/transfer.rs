//! # Rigid Load Transfer
//!
//! Re-expresses a force/moment pair acting at one frame's origin as the
//! statically equivalent pair at another frame's origin, in that frame's
//! components.
//!
//! ## Algorithm
//!
//! ```text
//! F_g  = R_s · F                 source local -> global
//! M_g  = R_s · M
//! r    = t_s - t_t               target origin -> source origin
//! M_g' = M_g + r × F_g           moment transfer, force is a free vector
//! F_out = R_tᵀ · F_g             global -> target local
//! M_out = R_tᵀ · M_g'
//! ```
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector3;
//! use rlt_core::transfer::{transfer, Frame, Load};
//!
//! // 100 N downward at x = 10 produces +1000 Nm about y at the origin
//! let load = Load::new(Vector3::new(0.0, 0.0, -100.0), Vector3::zeros());
//! let source = Frame::identity_at(Vector3::new(10.0, 0.0, 0.0));
//! let target = Frame::identity_at(Vector3::zeros());
//!
//! let out = transfer(&load, &source, &target).unwrap();
//! assert!((out.moment - Vector3::new(0.0, 1000.0, 0.0)).norm() < 1e-9);
//! ```

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{RltError, RltResult};
use crate::rotation::{rotation_matrix, RotationOrder};

/// Maximum deviation of `Rᵀ·R` from the identity accepted for a rotation
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// A force/moment pair expressed in some frame's components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Force vector (N)
    pub force: Vector3<f64>,
    /// Moment vector about the frame origin (Nm)
    pub moment: Vector3<f64>,
}

impl Load {
    pub fn new(force: Vector3<f64>, moment: Vector3<f64>) -> Self {
        Load { force, moment }
    }

    pub fn zero() -> Self {
        Load {
            force: Vector3::zeros(),
            moment: Vector3::zeros(),
        }
    }

    /// Whether every component is finite (no NaN or infinity)
    pub fn is_finite(&self) -> bool {
        self.force.iter().chain(self.moment.iter()).all(|v| v.is_finite())
    }

    /// Apply a rotation to both vectors
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Load {
        Load {
            force: rotation * self.force,
            moment: rotation * self.moment,
        }
    }
}

impl Default for Load {
    fn default() -> Self {
        Load::zero()
    }
}

impl Add for Load {
    type Output = Load;

    fn add(self, other: Load) -> Load {
        Load {
            force: self.force + other.force,
            moment: self.moment + other.moment,
        }
    }
}

impl AddAssign for Load {
    fn add_assign(&mut self, other: Load) {
        self.force += other.force;
        self.moment += other.moment;
    }
}

impl Sum for Load {
    fn sum<I: Iterator<Item = Load>>(iter: I) -> Load {
        iter.fold(Load::zero(), |acc, load| acc + load)
    }
}

/// A coordinate frame: local-to-global rotation plus origin in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Maps local components to global components
    pub rotation: Matrix3<f64>,
    /// Frame origin in the global frame
    pub origin: Vector3<f64>,
}

impl Frame {
    /// Frame from Euler angles (degrees) and an axis order
    pub fn from_euler(euler_angles_deg: &Vector3<f64>, order: RotationOrder, origin: Vector3<f64>) -> Self {
        Frame {
            rotation: rotation_matrix(euler_angles_deg, order),
            origin,
        }
    }

    /// Axis-aligned frame at `origin`
    pub fn identity_at(origin: Vector3<f64>) -> Self {
        Frame {
            rotation: Matrix3::identity(),
            origin,
        }
    }

    /// The global frame
    pub fn global() -> Self {
        Frame::identity_at(Vector3::zeros())
    }

    /// Check the rotation is orthonormal within [`ORTHONORMAL_TOLERANCE`].
    ///
    /// `label` names the frame in the error.
    pub fn validate(&self, label: &str) -> RltResult<()> {
        if !self.rotation.iter().all(|v| v.is_finite()) {
            return Err(RltError::singular_rotation(label, f64::NAN));
        }
        let deviation = (self.rotation.transpose() * self.rotation - Matrix3::identity()).amax();
        if deviation <= ORTHONORMAL_TOLERANCE {
            Ok(())
        } else {
            Err(RltError::singular_rotation(label, self.rotation.determinant()))
        }
    }
}

/// Transfer a load from the source frame into the target frame.
///
/// Fails with [`RltError::SingularRotation`] when either rotation is not
/// orthonormal. Non-finite input propagates into the output; callers check
/// [`Load::is_finite`].
pub fn transfer(load: &Load, source: &Frame, target: &Frame) -> RltResult<Load> {
    source.validate("source")?;
    target.validate("target")?;
    Ok(transfer_unchecked(load, source, target))
}

fn transfer_unchecked(load: &Load, source: &Frame, target: &Frame) -> Load {
    let global = load.rotated(&source.rotation);
    let lever_arm = source.origin - target.origin;
    let shifted = Load {
        force: global.force,
        moment: global.moment + lever_arm.cross(&global.force),
    };
    shifted.rotated(&target.rotation.transpose())
}

/// Result of a transfer routed through an explicit interface frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceTransfer {
    /// Load expressed at the interface frame
    pub at_interface: Load,
    /// Load expressed at the target frame
    pub at_target: Load,
}

/// Two-hop transfer: source → interface → target.
///
/// Equivalent to the direct transfer up to rounding, since moment transfer
/// composes: `(t_s − t_i) + (t_i − t_t) = t_s − t_t`.
pub fn transfer_via(load: &Load, source: &Frame, interface: &Frame, target: &Frame) -> RltResult<InterfaceTransfer> {
    source.validate("source")?;
    interface.validate("interface")?;
    target.validate("target")?;
    let at_interface = transfer_unchecked(load, source, interface);
    let at_target = transfer_unchecked(&at_interface, interface, target);
    Ok(InterfaceTransfer {
        at_interface,
        at_target,
    })
}
