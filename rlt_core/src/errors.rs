//! # Error Types
//!
//! Structured error types for rlt_core. Every error carries enough context
//! (field path, node id, cycle members) to locate the offending input without
//! re-reading the whole document.
//!
//! Two classes exist:
//!
//! - **Fatal** errors abort the operation that raised them: [`RltError::ParseError`]
//!   stops loading a document, [`RltError::CyclicGraph`] stops aggregation.
//! - **Edge-local** errors ([`RltError::SingularRotation`],
//!   [`RltError::MissingFrameData`]) only invalidate the edge being computed.
//!   The aggregator records them on that edge and keeps going.
//!
//! ## Example
//!
//! ```rust
//! use rlt_core::errors::{RltError, RltResult};
//!
//! fn require_mass(mass: f64) -> RltResult<f64> {
//!     if mass < 0.0 {
//!         return Err(RltError::parse("nodes[0].mass", "Mass must be non-negative"));
//!     }
//!     Ok(mass)
//! }
//!
//! assert!(require_mass(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for rlt_core operations
pub type RltResult<T> = Result<T, RltError>;

/// Structured error type for load transfer operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum RltError {
    /// Malformed configuration document
    #[error("Parse error at '{path}': {reason}")]
    ParseError { path: String, reason: String },

    /// Rotation order is not one of the six axis permutations
    #[error("Invalid rotation order '{value}': expected one of xyz, xzy, yxz, yzx, zxy, zyx")]
    InvalidRotationOrder { value: String },

    /// A rotation matrix is not orthonormal within tolerance
    #[error("Singular rotation for '{frame}': matrix is not orthonormal (det = {determinant})")]
    SingularRotation { frame: String, determinant: f64 },

    /// A node or interface lacks the orientation/position needed to build its frame
    #[error("Missing frame data on '{owner}': {field}")]
    MissingFrameData { owner: String, field: String },

    /// The load path graph contains a cycle
    #[error("Cyclic graph: {}", .cycle.join(" -> "))]
    CyclicGraph { cycle: Vec<String> },

    /// An edge references a node id that is not in the graph
    #[error("Edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: String, node: String },

    /// Two nodes or two edges share an id
    #[error("Duplicate {kind} id: '{id}'")]
    DuplicateId { kind: String, id: String },

    /// Lookup by id failed
    #[error("{kind} not found: '{id}'")]
    NotFound { kind: String, id: String },

    /// JSON serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl RltError {
    /// Create a ParseError
    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RltError::ParseError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingFrameData error
    pub fn missing_frame_data(owner: impl Into<String>, field: impl Into<String>) -> Self {
        RltError::MissingFrameData {
            owner: owner.into(),
            field: field.into(),
        }
    }

    /// Create a SingularRotation error
    pub fn singular_rotation(frame: impl Into<String>, determinant: f64) -> Self {
        RltError::SingularRotation {
            frame: frame.into(),
            determinant,
        }
    }

    /// Create an UnknownNode error
    pub fn unknown_node(edge: impl Into<String>, node: impl Into<String>) -> Self {
        RltError::UnknownNode {
            edge: edge.into(),
            node: node.into(),
        }
    }

    /// Create a DuplicateId error
    pub fn duplicate_id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        RltError::DuplicateId {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        RltError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Whether this error only invalidates a single edge.
    ///
    /// The aggregator turns these into `is_valid = false` on the edge being
    /// computed instead of aborting the run.
    pub fn is_edge_local(&self) -> bool {
        matches!(
            self,
            RltError::SingularRotation { .. } | RltError::MissingFrameData { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RltError::ParseError { .. } => "PARSE_ERROR",
            RltError::InvalidRotationOrder { .. } => "INVALID_ROTATION_ORDER",
            RltError::SingularRotation { .. } => "SINGULAR_ROTATION",
            RltError::MissingFrameData { .. } => "MISSING_FRAME_DATA",
            RltError::CyclicGraph { .. } => "CYCLIC_GRAPH",
            RltError::UnknownNode { .. } => "UNKNOWN_NODE",
            RltError::DuplicateId { .. } => "DUPLICATE_ID",
            RltError::NotFound { .. } => "NOT_FOUND",
            RltError::SerializationError { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for RltError {
    fn from(e: serde_json::Error) -> Self {
        RltError::SerializationError {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = RltError::parse("nodes[2].cog", "expected 3 components, found 2");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"ParseError\""));
        let roundtrip: RltError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RltError::missing_frame_data("n1", "translation").error_code(), "MISSING_FRAME_DATA");
        assert_eq!(
            RltError::CyclicGraph { cycle: vec!["A".into(), "B".into(), "A".into()] }.error_code(),
            "CYCLIC_GRAPH"
        );
    }

    #[test]
    fn test_cycle_message_names_members() {
        let error = RltError::CyclicGraph {
            cycle: vec!["A".into(), "B".into(), "C".into(), "A".into()],
        };
        assert_eq!(error.to_string(), "Cyclic graph: A -> B -> C -> A");
    }

    #[test]
    fn test_edge_local_classification() {
        assert!(RltError::singular_rotation("e0", 0.5).is_edge_local());
        assert!(RltError::missing_frame_data("n0", "euler_angles").is_edge_local());
        assert!(!RltError::parse("$", "bad").is_edge_local());
        assert!(!RltError::CyclicGraph { cycle: vec![] }.is_edge_local());
    }
}
