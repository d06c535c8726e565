//! # rlt_core - Rigid Load Transfer Engine
//!
//! `rlt_core` computes how forces and moments applied at one rigid body's
//! frame are carried, through rigid interfaces, into the frames of the bodies
//! that support it, and aggregates them along a load path graph
//! (e.g. rotor → nacelle → tower → foundation). All inputs and outputs are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: aggregation reads a graph and returns results; it never
//!   mutates its input
//! - **Deterministic**: traversal and summation follow insertion order
//! - **Rich Errors**: structured error types with field paths and node ids
//! - **No I/O**: documents come in and go out as strings or JSON values
//!
//! ## Quick Start
//!
//! ```rust
//! use rlt_core::{aggregate_graph, load_graph};
//!
//! let graph = load_graph(r#"{
//!     "nodes": [
//!         {"id": "support", "translation": [0, 0, 0], "euler_angles": [0, 0, 0]},
//!         {"id": "arm", "translation": [10, 0, 0], "euler_angles": [0, 0, 0],
//!          "external_force": [0, 0, -100]}
//!     ],
//!     "edges": [{"id": "e0", "source": "arm", "target": "support"}]
//! }"#).unwrap();
//!
//! let solved = aggregate_graph(&graph).unwrap();
//! let result = solved.edge_by_id("e0").unwrap().rlt_result.as_ref().unwrap();
//! assert!(result.is_valid);
//! assert!((result.moment[1] - 1000.0).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`rotation`] - Euler angle rotation matrices
//! - [`transfer`] - Rigid load transfer between frames
//! - [`gravity`] - Weight contribution of node masses
//! - [`graph`] - Nodes, edges and the load path graph
//! - [`aggregate`] - Topological load accumulation
//! - [`report`] - Aggregation output and CSV rendering
//! - [`document`] - JSON document codec
//! - [`errors`] - Structured error types

pub mod aggregate;
pub mod document;
pub mod errors;
pub mod graph;
pub mod gravity;
pub mod report;
pub mod rotation;
pub mod transfer;

// Re-export commonly used types at crate root for convenience
pub use aggregate::{aggregate, aggregate_at, combine_at, topological_order};
pub use document::{load_graph, to_document, to_document_string};
pub use errors::{RltError, RltResult};
pub use graph::{Edge, EdgeResult, Graph, InterfaceFrame, Node};
pub use gravity::Gravity;
pub use report::AggregationReport;
pub use rotation::RotationOrder;
pub use transfer::{transfer, Frame, Load};

/// Aggregate and return a copy of the graph with every edge result filled in.
pub fn aggregate_graph(graph: &Graph) -> RltResult<Graph> {
    Ok(aggregate(graph)?.apply_to(graph))
}
