//! # Load Path Aggregation
//!
//! Walks the graph from leaves to sinks. Each node accumulates its own load
//! (applied plus weight) and the transferred loads of all incoming edges,
//! then pushes the accumulated load across every outgoing edge into the
//! edge target's frame.
//!
//! ```text
//! rotor ──e1──▶ nacelle ──e2──▶ tower ──e3──▶ foundation
//!   own            own + e1        own + e2       own + e3
//! ```
//!
//! ## Rules
//!
//! - Nodes are processed in topological order; ties are broken by node
//!   insertion order so the traversal is reproducible.
//! - Incoming edge results are summed in edge insertion order.
//! - Fan-out transfers the full accumulated load along every outgoing edge.
//! - Edge-local failures (missing frame data, singular rotation, non-finite
//!   output) mark the edge invalid and the run continues. Anything downstream
//!   of an invalid edge is marked invalid as well.
//! - A cycle aborts the run with [`RltError::CyclicGraph`].
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector3;
//! use rlt_core::aggregate::aggregate;
//! use rlt_core::graph::{Edge, Graph, Node};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node::new("support")).unwrap();
//! graph
//!     .add_node(
//!         Node::new("load")
//!             .at(Vector3::new(10.0, 0.0, 0.0))
//!             .with_load(Vector3::new(0.0, 0.0, -100.0), Vector3::zeros()),
//!     )
//!     .unwrap();
//! graph.add_edge(Edge::new("e0", "load", "support")).unwrap();
//!
//! let report = aggregate(&graph).unwrap();
//! let e0 = report.result("e0").unwrap();
//! assert!(e0.is_valid);
//! assert!((e0.moment - Vector3::new(0.0, 1000.0, 0.0)).norm() < 1e-9);
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::errors::{RltError, RltResult};
use crate::graph::{EdgeIndex, EdgeResult, Graph, NodeIndex};
use crate::report::{AggregationReport, EdgeReport, NodeReport};
use crate::transfer::{transfer, transfer_via, Frame, Load};

/// Node handles in processing order.
///
/// Kahn's algorithm with a min-heap on insertion index. Fails with
/// [`RltError::CyclicGraph`] naming one cycle, first node repeated at the end.
pub fn topological_order(graph: &Graph) -> RltResult<Vec<NodeIndex>> {
    let mut indegree = vec![0usize; graph.node_count()];
    for e in graph.edge_indices() {
        let (_, target) = graph.endpoints(e);
        indegree[target.0] += 1;
    }

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|n| indegree[n.0] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &e in graph.outgoing(node) {
            let (_, target) = graph.endpoints(e);
            indegree[target.0] -= 1;
            if indegree[target.0] == 0 {
                ready.push(Reverse(target));
            }
        }
    }

    if order.len() < graph.node_count() {
        let cycle = find_cycle(graph, &indegree);
        return Err(RltError::CyclicGraph {
            cycle: cycle.into_iter().map(|n| graph.node(n).id.clone()).collect(),
        });
    }
    Ok(order)
}

/// Recover one cycle among the nodes Kahn's algorithm could not process.
///
/// Every such node still has an incoming edge from another unprocessed node,
/// so walking predecessors must revisit a node.
fn find_cycle(graph: &Graph, indegree: &[usize]) -> Vec<NodeIndex> {
    let blocked = |n: NodeIndex| indegree[n.0] > 0;
    let Some(start) = graph.node_indices().find(|&n| blocked(n)) else {
        return Vec::new();
    };

    let mut walk = vec![start];
    let mut current = start;
    loop {
        let predecessor = graph
            .incoming(current)
            .iter()
            .map(|&e| graph.endpoints(e).0)
            .find(|&s| blocked(s));
        let Some(prev) = predecessor else {
            return Vec::new();
        };
        if let Some(pos) = walk.iter().position(|&n| n == prev) {
            // walk[pos..] follows edges backwards; flip to edge direction
            let mut cycle: Vec<NodeIndex> = walk[pos..].iter().rev().copied().collect();
            if let Some(min_pos) = cycle.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i) {
                cycle.rotate_left(min_pos);
            }
            cycle.push(cycle[0]);
            return cycle;
        }
        walk.push(prev);
        current = prev;
    }
}

/// Aggregate every edge of the graph, timestamping results with the current time.
pub fn aggregate(graph: &Graph) -> RltResult<AggregationReport> {
    aggregate_at(graph, Utc::now())
}

/// Aggregate with an explicit timestamp.
///
/// Two runs over the same graph with the same timestamp return identical
/// reports.
pub fn aggregate_at(graph: &Graph, timestamp: DateTime<Utc>) -> RltResult<AggregationReport> {
    let order = topological_order(graph)?;
    debug!(
        "Aggregation order: {}",
        order.iter().map(|&n| graph.node(n).id.as_str()).collect::<Vec<_>>().join(", ")
    );

    let gravity = graph.gravity();
    let mut results: Vec<Option<EdgeResult>> = vec![None; graph.edge_count()];
    let mut nodes = Vec::with_capacity(order.len());

    for &index in &order {
        let node = graph.node(index);
        let incoming = graph.incoming(index);
        let mut reason: Option<String> = None;

        let own_load = match node.own_load(gravity) {
            Ok(load) => Some(load),
            Err(err) if err.is_edge_local() => {
                reason = Some(err.to_string());
                None
            }
            Err(err) => return Err(err),
        };

        // Topological order guarantees every incoming result exists
        let mut transferred = Load::zero();
        for &e in incoming {
            if let Some(result) = &results[e.0] {
                transferred += result.load();
                if !result.is_valid && reason.is_none() {
                    reason = Some(format!("upstream edge '{}' is invalid", graph.edge(e).id));
                }
            }
        }
        let accumulated = own_load.map(|own| own + transferred);

        let outgoing = graph.outgoing(index);
        if reason.is_none() && !outgoing.is_empty() {
            if let Err(err) = node_frame(graph, index) {
                if !err.is_edge_local() {
                    return Err(err);
                }
                reason = Some(err.to_string());
            }
        }

        for &e in outgoing {
            let result = match (&reason, accumulated) {
                (None, Some(load)) => transfer_edge(graph, e, &load, timestamp)?,
                (Some(why), _) => EdgeResult::invalid(None, why.clone(), timestamp),
                (None, None) => EdgeResult::invalid(None, "load could not be computed", timestamp),
            };
            if let Some(why) = result.reason.as_deref() {
                warn!("Edge '{}' invalid: {}", graph.edge(e).id, why);
            }
            results[e.0] = Some(result);
        }

        nodes.push(NodeReport {
            node_id: node.id.clone(),
            own_load,
            accumulated,
            is_valid: reason.is_none() && accumulated.is_some_and(|l| l.is_finite()),
            reason,
        });
    }

    let edges: Vec<EdgeReport> = graph
        .edge_indices()
        .zip(results)
        .map(|(e, result)| {
            let edge = graph.edge(e);
            EdgeReport {
                edge_id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                result: result.unwrap_or_else(|| EdgeResult::invalid(None, "edge was not reached", timestamp)),
            }
        })
        .collect();

    let invalid = edges.iter().filter(|e| !e.result.is_valid).count();
    info!(
        "Aggregated {} nodes, {} edges ({} invalid)",
        graph.node_count(),
        edges.len(),
        invalid
    );

    Ok(AggregationReport {
        computed_at: timestamp,
        order: order.iter().map(|&n| graph.node(n).id.clone()).collect(),
        edges,
        nodes,
    })
}

/// Validated frame of a node, labelled with its id
fn node_frame(graph: &Graph, index: NodeIndex) -> RltResult<Frame> {
    let node = graph.node(index);
    let frame = node.frame()?;
    frame.validate(&node.id)?;
    Ok(frame)
}

/// Transfer `load` across one edge.
///
/// Edge-local failures become an invalid result; only other errors propagate.
fn transfer_edge(graph: &Graph, index: EdgeIndex, load: &Load, timestamp: DateTime<Utc>) -> RltResult<EdgeResult> {
    match try_transfer_edge(graph, index, load) {
        Ok((at_target, _)) if !at_target.is_finite() => {
            Ok(EdgeResult::invalid(Some(at_target), "non-finite result", timestamp))
        }
        Ok((at_target, at_interface)) => Ok(EdgeResult::valid(at_target, at_interface, timestamp)),
        Err(err) if err.is_edge_local() => Ok(EdgeResult::invalid(None, err.to_string(), timestamp)),
        Err(err) => Err(err),
    }
}

fn try_transfer_edge(graph: &Graph, index: EdgeIndex, load: &Load) -> RltResult<(Load, Option<Load>)> {
    let edge = graph.edge(index);
    let (source, target) = graph.endpoints(index);
    let source_frame = node_frame(graph, source)?;
    let target_frame = node_frame(graph, target)?;

    match &edge.interface {
        Some(interface) => {
            let interface_frame = interface.frame(target_frame.origin);
            interface_frame.validate(&format!("{} interface", edge.id))?;
            let hop = transfer_via(load, &source_frame, &interface_frame, &target_frame)?;
            Ok((hop.at_target, Some(hop.at_interface)))
        }
        None => Ok((transfer(load, &source_frame, &target_frame)?, None)),
    }
}

/// Sum every node's own load, transferred directly into `frame`.
///
/// Independent of the edges. For a graph that converges on a single sink this
/// equals the sink's accumulated load, which makes it a global equilibrium
/// check. Fails on the first node whose load or frame cannot be computed.
pub fn combine_at(graph: &Graph, frame: &Frame) -> RltResult<Load> {
    frame.validate("combination frame")?;
    let gravity = graph.gravity();
    graph
        .nodes()
        .iter()
        .map(|node| {
            let own = node.own_load(gravity)?;
            let source = node.frame()?;
            source.validate(&node.id)?;
            transfer(&own, &source, frame)
        })
        .sum()
}
