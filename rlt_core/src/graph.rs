//! # Load Path Graph
//!
//! Nodes are rigid bodies with their own coordinate frame and applied load;
//! edges are rigid, loadless interfaces that carry load from `source` to
//! `target`.
//!
//! ## Structure
//!
//! ```text
//! Graph
//! ├── nodes: Vec<Node>                  arena, addressed by NodeIndex
//! ├── edges: Vec<Edge>                  arena, addressed by EdgeIndex
//! ├── node_lookup / edge_lookup         string id -> handle
//! ├── incoming / outgoing               per-node edge lists, insertion order
//! └── gravity: Option<Gravity>          None disables the weight stage
//! ```
//!
//! String ids are only used at the boundary. Internally everything is
//! addressed by index, and insertion order is preserved so traversal and
//! summation are reproducible.
//!
//! ## Cached results
//!
//! Each edge may carry the result of the last aggregation. Every edit made
//! through the graph clears the cached result on the edited edge(s) and on
//! every edge downstream of them, so a result flagged valid never describes
//! stale inputs.
//!
//! ## Example
//!
//! ```rust
//! use nalgebra::Vector3;
//! use rlt_core::graph::{Edge, Graph, Node};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node::new("rotor").at(Vector3::new(5.0, 0.0, 80.0))).unwrap();
//! graph.add_node(Node::new("nacelle").at(Vector3::new(0.0, 0.0, 80.0))).unwrap();
//! graph.add_edge(Edge::new("e1", "rotor", "nacelle")).unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.outgoing(graph.node_index("rotor").unwrap()).len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::errors::{RltError, RltResult};
use crate::gravity::{gravity_load, Gravity};
use crate::rotation::RotationOrder;
use crate::transfer::{Frame, Load};

/// Stable handle to a node in a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

/// Stable handle to an edge in a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIndex(pub usize);

/// A rigid body with its own coordinate frame.
///
/// Frame data (`translation`, `euler_angles`) is optional so that incomplete
/// documents can still be loaded; a node without it cannot act as a source
/// or target of a transfer and its edges are reported invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id, used as the lookup key
    pub id: String,

    /// Display name (defaults to the id)
    pub name: String,

    /// Mass in kg (non-negative)
    pub mass: f64,

    /// Center of gravity offset from the local origin, local frame
    pub cog: Vector3<f64>,

    /// Externally applied force, local frame (N)
    pub applied_force: Vector3<f64>,

    /// Externally applied moment about the local origin, local frame (Nm)
    pub applied_moment: Vector3<f64>,

    /// Orientation relative to the global frame: angles about the axes of
    /// `rotation_order`, in that order (degrees)
    pub euler_angles: Option<Vector3<f64>>,

    /// Composition order of the Euler rotations
    pub rotation_order: RotationOrder,

    /// Position of the local origin in the global frame
    pub translation: Option<Vector3<f64>>,
}

impl Node {
    /// New unloaded, massless node at the global origin with no rotation.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Node {
            name: id.clone(),
            id,
            mass: 0.0,
            cog: Vector3::zeros(),
            applied_force: Vector3::zeros(),
            applied_moment: Vector3::zeros(),
            euler_angles: Some(Vector3::zeros()),
            rotation_order: RotationOrder::Xyz,
            translation: Some(Vector3::zeros()),
        }
    }

    /// Set the display name (builder pattern)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the global position of the local origin (builder pattern)
    pub fn at(mut self, translation: Vector3<f64>) -> Self {
        self.translation = Some(translation);
        self
    }

    /// Set the orientation (builder pattern)
    pub fn oriented(mut self, euler_angles_deg: Vector3<f64>, order: RotationOrder) -> Self {
        self.euler_angles = Some(euler_angles_deg);
        self.rotation_order = order;
        self
    }

    /// Set the applied force and moment, local frame (builder pattern)
    pub fn with_load(mut self, force: Vector3<f64>, moment: Vector3<f64>) -> Self {
        self.applied_force = force;
        self.applied_moment = moment;
        self
    }

    /// Set mass and center of gravity (builder pattern)
    pub fn with_mass(mut self, mass: f64, cog: Vector3<f64>) -> Self {
        self.mass = mass;
        self.cog = cog;
        self
    }

    /// The node's coordinate frame.
    ///
    /// Fails with [`RltError::MissingFrameData`] when position or
    /// orientation is absent.
    pub fn frame(&self) -> RltResult<Frame> {
        let translation = self
            .translation
            .ok_or_else(|| RltError::missing_frame_data(&self.id, "translation"))?;
        let euler_angles = self
            .euler_angles
            .ok_or_else(|| RltError::missing_frame_data(&self.id, "euler_angles"))?;
        Ok(Frame::from_euler(&euler_angles, self.rotation_order, translation))
    }

    /// Externally applied load in the local frame
    pub fn applied_load(&self) -> Load {
        Load::new(self.applied_force, self.applied_moment)
    }

    /// Applied load plus weight (if gravity is given), local frame.
    ///
    /// The weight needs the node's frame, so a massive node without frame
    /// data fails here even though its applied load alone is known.
    pub fn own_load(&self, gravity: Option<&Gravity>) -> RltResult<Load> {
        let applied = self.applied_load();
        match gravity {
            Some(g) if g.is_enabled() && self.mass > 0.0 => {
                let frame = self.frame()?;
                Ok(applied + gravity_load(self.mass, &self.cog, &frame, g))
            }
            _ => Ok(applied),
        }
    }
}

/// Explicit frame of the mechanical interface between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFrame {
    /// Orientation: angles about the axes of `rotation_order` (degrees)
    pub euler_angles: Vector3<f64>,

    /// Composition order of the Euler rotations
    pub rotation_order: RotationOrder,

    /// Interface origin in the global frame. `None` places it at the
    /// target node's origin.
    pub translation: Option<Vector3<f64>>,
}

impl InterfaceFrame {
    pub fn new(euler_angles: Vector3<f64>, rotation_order: RotationOrder, translation: Option<Vector3<f64>>) -> Self {
        InterfaceFrame {
            euler_angles,
            rotation_order,
            translation,
        }
    }

    /// Resolve the frame, falling back to `default_origin` for the position
    pub fn frame(&self, default_origin: Vector3<f64>) -> Frame {
        Frame::from_euler(
            &self.euler_angles,
            self.rotation_order,
            self.translation.unwrap_or(default_origin),
        )
    }
}

/// Outcome of transferring load across one edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeResult {
    /// Transferred force, target node frame (N)
    pub force: Vector3<f64>,

    /// Transferred moment about the target origin, target node frame (Nm)
    pub moment: Vector3<f64>,

    /// Same load expressed at the interface frame, when the edge has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_load: Option<Load>,

    /// False when the result could not be computed or is not finite
    pub is_valid: bool,

    /// Why the result is invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// When the result was computed
    pub timestamp: Option<DateTime<Utc>>,
}

impl EdgeResult {
    /// A valid result
    pub fn valid(load: Load, interface_load: Option<Load>, timestamp: DateTime<Utc>) -> Self {
        EdgeResult {
            force: load.force,
            moment: load.moment,
            interface_load,
            is_valid: true,
            reason: None,
            timestamp: Some(timestamp),
        }
    }

    /// An invalid result carrying whatever load was computed (zeros if none)
    pub fn invalid(load: Option<Load>, reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let load = load.unwrap_or_default();
        EdgeResult {
            force: load.force,
            moment: load.moment,
            interface_load: None,
            is_valid: false,
            reason: Some(reason.into()),
            timestamp: Some(timestamp),
        }
    }

    /// Transferred load in the target frame
    pub fn load(&self) -> Load {
        Load::new(self.force, self.moment)
    }
}

/// A rigid interface between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique id
    pub id: String,

    /// Id of the node whose load is transferred
    pub source: String,

    /// Id of the node receiving the load
    pub target: String,

    /// Explicit interface frame; `None` transfers directly between node frames
    pub interface: Option<InterfaceFrame>,

    /// Cached result of the last aggregation
    pub rlt_result: Option<EdgeResult>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Edge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            interface: None,
            rlt_result: None,
        }
    }

    /// Route the transfer through an explicit interface frame (builder pattern)
    pub fn through(mut self, interface: InterfaceFrame) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Whether the cached result is present and valid
    pub fn has_valid_result(&self) -> bool {
        self.rlt_result.as_ref().is_some_and(|r| r.is_valid)
    }
}

/// Directed graph of nodes and edges, stored as index-addressed arenas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_lookup: HashMap<String, NodeIndex>,
    edge_lookup: HashMap<String, EdgeIndex>,
    /// Endpoints of each edge, parallel to `edges`
    endpoints: Vec<(NodeIndex, NodeIndex)>,
    /// Edges entering each node, parallel to `nodes`
    incoming: Vec<Vec<EdgeIndex>>,
    /// Edges leaving each node, parallel to `nodes`
    outgoing: Vec<Vec<EdgeIndex>>,
    /// Gravity applied to every node; `None` disables it
    gravity: Option<Gravity>,
}

impl Graph {
    /// Empty graph with gravity disabled
    pub fn new() -> Self {
        Graph::default()
    }

    /// Set gravity (builder pattern)
    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = Some(gravity);
        self
    }

    /// Gravity applied to every node, if enabled
    pub fn gravity(&self) -> Option<&Gravity> {
        self.gravity.as_ref()
    }

    /// Change gravity. Every cached result depends on it, so all are cleared.
    pub fn set_gravity(&mut self, gravity: Option<Gravity>) {
        self.gravity = gravity;
        for edge in &mut self.edges {
            edge.rlt_result = None;
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_lookup.get(id).copied()
    }

    pub fn edge_index(&self, id: &str) -> Option<EdgeIndex> {
        self.edge_lookup.get(id).copied()
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.0]
    }

    /// Look up a node by id
    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|i| self.node(i))
    }

    /// Look up an edge by id
    pub fn edge_by_id(&self, id: &str) -> Option<&Edge> {
        self.edge_index(id).map(|i| self.edge(i))
    }

    /// Source and target handles of an edge
    pub fn endpoints(&self, index: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.endpoints[index.0]
    }

    /// Edges whose target is `node`, in insertion order
    pub fn incoming(&self, node: NodeIndex) -> &[EdgeIndex] {
        &self.incoming[node.0]
    }

    /// Edges whose source is `node`, in insertion order
    pub fn outgoing(&self, node: NodeIndex) -> &[EdgeIndex] {
        &self.outgoing[node.0]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    /// Add a node. Fails if the id is already taken.
    pub fn add_node(&mut self, node: Node) -> RltResult<NodeIndex> {
        if self.node_lookup.contains_key(&node.id) {
            return Err(RltError::duplicate_id("node", &node.id));
        }
        let index = NodeIndex(self.nodes.len());
        self.node_lookup.insert(node.id.clone(), index);
        self.nodes.push(node);
        self.incoming.push(Vec::new());
        self.outgoing.push(Vec::new());
        Ok(index)
    }

    /// Add an edge between two existing nodes.
    ///
    /// Cycles are not rejected here; aggregation reports them.
    pub fn add_edge(&mut self, mut edge: Edge) -> RltResult<EdgeIndex> {
        edge.rlt_result = None;
        let index = self.insert_edge(edge)?;
        // New load enters the target, so everything from there on is stale
        let (_, target) = self.endpoints[index.0];
        self.invalidate_from(&[target]);
        Ok(index)
    }

    /// Insert an edge keeping whatever cached result it carries.
    ///
    /// Used when loading a persisted document, where edges may be listed in
    /// any order and no invalidation applies.
    pub(crate) fn restore_edge(&mut self, edge: Edge) -> RltResult<EdgeIndex> {
        self.insert_edge(edge)
    }

    fn insert_edge(&mut self, edge: Edge) -> RltResult<EdgeIndex> {
        if self.edge_lookup.contains_key(&edge.id) {
            return Err(RltError::duplicate_id("edge", &edge.id));
        }
        let source = self
            .node_index(&edge.source)
            .ok_or_else(|| RltError::unknown_node(&edge.id, &edge.source))?;
        let target = self
            .node_index(&edge.target)
            .ok_or_else(|| RltError::unknown_node(&edge.id, &edge.target))?;

        let index = EdgeIndex(self.edges.len());
        self.edge_lookup.insert(edge.id.clone(), index);
        self.edges.push(edge);
        self.endpoints.push((source, target));
        self.outgoing[source.0].push(index);
        self.incoming[target.0].push(index);
        Ok(index)
    }

    /// Edit a node in place. Results of its outgoing edges and everything
    /// downstream are cleared.
    pub fn update_node<F>(&mut self, id: &str, edit: F) -> RltResult<()>
    where
        F: FnOnce(&mut Node),
    {
        let index = self
            .node_index(id)
            .ok_or_else(|| RltError::not_found("node", id))?;
        let node = &mut self.nodes[index.0];
        edit(node);
        // The id is the lookup key and cannot change through an edit
        node.id = id.to_string();
        self.invalidate_from(&[index]);
        Ok(())
    }

    /// Edit an edge's interface frame. Its result and everything downstream
    /// are cleared. Endpoints cannot change; remove and re-add instead.
    pub fn update_edge<F>(&mut self, id: &str, edit: F) -> RltResult<()>
    where
        F: FnOnce(&mut Option<InterfaceFrame>),
    {
        let index = self
            .edge_index(id)
            .ok_or_else(|| RltError::not_found("edge", id))?;
        edit(&mut self.edges[index.0].interface);
        self.edges[index.0].rlt_result = None;
        let (_, target) = self.endpoints[index.0];
        self.invalidate_from(&[target]);
        Ok(())
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> RltResult<Node> {
        let index = self
            .node_index(id)
            .ok_or_else(|| RltError::not_found("node", id))?;

        // Former targets lose an incoming load
        let downstream: Vec<NodeIndex> = self
            .outgoing(index)
            .iter()
            .map(|e| self.endpoints[e.0].1)
            .filter(|&n| n != index)
            .collect();
        self.invalidate_from(&downstream);

        let mut keep = Vec::with_capacity(self.edges.len());
        for (edge, &(s, t)) in self.edges.drain(..).zip(self.endpoints.iter()) {
            if s != index && t != index {
                keep.push(edge);
            }
        }
        let removed = self.nodes.remove(index.0);
        self.edges = keep;
        self.reindex();
        Ok(removed)
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: &str) -> RltResult<Edge> {
        let index = self
            .edge_index(id)
            .ok_or_else(|| RltError::not_found("edge", id))?;
        let (_, target) = self.endpoints[index.0];
        self.invalidate_from(&[target]);
        let removed = self.edges.remove(index.0);
        self.reindex();
        Ok(removed)
    }

    /// Copy of this graph with `results` written onto the matching edges.
    pub fn with_results<'a, I>(&self, results: I) -> Graph
    where
        I: IntoIterator<Item = (&'a str, &'a EdgeResult)>,
    {
        let mut graph = self.clone();
        for (id, result) in results {
            if let Some(index) = graph.edge_index(id) {
                graph.edges[index.0].rlt_result = Some(result.clone());
            }
        }
        graph
    }

    /// Clear cached results on every edge leaving `starts` or any node
    /// reachable from them.
    fn invalidate_from(&mut self, starts: &[NodeIndex]) {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<NodeIndex> = starts.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if std::mem::replace(&mut seen[node.0], true) {
                continue;
            }
            for &e in &self.outgoing[node.0] {
                self.edges[e.0].rlt_result = None;
                queue.push_back(self.endpoints[e.0].1);
            }
        }
    }

    /// Rebuild lookups, endpoints and adjacency after a removal shifted indices
    fn reindex(&mut self) {
        self.node_lookup = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), NodeIndex(i)))
            .collect();
        self.edge_lookup = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), EdgeIndex(i)))
            .collect();
        self.endpoints = self
            .edges
            .iter()
            .map(|e| (self.node_lookup[&e.source], self.node_lookup[&e.target]))
            .collect();

        self.incoming = vec![Vec::new(); self.nodes.len()];
        self.outgoing = vec![Vec::new(); self.nodes.len()];
        for (i, &(source, target)) in self.endpoints.iter().enumerate() {
            self.outgoing[source.0].push(EdgeIndex(i));
            self.incoming[target.0].push(EdgeIndex(i));
        }
    }
}
