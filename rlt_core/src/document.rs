//! # Graph Documents
//!
//! JSON codec for load path graphs. Two layouts are accepted:
//!
//! ```text
//! canonical                            classic
//! ├── metadata (ignored on load)       ├── loads:   [node record]
//! ├── gravity {value, direction}       ├── targets: [target record]
//! ├── nodes: [node record]             └── gravity
//! └── edges: [edge record]
//! ```
//!
//! Records may be wrapped in a `{"data": {...}}` object; the wrapper is
//! dropped. Unknown keys (colors, canvas positions) are ignored.
//!
//! A classic target carrying `source`/`target` is an edge whose interface
//! frame is the target's own frame. A target without them is a sink frame:
//! it becomes a load-free node and every load gets an edge `"{load}->{target}"`
//! into it.
//!
//! Every loading failure is reported as [`RltError::ParseError`] with the
//! path of the offending field, e.g. `nodes[3].cog`.
//!
//! ## Example
//!
//! ```rust
//! use rlt_core::document::load_graph;
//!
//! let graph = load_graph(r#"{
//!     "nodes": [
//!         {"id": "n0", "translation": [0, 0, 0], "euler_angles": [0, 0, 0]},
//!         {"id": "n1", "translation": [10, 0, 0], "euler_angles": [0, 0, 0],
//!          "external_force": [0, 0, -100]}
//!     ],
//!     "edges": [{"id": "e0", "source": "n1", "target": "n0"}]
//! }"#).unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert!(graph.gravity().is_none());
//! ```

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use nalgebra::Vector3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{RltError, RltResult};
use crate::graph::{Edge, EdgeResult, Graph, InterfaceFrame, Node};
use crate::gravity::{Gravity, STANDARD_GRAVITY};
use crate::rotation::RotationOrder;
use crate::transfer::Load;

/// Version written into exported documents
pub const DOCUMENT_VERSION: &str = "2.0";

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cog: Option<Vec<f64>>,
    #[serde(default, alias = "force", skip_serializing_if = "Option::is_none")]
    external_force: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    moment: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    euler_angles: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    translation: Option<Vec<f64>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResultRecord {
    #[serde(default)]
    force: Option<Vec<f64>>,
    #[serde(default)]
    moment: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interface_force: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interface_moment: Option<Vec<f64>>,
    #[serde(default)]
    is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InterfaceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    euler_angles: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation_order: Option<String>,
    #[serde(default, alias = "translation", skip_serializing_if = "Option::is_none")]
    position: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rlt_results: Option<ResultRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EdgeRecord {
    #[serde(default, alias = "edge_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interface_properties: Option<InterfaceRecord>,

    // Flat interface keys written by older files
    #[serde(default, skip_serializing)]
    interface_euler_angles: Option<Vec<f64>>,
    #[serde(default, skip_serializing)]
    interface_rotation_order: Option<String>,
    #[serde(default, alias = "interface_translation", skip_serializing)]
    interface_position: Option<Vec<f64>>,
    #[serde(default, skip_serializing)]
    rlt_results: Option<ResultRecord>,
}

/// Classic target record: an edge when `source`/`target` are present,
/// a sink frame otherwise
#[derive(Debug, Default, Deserialize)]
struct TargetRecord {
    #[serde(default, alias = "edge_id")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    euler_angles: Option<Vec<f64>>,
    #[serde(default)]
    rotation_order: Option<String>,
    #[serde(default, alias = "position")]
    translation: Option<Vec<f64>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GravityRecord {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    direction: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    nodes: Option<Vec<Value>>,
    #[serde(default)]
    edges: Option<Vec<Value>>,
    #[serde(default)]
    loads: Option<Vec<Value>>,
    #[serde(default)]
    targets: Option<Vec<Value>>,
    #[serde(default)]
    gravity: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Units {
    force: &'static str,
    moment: &'static str,
    mass: &'static str,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct Metadata {
    version: &'static str,
    coordinate_system: &'static str,
    units: Units,
    description: &'static str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct ExportRecord {
    metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    gravity: Option<GravityRecord>,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
}

// ============================================================================
// Field conversion
// ============================================================================

/// Deserialize one record, dropping a `{"data": {...}}` wrapper.
///
/// A field of the wrong type is reported at `<path>.<field>`.
fn record<T: DeserializeOwned>(value: &Value, path: &str) -> RltResult<T> {
    let inner = match value.get("data") {
        Some(data) if data.is_object() => data,
        _ => value,
    };
    let Some(object) = inner.as_object() else {
        return Err(RltError::parse(path, "expected an object"));
    };
    T::deserialize(inner).map_err(|e| {
        let at = match offending_field::<T>(object) {
            Some(field) => format!("{}.{}", path, field),
            None => path.to_string(),
        };
        RltError::parse(at, e.to_string())
    })
}

/// First key that fails to deserialize on its own.
///
/// Record fields are all optional, so a single-key object only fails when
/// that key's value has the wrong shape.
fn offending_field<T: DeserializeOwned>(object: &Map<String, Value>) -> Option<&str> {
    object
        .iter()
        .find(|(key, value)| {
            let mut single = Map::new();
            single.insert((*key).clone(), (*value).clone());
            T::deserialize(Value::Object(single)).is_err()
        })
        .map(|(key, _)| key.as_str())
}

fn vec3(values: Option<Vec<f64>>, path: &str) -> RltResult<Option<Vector3<f64>>> {
    match values {
        None => Ok(None),
        Some(v) if v.len() == 3 => Ok(Some(Vector3::from_column_slice(&v))),
        Some(v) => Err(RltError::parse(path, format!("expected 3 components, found {}", v.len()))),
    }
}

fn rotation_order(value: Option<String>, path: &str) -> RltResult<RotationOrder> {
    match value {
        None => Ok(RotationOrder::default()),
        Some(s) => s.parse().map_err(|e: RltError| RltError::parse(path, e.to_string())),
    }
}

/// RFC 3339, or the naive ISO-8601 form without offset (read as UTC)
fn timestamp(value: Option<String>, path: &str) -> RltResult<Option<DateTime<Utc>>> {
    let Some(s) = value else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| RltError::parse(path, format!("invalid timestamp '{}'", s)))
}

fn to_vec(v: &Vector3<f64>) -> Vec<f64> {
    v.iter().copied().collect()
}

/// JSON has no NaN or infinity; non-finite results are left out on export
fn finite_vec(v: &Vector3<f64>) -> Option<Vec<f64>> {
    v.iter().all(|c| c.is_finite()).then(|| to_vec(v))
}

fn required(value: Option<String>, path: &str) -> RltResult<String> {
    value.ok_or_else(|| RltError::parse(path, "missing required field"))
}

// ============================================================================
// Loading
// ============================================================================

/// Parse a JSON document into a graph.
pub fn load_graph(document: &str) -> RltResult<Graph> {
    let value: Value = serde_json::from_str(document).map_err(|e| RltError::parse("$", e.to_string()))?;
    graph_from_value(&value)
}

/// Build a graph from an already parsed JSON document.
pub fn graph_from_value(value: &Value) -> RltResult<Graph> {
    let doc: DocumentRecord = record(value, "$")?;

    let mut graph = Graph::new();
    let gravity = match &doc.gravity {
        Some(value) => Some(parse_gravity(record(value, "gravity")?)?),
        None => None,
    };
    graph.set_gravity(gravity);

    match (doc.nodes, doc.loads) {
        (Some(nodes), _) => {
            for (i, value) in nodes.iter().enumerate() {
                let path = format!("nodes[{}]", i);
                let node = parse_node(record(value, &path)?, &path, None)?;
                add_node(&mut graph, node, &path)?;
            }
            for (i, value) in doc.edges.unwrap_or_default().iter().enumerate() {
                let path = format!("edges[{}]", i);
                let edge = parse_edge(record(value, &path)?, &path)?;
                restore_edge(&mut graph, edge, &path)?;
            }
        }
        (None, Some(loads)) => {
            let mut load_ids = Vec::with_capacity(loads.len());
            for (i, value) in loads.iter().enumerate() {
                let path = format!("loads[{}]", i);
                let node = parse_node(record(value, &path)?, &path, Some(i))?;
                load_ids.push(node.id.clone());
                add_node(&mut graph, node, &path)?;
            }
            for (i, value) in doc.targets.unwrap_or_default().iter().enumerate() {
                let path = format!("targets[{}]", i);
                parse_target(&mut graph, record(value, &path)?, &path, i, &load_ids)?;
            }
        }
        (None, None) => return Err(RltError::parse("$", "expected 'nodes' or 'loads'")),
    }

    Ok(graph)
}

fn parse_gravity(record: GravityRecord) -> RltResult<Gravity> {
    let value = record.value.unwrap_or(STANDARD_GRAVITY);
    let direction = vec3(record.direction, "gravity.direction")?.unwrap_or_else(Gravity::default_direction);
    Ok(Gravity::new(value, direction))
}

/// `classic_index` is set for classic loads, whose id may be omitted
fn parse_node(record: NodeRecord, path: &str, classic_index: Option<usize>) -> RltResult<Node> {
    let id = match (record.id, classic_index) {
        (Some(id), _) => id,
        (None, Some(i)) => format!("n{}", i),
        (None, None) => return Err(RltError::parse(format!("{}.id", path), "missing required field")),
    };
    let name = match (record.name, classic_index) {
        (Some(name), _) => name,
        (None, Some(i)) => format!("Load System {}", i + 1),
        (None, None) => id.clone(),
    };

    let mass = record.mass.unwrap_or(0.0);
    if mass < 0.0 {
        return Err(RltError::parse(format!("{}.mass", path), "mass must be non-negative"));
    }

    let zero = Vector3::zeros();
    Ok(Node {
        name,
        mass,
        cog: vec3(record.cog, &format!("{}.cog", path))?.unwrap_or(zero),
        applied_force: vec3(record.external_force, &format!("{}.external_force", path))?.unwrap_or(zero),
        applied_moment: vec3(record.moment, &format!("{}.moment", path))?.unwrap_or(zero),
        euler_angles: vec3(record.euler_angles, &format!("{}.euler_angles", path))?,
        rotation_order: rotation_order(record.rotation_order, &format!("{}.rotation_order", path))?,
        translation: vec3(record.translation, &format!("{}.translation", path))?,
        id,
    })
}

fn parse_result(record: ResultRecord, path: &str) -> RltResult<EdgeResult> {
    let zero = Vector3::zeros();
    let interface_force = vec3(record.interface_force, &format!("{}.interface_force", path))?;
    let interface_moment = vec3(record.interface_moment, &format!("{}.interface_moment", path))?;
    Ok(EdgeResult {
        force: vec3(record.force, &format!("{}.force", path))?.unwrap_or(zero),
        moment: vec3(record.moment, &format!("{}.moment", path))?.unwrap_or(zero),
        interface_load: interface_force.zip(interface_moment).map(|(f, m)| Load::new(f, m)),
        is_valid: record.is_valid.unwrap_or(false),
        reason: record.reason,
        timestamp: timestamp(record.timestamp, &format!("{}.timestamp", path))?,
    })
}

/// Interface frame from optional parts; `None` when no frame key is present
fn parse_interface(
    euler_angles: Option<Vec<f64>>,
    order: Option<String>,
    position: Option<Vec<f64>>,
    path: &str,
) -> RltResult<Option<InterfaceFrame>> {
    if euler_angles.is_none() && order.is_none() && position.is_none() {
        return Ok(None);
    }
    Ok(Some(InterfaceFrame::new(
        vec3(euler_angles, &format!("{}.euler_angles", path))?.unwrap_or_else(Vector3::zeros),
        rotation_order(order, &format!("{}.rotation_order", path))?,
        vec3(position, &format!("{}.position", path))?,
    )))
}

fn parse_edge(record: EdgeRecord, path: &str) -> RltResult<Edge> {
    let id = required(record.id, &format!("{}.id", path))?;
    let source = required(record.source, &format!("{}.source", path))?;
    let target = required(record.target, &format!("{}.target", path))?;

    let (interface, results, results_path) = match record.interface_properties {
        Some(props) => {
            let props_path = format!("{}.interface_properties", path);
            let interface = parse_interface(props.euler_angles, props.rotation_order, props.position, &props_path)?;
            (interface, props.rlt_results, format!("{}.rlt_results", props_path))
        }
        None => {
            let interface = parse_interface(
                record.interface_euler_angles,
                record.interface_rotation_order,
                record.interface_position,
                &format!("{}.interface", path),
            )?;
            (interface, record.rlt_results, format!("{}.rlt_results", path))
        }
    };

    Ok(Edge {
        id,
        source,
        target,
        interface,
        rlt_result: results.map(|r| parse_result(r, &results_path)).transpose()?,
    })
}

fn parse_target(graph: &mut Graph, record: TargetRecord, path: &str, index: usize, load_ids: &[String]) -> RltResult<()> {
    match (record.source, record.target) {
        (Some(source), Some(target)) => {
            let edge = Edge {
                id: record.id.unwrap_or_else(|| format!("e{}", index)),
                source,
                target,
                interface: parse_interface(record.euler_angles, record.rotation_order, record.translation, path)?,
                rlt_result: None,
            };
            restore_edge(graph, edge, path)
        }
        (None, None) => {
            let id = record.id.unwrap_or_else(|| format!("t{}", index));
            let sink = Node {
                name: record.name.unwrap_or_else(|| format!("Target System {}", index + 1)),
                euler_angles: vec3(record.euler_angles, &format!("{}.euler_angles", path))?,
                rotation_order: rotation_order(record.rotation_order, &format!("{}.rotation_order", path))?,
                translation: vec3(record.translation, &format!("{}.translation", path))?,
                ..Node::new(id.clone())
            };
            add_node(graph, sink, path)?;
            for load in load_ids {
                let edge = Edge::new(format!("{}->{}", load, id), load.as_str(), id.as_str());
                restore_edge(graph, edge, path)?;
            }
            Ok(())
        }
        (None, Some(_)) => Err(RltError::parse(format!("{}.source", path), "missing required field")),
        (Some(_), None) => Err(RltError::parse(format!("{}.target", path), "missing required field")),
    }
}

fn add_node(graph: &mut Graph, node: Node, path: &str) -> RltResult<()> {
    graph
        .add_node(node)
        .map(|_| ())
        .map_err(|e| RltError::parse(format!("{}.id", path), e.to_string()))
}

fn restore_edge(graph: &mut Graph, edge: Edge, path: &str) -> RltResult<()> {
    graph.restore_edge(edge).map(|_| ()).map_err(|e| {
        let field = match &e {
            RltError::UnknownNode { .. } => "source/target",
            _ => "id",
        };
        RltError::parse(format!("{}.{}", path, field), e.to_string())
    })
}

// ============================================================================
// Export
// ============================================================================

fn node_record(node: &Node) -> NodeRecord {
    NodeRecord {
        id: Some(node.id.clone()),
        name: Some(node.name.clone()),
        mass: Some(node.mass),
        cog: Some(to_vec(&node.cog)),
        external_force: Some(to_vec(&node.applied_force)),
        moment: Some(to_vec(&node.applied_moment)),
        euler_angles: node.euler_angles.as_ref().map(to_vec),
        rotation_order: Some(node.rotation_order.to_string()),
        translation: node.translation.as_ref().map(to_vec),
    }
}

fn result_record(result: &EdgeResult) -> ResultRecord {
    let interface_load = result.interface_load.filter(Load::is_finite);
    ResultRecord {
        force: finite_vec(&result.force),
        moment: finite_vec(&result.moment),
        interface_force: interface_load.map(|l| to_vec(&l.force)),
        interface_moment: interface_load.map(|l| to_vec(&l.moment)),
        is_valid: Some(result.is_valid),
        reason: result.reason.clone(),
        timestamp: result.timestamp.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn edge_record(edge: &Edge) -> EdgeRecord {
    let rlt_results = edge.rlt_result.as_ref().map(result_record);
    let interface_properties = match (&edge.interface, rlt_results) {
        (None, None) => None,
        (Some(interface), rlt_results) => Some(InterfaceRecord {
            euler_angles: Some(to_vec(&interface.euler_angles)),
            rotation_order: Some(interface.rotation_order.to_string()),
            position: interface.translation.as_ref().map(to_vec),
            rlt_results,
        }),
        (None, rlt_results) => Some(InterfaceRecord {
            rlt_results,
            ..InterfaceRecord::default()
        }),
    };
    EdgeRecord {
        id: Some(edge.id.clone()),
        source: Some(edge.source.clone()),
        target: Some(edge.target.clone()),
        interface_properties,
        ..EdgeRecord::default()
    }
}

/// Canonical document for a graph, including cached edge results.
///
/// Loading the output with [`load_graph`] reproduces the graph.
pub fn to_document(graph: &Graph) -> RltResult<Value> {
    let export = ExportRecord {
        metadata: Metadata {
            version: DOCUMENT_VERSION,
            coordinate_system: "right-handed",
            units: Units {
                force: "N",
                moment: "Nm",
                mass: "kg",
                distance: "mm",
            },
            description: "Rigid load transfer graph",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        },
        gravity: graph.gravity().map(|g| GravityRecord {
            value: Some(g.value),
            direction: Some(to_vec(&g.direction)),
        }),
        nodes: graph.nodes().iter().map(node_record).collect(),
        edges: graph.edges().iter().map(edge_record).collect(),
    };
    Ok(serde_json::to_value(export)?)
}

/// [`to_document`] as pretty-printed JSON
pub fn to_document_string(graph: &Graph) -> RltResult<String> {
    Ok(serde_json::to_string_pretty(&to_document(graph)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use serde_json::json;

    fn parse_err(doc: Value) -> (String, String) {
        match graph_from_value(&doc).unwrap_err() {
            RltError::ParseError { path, reason } => (path, reason),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    fn turbine_doc() -> Value {
        json!({
            "gravity": {"value": 9.81, "direction": [0, 0, -1]},
            "nodes": [
                {"id": "rotor", "name": "Rotor", "mass": 0, "translation": [5, 0, 80],
                 "euler_angles": [0, 0, 0], "rotation_order": "xyz",
                 "external_force": [15000, 22000, 0], "moment": [0, 0, 35000], "color": "#e74c3c"},
                {"id": "nacelle", "translation": [0, 0, 80], "euler_angles": [0, 0, 0]},
                {"data": {"id": "tower", "translation": [0, 0, 0], "euler_angles": [0, 0, 0],
                          "mass": 1000, "cog": [0, 0, 40]}}
            ],
            "edges": [
                {"id": "e1", "source": "rotor", "target": "nacelle",
                 "interface_properties": {"position": [0, 0, 80], "euler_angles": [0, 45, 0],
                                          "rotation_order": "xyz"}},
                {"id": "e2", "source": "nacelle", "target": "tower"}
            ]
        })
    }

    #[test]
    fn test_load_canonical_document() {
        let g = graph_from_value(&turbine_doc()).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);

        let rotor = g.node_by_id("rotor").unwrap();
        assert_eq!(rotor.name, "Rotor");
        assert_eq!(rotor.applied_force, Vector3::new(15000.0, 22000.0, 0.0));

        let nacelle = g.node_by_id("nacelle").unwrap();
        assert_eq!(nacelle.name, "nacelle");
        assert_eq!(nacelle.mass, 0.0);

        // Unwrapped from "data"
        assert_eq!(g.node_by_id("tower").unwrap().mass, 1000.0);

        let e1 = g.edge_by_id("e1").unwrap();
        let interface = e1.interface.as_ref().unwrap();
        assert_eq!(interface.euler_angles, Vector3::new(0.0, 45.0, 0.0));
        assert_eq!(interface.translation, Some(Vector3::new(0.0, 0.0, 80.0)));
        assert!(g.edge_by_id("e2").unwrap().interface.is_none());
        assert_eq!(g.gravity(), Some(&Gravity::default()));
    }

    #[test]
    fn test_missing_frame_data_loads_but_is_absent() {
        let g = graph_from_value(&json!({"nodes": [{"id": "n0"}], "edges": []})).unwrap();
        let n0 = g.node_by_id("n0").unwrap();
        assert!(n0.translation.is_none());
        assert!(n0.euler_angles.is_none());
        assert_eq!(n0.rotation_order, RotationOrder::Xyz);
    }

    #[test]
    fn test_gravity_defaults() {
        let g = graph_from_value(&json!({"nodes": [], "gravity": {}})).unwrap();
        assert_eq!(g.gravity(), Some(&Gravity::default()));

        let g = graph_from_value(&json!({"nodes": [], "gravity": {"value": 3.71}})).unwrap();
        assert_eq!(g.gravity().unwrap().direction, Vector3::new(0.0, 0.0, -1.0));

        let g = graph_from_value(&json!({"nodes": []})).unwrap();
        assert!(g.gravity().is_none());
    }

    #[test]
    fn test_parse_error_paths() {
        let (path, reason) = parse_err(json!({"nodes": [
            {"id": "a"}, {"id": "b", "cog": [1, 2]}
        ]}));
        assert_eq!(path, "nodes[1].cog");
        assert!(reason.contains("found 2"));

        let (path, _) = parse_err(json!({"nodes": [{"id": "a", "rotation_order": "xxz"}]}));
        assert_eq!(path, "nodes[0].rotation_order");

        let (path, _) = parse_err(json!({"nodes": [{"name": "no id"}]}));
        assert_eq!(path, "nodes[0].id");

        let (path, _) = parse_err(json!({"nodes": [{"id": "a", "mass": -1}]}));
        assert_eq!(path, "nodes[0].mass");

        let (path, _) = parse_err(json!({"nodes": [{"id": "a", "mass": "heavy"}]}));
        assert_eq!(path, "nodes[0].mass");

        let (path, reason) = parse_err(json!({"nodes": [{"data": {"id": "a", "cog": ["x", 0, 0]}}]}));
        assert_eq!(path, "nodes[0].cog");
        assert!(reason.contains("expected f64"));

        let (path, _) = parse_err(json!({"loads": [{"force": [0, 0, -1], "translation": "origin"}]}));
        assert_eq!(path, "loads[0].translation");

        let (path, _) = parse_err(json!({"nodes": [], "gravity": {"value": "strong"}}));
        assert_eq!(path, "gravity.value");

        let (path, _) = parse_err(json!({"nodes": [{"id": "a"}], "edges": [
            {"id": 7, "source": "a", "target": "a"}
        ]}));
        assert_eq!(path, "edges[0].id");

        let (path, reason) = parse_err(json!({"nodes": [{"id": "a"}], "edges": [
            {"id": "e0", "source": "a", "target": "ghost"}
        ]}));
        assert_eq!(path, "edges[0].source/target");
        assert!(reason.contains("ghost"));

        let (path, _) = parse_err(json!({"nodes": [{"id": "a"}, {"id": "a"}]}));
        assert_eq!(path, "nodes[1].id");

        let (path, _) = parse_err(json!({"edges": []}));
        assert_eq!(path, "$");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = load_graph("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_cached_results_and_timestamps() {
        let doc = json!({
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [
                {"id": "e0", "source": "a", "target": "b", "interface_properties": {
                    "rlt_results": {"force": [1, 2, 3], "moment": [0, 0, 0], "is_valid": true,
                                    "timestamp": "2024-05-01T12:30:00.123456"}}},
                {"data": {"id": "e1", "source": "b", "target": "a",
                          "interface_euler_angles": [0, 0, 90],
                          "rlt_results": {"force": [0, 0, 0], "moment": [0, 0, 0],
                                          "is_valid": false, "timestamp": null}}}
            ]
        });
        let g = graph_from_value(&doc).unwrap();

        let e0 = g.edge_by_id("e0").unwrap();
        assert!(e0.interface.is_none());
        let r0 = e0.rlt_result.as_ref().unwrap();
        assert!(r0.is_valid);
        assert_eq!(r0.force, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(
            r0.timestamp.unwrap().to_rfc3339_opts(SecondsFormat::Micros, true),
            "2024-05-01T12:30:00.123456Z"
        );

        let e1 = g.edge_by_id("e1").unwrap();
        assert_eq!(e1.interface.as_ref().unwrap().euler_angles, Vector3::new(0.0, 0.0, 90.0));
        assert!(!e1.has_valid_result());
        assert!(e1.rlt_result.as_ref().unwrap().timestamp.is_none());

        let bad = json!({"nodes": [{"id": "a"}], "edges": [{"id": "e", "source": "a", "target": "a",
            "interface_properties": {"rlt_results": {"timestamp": "yesterday"}}}]});
        let (path, _) = parse_err(bad);
        assert_eq!(path, "edges[0].interface_properties.rlt_results.timestamp");
    }

    #[test]
    fn test_classic_loads_and_sink_targets() {
        let doc = json!({
            "loads": [
                {"name": "Hub", "force": [0, 0, -100], "moment": [0, 0, 0],
                 "euler_angles": [0, 0, 0], "rotation_order": "xyz", "translation": [10, 0, 0],
                 "color": {"hex": "#ff0000"}, "mass": 0, "cog": [0, 0, 0]},
                {"name": "Blade", "force": [0, 0, -50], "euler_angles": [0, 0, 0],
                 "rotation_order": "xyz", "translation": [0, 5, 0]}
            ],
            "targets": [
                {"name": "Flange", "euler_angles": [0, 0, 0], "rotation_order": "xyz",
                 "translation": [0, 0, 0]}
            ],
            "gravity": {"value": 9.81, "direction": [0, 0, -1]}
        });
        let g = graph_from_value(&doc).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.node_by_id("n0").unwrap().name, "Hub");
        assert_eq!(g.node_by_id("t0").unwrap().name, "Flange");
        assert!(g.edge_by_id("n0->t0").is_some());
        assert!(g.edge_by_id("n1->t0").is_some());

        let report = aggregate(&g).unwrap();
        let flange = report.node("t0").unwrap().accumulated.unwrap();
        assert!((flange.force - Vector3::new(0.0, 0.0, -150.0)).norm() < 1e-9);
        // -100 N at x=10 and -50 N at y=5
        assert!((flange.moment - Vector3::new(-250.0, 1000.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_classic_targets_with_endpoints_are_edges() {
        let doc = json!({
            "loads": [
                {"id": "a", "euler_angles": [0, 0, 0], "translation": [0, 0, 1]},
                {"id": "b", "euler_angles": [0, 0, 0], "translation": [0, 0, 0]}
            ],
            "targets": [
                {"edge_id": "ab", "source": "a", "target": "b",
                 "euler_angles": [0, 0, 0], "rotation_order": "xyz", "translation": [0, 0, 0]},
                {"source": "a"}
            ]
        });
        let (path, _) = parse_err(doc.clone());
        assert_eq!(path, "targets[1].target");

        let mut ok = doc;
        ok["targets"].as_array_mut().unwrap().pop();
        let g = graph_from_value(&ok).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert!(g.edge_by_id("ab").unwrap().interface.is_some());
    }

    #[test]
    fn test_export_round_trip() {
        let g = graph_from_value(&turbine_doc()).unwrap();
        let report = aggregate(&g).unwrap();
        let solved = report.apply_to(&g);

        let exported = to_document(&solved).unwrap();
        assert_eq!(exported["metadata"]["coordinate_system"], "right-handed");
        assert_eq!(exported["metadata"]["units"]["distance"], "mm");
        assert!(exported["edges"][0]["interface_properties"]["rlt_results"]["interface_force"].is_array());

        let reloaded = graph_from_value(&exported).unwrap();
        assert_eq!(reloaded.nodes(), solved.nodes());
        assert_eq!(reloaded.gravity(), solved.gravity());
        for (a, b) in reloaded.edges().iter().zip(solved.edges()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.interface, b.interface);
            let (ra, rb) = (a.rlt_result.as_ref().unwrap(), b.rlt_result.as_ref().unwrap());
            assert_eq!(ra.is_valid, rb.is_valid);
            assert_eq!(ra.timestamp, rb.timestamp);
            assert!((ra.moment - rb.moment).norm() <= 1e-9 * rb.moment.norm().max(1.0));
        }
    }

    #[test]
    fn test_export_of_non_finite_result_reloads() {
        let mut g = Graph::new();
        for id in ["a", "b", "c"] {
            g.add_node(Node::new(id).with_load(Vector3::new(1e308, 0.0, 0.0), Vector3::zeros()))
                .unwrap();
        }
        g.add_edge(Edge::new("ab", "a", "b")).unwrap();
        g.add_edge(Edge::new("bc", "b", "c")).unwrap();
        let solved = aggregate(&g).unwrap().apply_to(&g);
        let bc = solved.edge_by_id("bc").unwrap().rlt_result.clone().unwrap();
        assert!(!bc.is_valid);
        assert!(!bc.load().is_finite());

        let text = to_document_string(&solved).unwrap();
        let reloaded = load_graph(&text).unwrap();
        let ab = reloaded.edge_by_id("ab").unwrap().rlt_result.as_ref().unwrap();
        assert!(ab.is_valid);
        assert_eq!(ab.force, Vector3::new(1e308, 0.0, 0.0));

        let bc_reloaded = reloaded.edge_by_id("bc").unwrap().rlt_result.as_ref().unwrap();
        assert!(!bc_reloaded.is_valid);
        assert_eq!(bc_reloaded.reason, bc.reason);
        assert_eq!(bc_reloaded.force, Vector3::zeros());
        assert_eq!(bc_reloaded.moment, Vector3::zeros());
    }

    #[test]
    fn test_export_string_is_loadable() {
        let g = graph_from_value(&turbine_doc()).unwrap();
        let text = to_document_string(&g).unwrap();
        assert!(text.contains("\"version\": \"2.0\""));
        let reloaded = load_graph(&text).unwrap();
        assert_eq!(reloaded.edge_count(), 2);
        assert!(reloaded.edges().iter().all(|e| e.rlt_result.is_none()));
    }
}
