//! # Aggregation Report
//!
//! The explicit output of [`crate::aggregate::aggregate`]: one result per
//! edge (in edge insertion order), one summary per node (in topological
//! order), and helpers to render them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeResult, Graph};
use crate::transfer::Load;

/// Result of one edge, tagged with its endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeReport {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    pub result: EdgeResult,
}

/// Loads seen at one node during aggregation, all in the node's local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node_id: String,

    /// Applied load plus weight; `None` if it could not be computed
    pub own_load: Option<Load>,

    /// Own load plus every incoming transferred load. For a node without
    /// outgoing edges this is the net load the structure delivers to it.
    pub accumulated: Option<Load>,

    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything one aggregation run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// When the run happened; also the timestamp of every edge result
    pub computed_at: DateTime<Utc>,

    /// Node ids in the order they were processed
    pub order: Vec<String>,

    /// Per-edge results, in edge insertion order
    pub edges: Vec<EdgeReport>,

    /// Per-node loads, in processing order
    pub nodes: Vec<NodeReport>,
}

impl AggregationReport {
    /// Result for an edge id
    pub fn result(&self, edge_id: &str) -> Option<&EdgeResult> {
        self.edges
            .iter()
            .find(|e| e.edge_id == edge_id)
            .map(|e| &e.result)
    }

    /// Summary for a node id
    pub fn node(&self, node_id: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Edges whose result is flagged invalid
    pub fn invalid_edges(&self) -> impl Iterator<Item = &EdgeReport> {
        self.edges.iter().filter(|e| !e.result.is_valid)
    }

    /// Whether every edge result is valid
    pub fn all_valid(&self) -> bool {
        self.invalid_edges().next().is_none()
    }

    /// `(edge id, result)` pairs, for [`Graph::with_results`]
    pub fn results(&self) -> impl Iterator<Item = (&str, &EdgeResult)> {
        self.edges.iter().map(|e| (e.edge_id.as_str(), &e.result))
    }

    /// Copy of `graph` with this report's results written onto its edges
    pub fn apply_to(&self, graph: &Graph) -> Graph {
        graph.with_results(self.results())
    }

    /// Per-edge results as CSV.
    ///
    /// Columns: `Edge, Source→Target, Fx, Fy, Fz, Mx, My, Mz`, three decimals.
    /// Invalid edges keep their row with the reason in place of the numbers.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Edge,Source→Target,Fx,Fy,Fz,Mx,My,Mz\n");
        for edge in &self.edges {
            let path = format!("{}→{}", edge.source, edge.target);
            let values: Vec<String> = if edge.result.is_valid {
                edge.result
                    .force
                    .iter()
                    .chain(edge.result.moment.iter())
                    .map(|v| format!("{:.3}", v))
                    .collect()
            } else {
                let reason = edge.result.reason.as_deref().unwrap_or("invalid");
                vec![csv_field(reason); 6]
            };
            out.push_str(&format!("{},{},{}\n", csv_field(&edge.edge_id), csv_field(&path), values.join(",")));
        }
        out
    }
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn report() -> AggregationReport {
        let now = Utc::now();
        AggregationReport {
            computed_at: now,
            order: vec!["n1".into(), "n0".into()],
            edges: vec![
                EdgeReport {
                    edge_id: "e0".into(),
                    source: "n1".into(),
                    target: "n0".into(),
                    result: EdgeResult::valid(
                        Load::new(Vector3::new(0.0, 0.0, -100.0), Vector3::new(0.0, 1000.0, 0.0)),
                        None,
                        now,
                    ),
                },
                EdgeReport {
                    edge_id: "e1".into(),
                    source: "n2".into(),
                    target: "n0".into(),
                    result: EdgeResult::invalid(None, "Missing frame data on 'n2': translation", now),
                },
            ],
            nodes: vec![],
        }
    }

    #[test]
    fn test_lookup_and_validity() {
        let r = report();
        assert!(r.result("e0").unwrap().is_valid);
        assert!(!r.all_valid());
        assert_eq!(r.invalid_edges().count(), 1);
        assert!(r.result("missing").is_none());
    }

    #[test]
    fn test_csv_rows() {
        let csv = report().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Edge,Source→Target,Fx,Fy,Fz,Mx,My,Mz");
        assert_eq!(lines[1], "e0,n1→n0,0.000,0.000,-100.000,0.000,1000.000,0.000");
        assert!(lines[2].starts_with("e1,n2→n0,"));
        assert!(lines[2].contains("Missing frame data"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_report_serialization() {
        let r = report();
        let json = serde_json::to_string(&r).unwrap();
        let roundtrip: AggregationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.edges.len(), 2);
        assert_eq!(roundtrip.result("e0").unwrap().moment, Vector3::new(0.0, 1000.0, 0.0));
    }
}
