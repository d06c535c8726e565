//! Terminal rendering of aggregation reports.

use clap::ValueEnum;
use nalgebra::Vector3;
use rlt_core::AggregationReport;

const BANNER: &str = "═══════════════════════════════════════════════════════════════════════════════";

/// How `run` and `demo` print their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// The full report as JSON
    Json,
    /// Per-edge results as CSV
    Csv,
}

fn vector(v: &Vector3<f64>) -> String {
    format!("[{:>12.3} {:>12.3} {:>12.3}]", v[0], v[1], v[2])
}

/// Render a report in the requested format
pub fn render(report: &AggregationReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Table => table(report),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Csv => report.to_csv(),
    })
}

/// Edge results, then node totals, then a one-line verdict
pub fn table(report: &AggregationReport) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push_str("\n  LOAD PATH RESULTS\n");
    out.push_str(BANNER);
    out.push('\n');
    out.push_str(&format!("Order: {}\n\n", report.order.join(" → ")));

    out.push_str("Edges (target frame):\n");
    for edge in &report.edges {
        let r = &edge.result;
        out.push_str(&format!("  {} ({} → {})\n", edge.edge_id, edge.source, edge.target));
        if r.is_valid {
            out.push_str(&format!("    F = {} N\n", vector(&r.force)));
            out.push_str(&format!("    M = {} Nm\n", vector(&r.moment)));
            if let Some(at_interface) = &r.interface_load {
                out.push_str(&format!("    F_if = {} N\n", vector(&at_interface.force)));
                out.push_str(&format!("    M_if = {} Nm\n", vector(&at_interface.moment)));
            }
        } else {
            out.push_str(&format!("    [INVALID] {}\n", r.reason.as_deref().unwrap_or("unknown reason")));
        }
    }

    out.push_str("\nNodes (accumulated, local frame):\n");
    for node in &report.nodes {
        match (&node.accumulated, node.is_valid) {
            (Some(load), true) => {
                out.push_str(&format!("  {:<16} F = {} N\n", node.node_id, vector(&load.force)));
                out.push_str(&format!("  {:<16} M = {} Nm\n", "", vector(&load.moment)));
            }
            _ => out.push_str(&format!(
                "  {:<16} [INVALID] {}\n",
                node.node_id,
                node.reason.as_deref().unwrap_or("load could not be computed")
            )),
        }
    }

    let invalid = report.invalid_edges().count();
    out.push('\n');
    out.push_str(BANNER);
    if invalid == 0 {
        out.push_str(&format!("\n  RESULT: {} edges, all valid\n", report.edges.len()));
    } else {
        out.push_str(&format!("\n  RESULT: {} of {} edges invalid\n", invalid, report.edges.len()));
    }
    out.push_str(BANNER);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlt_core::graph::{Edge, Graph, Node};
    use rlt_core::aggregate;

    fn report() -> AggregationReport {
        let mut g = Graph::new();
        g.add_node(Node::new("base")).unwrap();
        g.add_node(
            Node::new("arm")
                .at(Vector3::new(10.0, 0.0, 0.0))
                .with_load(Vector3::new(0.0, 0.0, -100.0), Vector3::zeros()),
        )
        .unwrap();
        let mut ghost = Node::new("ghost");
        ghost.translation = None;
        g.add_node(ghost).unwrap();
        g.add_edge(Edge::new("e0", "arm", "base")).unwrap();
        g.add_edge(Edge::new("e1", "ghost", "base")).unwrap();
        aggregate(&g).unwrap()
    }

    #[test]
    fn test_table_lists_edges_and_verdict() {
        let text = table(&report());
        assert!(text.contains("e0 (arm → base)"));
        assert!(text.contains("1000.000"));
        assert!(text.contains("[INVALID] Missing frame data on 'ghost': translation"));
        assert!(text.contains("RESULT: 1 of 2 edges invalid"));
    }

    #[test]
    fn test_render_formats() {
        let r = report();
        let json = render(&r, OutputFormat::Json).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());

        let csv = render(&r, OutputFormat::Csv).unwrap();
        assert!(csv.starts_with("Edge,Source→Target,Fx,Fy,Fz,Mx,My,Mz"));
    }
}
