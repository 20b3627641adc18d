//! Display formatting for CLI output
//!
//! Pure functions that format data for display

use crate::cluster::{Cluster, Node, DEFAULT_OBJECT_NAME_PREFIX};
use crate::config::KubeconfigOpts;

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No nodes.\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!(
            "{:width$}",
            header.to_uppercase(),
            width = widths[i]
        ));
    }
    output.push('\n');

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        output.push('\n');
    }

    output
}

fn or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}

fn node_row(node: &Node) -> Vec<String> {
    vec![
        node.role().to_string(),
        if node.image().is_empty() {
            "-".to_string()
        } else {
            node.image().to_string()
        },
        if node.is_init() { "yes" } else { "" }.to_string(),
        or_dash(node.volumes()),
        or_dash(node.ports()),
    ]
}

// ============================================================================
// Cluster display
// ============================================================================

/// Format a descriptor as a header line plus one row per node, load balancer last
pub fn format_cluster_summary(cluster: &Cluster) -> String {
    let mut output = format!(
        "Cluster: {}   Network: {}   API: {}:{}\n\n",
        cluster.name,
        if cluster.network.name.is_empty() {
            "(new)"
        } else {
            cluster.network.name.as_str()
        },
        cluster.expose_api.host,
        cluster.expose_api.port
    );

    let rows = cluster.addressable_nodes().map(node_row).collect();
    output.push_str(&format_table(
        &["ROLE", "IMAGE", "INIT", "VOLUMES", "PORTS"],
        rows,
    ));
    output
}

/// Kubeconfig context name of a cluster
pub fn context_name(cluster_name: &str) -> String {
    format!("{}-{}", DEFAULT_OBJECT_NAME_PREFIX, cluster_name)
}

/// Tell the user how to point kubectl at the new cluster
pub fn format_usage_hint(
    cluster: &Cluster,
    kubeconfig: &KubeconfigOpts,
    program: &str,
    windows: bool,
) -> String {
    let mut output = String::from("You can now use it like this:\n");

    if kubeconfig.update && !kubeconfig.switch_context {
        output.push_str(&format!(
            "kubectl config use-context {}\n",
            context_name(&cluster.name)
        ));
    } else if !kubeconfig.switch_context && !kubeconfig.update {
        if windows {
            output.push_str(&format!(
                "$env:KUBECONFIG=({} kubeconfig get {})\n",
                program, cluster.name
            ));
        } else {
            output.push_str(&format!(
                "export KUBECONFIG=$({} kubeconfig get {})\n",
                program, cluster.name
            ));
        }
    }

    output.push_str("kubectl cluster-info\n");
    output
}
