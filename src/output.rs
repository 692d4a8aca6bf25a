//! Output formatting for analysis results (JSON, CSV, console).

use crate::clusters::ClusterMap;
use crate::matrix::{DocNode, SimilarityMatrix};
use crate::models::{AnalysisResult, DocId, RankedDoc};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write analysis result as JSON.
pub fn write_json<W: Write>(result: &AnalysisResult, writer: &mut W) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(result)?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

/// Write analysis result as JSON to a file.
pub fn write_json_file(result: &AnalysisResult, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_json(result, &mut file)
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a u32>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write matrix cells as CSV. Shared vertices are space-separated.
pub fn write_matrix_csv<W: Write>(matrix: &SimilarityMatrix, writer: &mut W) -> Result<(), OutputError> {
    writeln!(writer, "row,column,similarity,sim_v,sim_w,alpha,beta,shared_vertices")?;

    for node in matrix.iter() {
        writeln!(
            writer,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
            node.row(),
            node.column(),
            node.similarity(),
            node.sim_v(),
            node.sim_w(),
            node.alpha(),
            node.beta(),
            join_ids(node.shared_vertices())
        )?;
    }

    Ok(())
}

/// Write matrix cells as CSV to a file.
pub fn write_matrix_csv_file(matrix: &SimilarityMatrix, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_matrix_csv(matrix, &mut file)
}

/// Write cluster membership as CSV, one row per member, in rank order.
pub fn write_clusters_csv<W: Write>(
    clusters: &ClusterMap,
    retained: &[RankedDoc],
    writer: &mut W,
) -> Result<(), OutputError> {
    writeln!(writer, "focus,doc_id,prototype_similarity")?;

    for doc in retained {
        if let Some(focus) = clusters.focus_of(doc.doc_id) {
            writeln!(writer, "{},{},{:.6}", focus, doc.doc_id, doc.similarity)?;
        }
    }

    Ok(())
}

/// Write cluster membership as CSV to a file.
pub fn write_clusters_csv_file(
    clusters: &ClusterMap,
    retained: &[RankedDoc],
    path: &Path,
) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_clusters_csv(clusters, retained, &mut file)
}

/// Write a summary report to stdout.
pub fn print_summary(result: &AnalysisResult) {
    println!("\n=== Topic Analysis Summary ===");
    println!("Version: {}", result.version);
    println!();
    println!("Prototype: {}", result.prototype);
    println!("Query vertices: {}", join_ids(&result.query));
    println!();
    println!("Parameters:");
    println!("  Extra arcs: {}", result.parameters.extra_arcs);
    println!("  Arc budget: {}", result.parameters.arc_budget);
    println!("  Min walk length: {}", result.parameters.min_walk_len);
    println!("  Shared vertices (prototype): > {}", result.parameters.vertex_shared);
    println!("  Shared vertices (pairwise): > {}", result.parameters.pair_shared);
    println!("  Cluster core number: {}", result.parameters.cluster_core_number);
    println!();
    println!("Results:");
    println!("  Status: {}", result.status.message());
    println!("  Prototype cells: {}", result.prototype_matrix.len());
    for line in result.summary.to_string().lines() {
        println!("  {}", line);
    }
    println!(
        "  Similarity mean: {:.4} (std dev {:.4})",
        result.matrix.mean(),
        result.matrix.std_dev()
    );
    println!("  Clusters: {}", result.clusters.len());
    println!("  Clustered documents: {}", result.retained.len());
}

/// Format a matrix cell as a human-readable string.
pub fn format_node(node: &DocNode) -> String {
    format!(
        "Doc {} ↔ Doc {}: sim={:.1}% (V {:.1}%, W {:.1}%, alpha {:.2}) shared={}",
        node.row(),
        node.column(),
        node.similarity() * 100.0,
        node.sim_v() * 100.0,
        node.sim_w() * 100.0,
        node.alpha(),
        node.shared_vertices().len()
    )
}

/// Format a cluster as a human-readable string.
pub fn format_cluster(focus: DocId, members: &BTreeSet<DocId>, retained: &[RankedDoc]) -> String {
    let mut text = format!("Cluster {} ({} documents)", focus, members.len());
    for doc in retained.iter().filter(|d| members.contains(&d.doc_id)) {
        let marker = if doc.doc_id == focus { "*" } else { " " };
        text.push_str(&format!(
            "\n {} Doc {}: {:.1}%",
            marker,
            doc.doc_id,
            doc.similarity * 100.0
        ));
    }
    text
}

/// Print clusters in a human-readable format.
pub fn print_clusters(result: &AnalysisResult, limit: Option<usize>) {
    let total = result.clusters.len();
    let to_print = limit.unwrap_or(total).min(total);

    for (focus, members) in result.clusters.iter().take(to_print) {
        println!("{}", format_cluster(focus, members, &result.retained));
    }

    if total > to_print {
        println!("... and {} more clusters", total - to_print);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> SimilarityMatrix {
        let mut matrix = SimilarityMatrix::new();
        matrix.add(DocNode::new(7, 3, 0.8, 0.5, 0.25, [4, 9].into_iter().collect()));
        matrix
    }

    fn create_test_clusters() -> (ClusterMap, Vec<RankedDoc>) {
        let mut clusters = ClusterMap::new();
        clusters.register(3, [3, 7].into_iter().collect());
        let retained = vec![
            RankedDoc { doc_id: 3, similarity: 0.9 },
            RankedDoc { doc_id: 7, similarity: 0.45 },
        ];
        (clusters, retained)
    }

    #[test]
    fn test_format_node() {
        let matrix = create_test_matrix();
        let formatted = format_node(&matrix.nodes()[0]);

        assert!(formatted.contains("Doc 3"));
        assert!(formatted.contains("Doc 7"));
        assert!(formatted.contains("sim=50.0%"));
        assert!(formatted.contains("V 80.0%"));
        assert!(formatted.contains("shared=2"));
    }

    #[test]
    fn test_write_matrix_csv() {
        let matrix = create_test_matrix();
        let mut output = Vec::new();

        write_matrix_csv(&matrix, &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        assert!(csv.contains("row,column,similarity")); // Header
        assert!(csv.contains("3,7,0.500000,0.800000"));
        assert!(csv.trim_end().ends_with("4 9"));
    }

    #[test]
    fn test_write_matrix_csv_empty() {
        let mut output = Vec::new();

        write_matrix_csv(&SimilarityMatrix::new(), &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        // Should only have header
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_write_clusters_csv() {
        let (clusters, retained) = create_test_clusters();
        let mut output = Vec::new();

        write_clusters_csv(&clusters, &retained, &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "focus,doc_id,prototype_similarity");
        assert_eq!(lines[1], "3,3,0.900000");
        assert_eq!(lines[2], "3,7,0.450000");
    }

    #[test]
    fn test_format_cluster() {
        let (clusters, retained) = create_test_clusters();
        let formatted = format_cluster(3, clusters.members(3).unwrap(), &retained);

        assert!(formatted.starts_with("Cluster 3 (2 documents)"));
        assert!(formatted.contains("* Doc 3: 90.0%"));
        assert!(formatted.contains("Doc 7: 45.0%"));
    }
}
