//! Pairwise pass over the documents retained by the prototype pass.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::analysis::AnalysisError;
use crate::corpus::CorpusView;
use crate::matrix::{DocNode, SimilarityMatrix};
use crate::models::{rank_documents, ComparisonSummary, DocId, RankedDoc, RecallMap, TdtParams};
use crate::similarity::{score_pair, shared_vertices};

/// Result of the pairwise pass
#[derive(Debug, Clone, Default)]
pub struct PairwiseComparison {
    pub matrix: SimilarityMatrix,
    /// Documents involved in a useful cell, ranked by prototype similarity
    pub ranked: Vec<RankedDoc>,
    pub summary: ComparisonSummary,
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[inline]
fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// Compare every pair of retained documents.
///
/// Rows are scored in parallel and merged in row order, so the matrix does
/// not depend on thread scheduling. `cancel` is checked before each row.
pub fn doc_similarity<C: CorpusView>(
    corpus: &C,
    recall: &RecallMap,
    params: &TdtParams,
    show_progress: bool,
    cancel: Option<&AtomicBool>,
) -> Result<PairwiseComparison, AnalysisError> {
    let entries = recall.entries();
    let n = entries.len();

    let progress = if show_progress && n > 1 {
        Some(create_progress_bar(n as u64))
    } else {
        None
    };

    let rows: Vec<Vec<DocNode>> = (0..n)
        .into_par_iter()
        .map(|i| {
            if is_cancelled(cancel) {
                return Err(AnalysisError::Cancelled);
            }
            let a = &entries[i].profile;
            let mut row = Vec::new();
            for entry in &entries[i + 1..] {
                let b = &entry.profile;
                if a.vertices.len() <= 1 && b.vertices.len() <= 1 {
                    continue;
                }
                let shared = shared_vertices(a, b);
                if shared.len() <= params.pair_shared {
                    continue;
                }
                let score = score_pair(corpus, a, b, shared)?;
                row.push(DocNode::from_score(a.doc_id, b.doc_id, score));
            }
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            Ok(row)
        })
        .collect::<Result<_, AnalysisError>>()?;

    if let Some(pb) = progress {
        pb.finish_with_message("Done");
    }

    let mut matrix = SimilarityMatrix::new();
    let mut useful_cells = 0usize;
    let mut involved: BTreeSet<DocId> = BTreeSet::new();

    for node in rows.into_iter().flatten() {
        if node.similarity() > params.sim_tolerance {
            useful_cells += 1;
            involved.insert(node.row());
            involved.insert(node.column());
        }
        matrix.add(node);
    }

    let mut ranked: Vec<RankedDoc> = recall
        .iter()
        .filter(|entry| involved.contains(&entry.profile.doc_id))
        .map(|entry| RankedDoc {
            doc_id: entry.profile.doc_id,
            similarity: entry.similarity,
        })
        .collect();
    rank_documents(&mut ranked);

    let summary = ComparisonSummary::new(n, useful_cells);
    debug!(
        mean = matrix.mean(),
        std_dev = matrix.std_dev(),
        "Pairwise similarity distribution"
    );
    info!(
        documents = n,
        cells = matrix.len(),
        useful = useful_cells,
        "Pairwise pass complete"
    );

    Ok(PairwiseComparison {
        matrix,
        ranked,
        summary,
    })
}
