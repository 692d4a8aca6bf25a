//! Topic analysis pipeline: prototype pass, pairwise pass, clustering.

use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::{info, warn};

use crate::clusters::{make_cluster_map, ClusterMap};
use crate::corpus::{CorpusError, CorpusView};
use crate::doc_compare::doc_similarity;
use crate::doc_select::find_similar_docs;
use crate::matrix::SimilarityMatrix;
use crate::models::{AnalysisResult, AnalysisStatus, ComparisonSummary, TdtParams, TopicRequest};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("Analysis cancelled")]
    Cancelled,
}

/// Run the full pipeline for one topic request.
pub fn analyze<C: CorpusView>(
    corpus: &C,
    request: &TopicRequest,
    params: &TdtParams,
    show_progress: bool,
) -> Result<AnalysisResult, AnalysisError> {
    analyze_with_cancel(corpus, request, params, show_progress, None)
}

/// Run the full pipeline, stopping with [`AnalysisError::Cancelled`] once
/// `cancel` is set.
///
/// Missing input (a prototype without query arcs, no related candidates,
/// no clusters) is reported through the result's status, not as an error.
pub fn analyze_with_cancel<C: CorpusView>(
    corpus: &C,
    request: &TopicRequest,
    params: &TdtParams,
    show_progress: bool,
    cancel: Option<&AtomicBool>,
) -> Result<AnalysisResult, AnalysisError> {
    let mut result = AnalysisResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        parameters: params.clone(),
        prototype: request.prototype,
        query: request.query.clone(),
        status: AnalysisStatus::Complete,
        prototype_matrix: SimilarityMatrix::new(),
        matrix: SimilarityMatrix::new(),
        retained: Vec::new(),
        clusters: ClusterMap::new(),
        summary: ComparisonSummary::default(),
    };

    info!(
        prototype = request.prototype,
        query_size = request.query.len(),
        candidates = request.candidates.len(),
        "Starting topic analysis"
    );

    let selection = find_similar_docs(corpus, request, params)?;
    result.prototype_matrix = selection.matrix;

    if selection.prototype_profile.is_none() {
        result.status = AnalysisStatus::EmptyPrototype;
        return Ok(result);
    }
    let related = selection
        .recall
        .iter()
        .filter(|entry| entry.profile.doc_id != request.prototype)
        .count();
    if related == 0 {
        warn!(prototype = request.prototype, "No related documents");
        result.status = AnalysisStatus::NoRelatedDocuments;
        return Ok(result);
    }

    let comparison = doc_similarity(corpus, &selection.recall, params, show_progress, cancel)?;
    let outcome = make_cluster_map(&comparison.matrix, &comparison.ranked, params.cluster_core_number);

    result.matrix = comparison.matrix;
    result.summary = comparison.summary;
    result.retained = outcome.retained;
    result.clusters = outcome.clusters;
    if result.clusters.is_empty() {
        result.status = AnalysisStatus::NoClusters;
    }

    info!(
        status = result.status.message(),
        clusters = result.clusters.len(),
        retained = result.retained.len(),
        "Topic analysis finished"
    );
    Ok(result)
}
