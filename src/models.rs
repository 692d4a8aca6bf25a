//! Data structures for the topic detection and tracking pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::clusters::ClusterMap;
use crate::matrix::SimilarityMatrix;

/// Document identifier
pub type DocId = u32;

/// Token-type identifier (a vertex of the co-occurrence graph)
pub type VertexId = u32;

/// Placeholder vertex id. Arcs touching it are never created.
pub const DUMMY_VERTEX: VertexId = 0;

/// Ordered vertex pair identifying an arc within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcKey {
    pub from: VertexId,
    pub to: VertexId,
}

impl ArcKey {
    pub fn new(from: VertexId, to: VertexId) -> Self {
        Self { from, to }
    }

    /// True unless the pair is a self-loop or touches the dummy vertex
    pub fn is_valid(&self) -> bool {
        self.from != self.to && self.from != DUMMY_VERTEX && self.to != DUMMY_VERTEX
    }

    /// True if either endpoint is `vertex`
    #[inline]
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.from == vertex || self.to == vertex
    }

    pub fn vertices(&self) -> [VertexId; 2] {
        [self.from, self.to]
    }
}

impl fmt::Display for ArcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.from, self.to)
    }
}

/// A directed, weighted co-occurrence edge of one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arc {
    pub key: ArcKey,
    pub doc_id: DocId,
    pub position: u32, // First text position of the pair
    pub weight: f64,   // Sum of both endpoints' informative values
}

/// Per-collection statistics supplied by the weighting stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub cutoff: f64,
    pub noise: f64,
    pub stddev: f64,
}

/// An uninterrupted chain of arcs in source order.
///
/// Consecutive arcs share an endpoint (`to` of one is `from` of the next)
/// and no arc key repeats within a walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Walk {
    arcs: Vec<ArcKey>,
}

impl Walk {
    pub fn from_arcs(arcs: Vec<ArcKey>) -> Self {
        Self { arcs }
    }

    pub fn arcs(&self) -> &[ArcKey] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.arcs.iter().any(|a| a.touches(vertex))
    }

    /// Distinct vertices visited by the walk
    pub fn vertices(&self) -> BTreeSet<VertexId> {
        self.arcs.iter().flat_map(|a| a.vertices()).collect()
    }
}

/// Informative arcs and vertices chosen for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub arcs: BTreeSet<ArcKey>,
    pub vertices: BTreeSet<VertexId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }
}

/// Everything the similarity passes need to know about one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocProfile {
    pub doc_id: DocId,
    pub arcs: BTreeSet<ArcKey>,
    pub vertices: BTreeSet<VertexId>,
    pub walks: Vec<Walk>,
}

/// A document retained by the prototype pass
#[derive(Debug, Clone)]
pub struct RecallEntry {
    pub profile: DocProfile,
    pub similarity: f64, // Similarity to the prototype
}

/// Insertion-ordered map of retained documents
#[derive(Debug, Clone, Default)]
pub struct RecallMap {
    entries: Vec<RecallEntry>,
    index: HashMap<DocId, usize>,
}

impl RecallMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any earlier entry for the same document
    /// while keeping its original position.
    pub fn insert(&mut self, entry: RecallEntry) {
        let doc_id = entry.profile.doc_id;
        match self.index.get(&doc_id) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.index.insert(doc_id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, doc_id: DocId) -> Option<&RecallEntry> {
        self.index.get(&doc_id).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.index.contains_key(&doc_id)
    }

    pub fn similarity(&self, doc_id: DocId) -> Option<f64> {
        self.get(doc_id).map(|e| e.similarity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RecallEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecallEntry> {
        self.entries.iter()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.entries.iter().map(|e| e.profile.doc_id).collect()
    }
}

/// Seed of a topic: the prototype document, the query vertices, and the
/// documents to test against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRequest {
    pub prototype: DocId,
    pub query: BTreeSet<VertexId>,
    pub candidates: Vec<DocId>,
}

/// Pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdtParams {
    pub extra_arcs: usize,        // Flanking arcs per side = extra_arcs - 1
    pub arc_budget: usize,        // Cap on selected-vertex-count units per document
    pub mean_tolerance: f64,      // Slack for the mean arc weight test
    pub min_walk_len: usize,      // Minimum arcs in a walk
    pub vertex_shared: usize,     // Prototype pass: shared vertices must exceed this
    pub pair_shared: usize,       // Pairwise pass: shared vertices must exceed this
    pub sim_tolerance: f64,       // Similarities at or below this count as zero
    pub cluster_core_number: usize,
    pub facet_core_floor: usize,
    pub facet_core_scan: usize,
}

impl Default for TdtParams {
    fn default() -> Self {
        Self {
            extra_arcs: 2,
            arc_budget: 350,
            mean_tolerance: 0.001,
            min_walk_len: 3,
            vertex_shared: 3,
            pair_shared: 1,
            sim_tolerance: 0.0001,
            cluster_core_number: 2,
            facet_core_floor: 10,
            facet_core_scan: 5,
        }
    }
}

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid parameter file: {0}")]
    Json(#[from] serde_json::Error),
}

impl TdtParams {
    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Flanking arcs added on each side of a selected arc
    pub fn flank_width(&self) -> usize {
        self.extra_arcs.saturating_sub(1)
    }
}

/// A retained document and its similarity to the prototype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub similarity: f64,
}

/// Sort ranked documents by similarity (descending), ties by document id.
pub fn rank_documents(docs: &mut [RankedDoc]) {
    docs.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
}

/// Bookkeeping of the pairwise pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub candidate_count: usize,
    pub cell_count: usize,   // n(n-1)/2 over the candidates
    pub useful_cells: usize, // Cells whose similarity clears the tolerance
    pub useful_fraction: f64,
}

impl ComparisonSummary {
    pub fn new(candidate_count: usize, useful_cells: usize) -> Self {
        let cell_count = candidate_count * candidate_count.saturating_sub(1) / 2;
        let useful_fraction = if cell_count > 0 {
            useful_cells as f64 / cell_count as f64
        } else {
            0.0
        };
        Self {
            candidate_count,
            cell_count,
            useful_cells,
            useful_fraction,
        }
    }
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candidate files: {}", self.candidate_count)?;
        writeln!(f, "Matrix cells: {}", self.cell_count)?;
        write!(
            f,
            "Useful cells: {} ({:.1}%)",
            self.useful_cells,
            self.useful_fraction * 100.0
        )
    }
}

/// How far the pipeline got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// The prototype has no arc sharing a vertex with the query
    EmptyPrototype,
    /// No candidate is related to the prototype
    NoRelatedDocuments,
    /// Related documents exist but none formed a cluster
    NoClusters,
}

impl AnalysisStatus {
    pub fn message(&self) -> &'static str {
        match self {
            AnalysisStatus::Complete => "analysis complete",
            AnalysisStatus::EmptyPrototype => "prototype shares no arc with the query",
            AnalysisStatus::NoRelatedDocuments => "no document shares enough vertices with the prototype",
            AnalysisStatus::NoClusters => "no clusters could be formed",
        }
    }
}

/// Full pipeline result
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub version: String,
    pub parameters: TdtParams,
    pub prototype: DocId,
    pub query: BTreeSet<VertexId>,
    pub status: AnalysisStatus,
    pub prototype_matrix: SimilarityMatrix,
    pub matrix: SimilarityMatrix,
    pub retained: Vec<RankedDoc>,
    pub clusters: ClusterMap,
    pub summary: ComparisonSummary,
}

/// Corpus statistics
#[derive(Debug, Serialize)]
pub struct CorpusStats {
    pub total_documents: u64,
    pub total_collections: u64,
    pub total_tokens: u64,
    pub weighted_vertices: u64,
}

/// Per-document information for the `info` command
#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    pub doc_id: DocId,
    pub collection: String,
    pub token_count: usize,
    pub arc_count: usize,
    pub vertex_count: usize,
    pub mean_arc_weight: f64,
}
