//! Sparse symmetric document similarity matrix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::models::{DocId, VertexId};
use crate::similarity::PairScore;

/// Similarity cell of an unordered document pair.
///
/// The pair is stored normalized (`row < column`), so a node built from
/// `(a, b)` equals one built from `(b, a)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    row: DocId,
    column: DocId,
    sim_v: f64,
    sim_w: f64,
    alpha: f64,
    shared_vertices: BTreeSet<VertexId>,
    shared_facets: BTreeSet<u32>,
}

impl DocNode {
    pub fn new(
        a: DocId,
        b: DocId,
        sim_v: f64,
        sim_w: f64,
        alpha: f64,
        shared_vertices: BTreeSet<VertexId>,
    ) -> Self {
        let (row, column) = if a <= b { (a, b) } else { (b, a) };
        Self {
            row,
            column,
            sim_v,
            sim_w,
            alpha,
            shared_vertices,
            shared_facets: BTreeSet::new(),
        }
    }

    pub fn from_score(a: DocId, b: DocId, score: PairScore) -> Self {
        Self::new(a, b, score.sim_v, score.sim_w, score.alpha, score.shared)
    }

    pub fn with_shared_facets(mut self, facets: BTreeSet<u32>) -> Self {
        self.shared_facets = facets;
        self
    }

    pub fn row(&self) -> DocId {
        self.row
    }

    pub fn column(&self) -> DocId {
        self.column
    }

    pub fn sim_v(&self) -> f64 {
        self.sim_v
    }

    pub fn sim_w(&self) -> f64 {
        self.sim_w
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        1.0 - self.alpha
    }

    pub fn similarity(&self) -> f64 {
        self.sim_v * (self.alpha + self.beta() * self.sim_w)
    }

    pub fn shared_vertices(&self) -> &BTreeSet<VertexId> {
        &self.shared_vertices
    }

    pub fn shared_facets(&self) -> &BTreeSet<u32> {
        &self.shared_facets
    }

    /// The other document of the pair, if `doc_id` is one of them
    pub fn other(&self, doc_id: DocId) -> Option<DocId> {
        if self.row == doc_id {
            Some(self.column)
        } else if self.column == doc_id {
            Some(self.row)
        } else {
            None
        }
    }
}

#[inline]
fn pair_key(a: DocId, b: DocId) -> (DocId, DocId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Sparse list of non-zero cells, indexed by both endpoints, with running
/// statistics over the stored similarities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilarityMatrix {
    nodes: Vec<DocNode>,
    #[serde(skip)]
    index: HashMap<(DocId, DocId), usize>,
    #[serde(skip)]
    by_doc: HashMap<DocId, Vec<usize>>,
    sum: f64,
    sum_sq: f64,
    count: usize,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell. Returns false (and keeps the existing cell) if the pair
    /// is already present or is a diagonal cell.
    pub fn add(&mut self, node: DocNode) -> bool {
        if node.row == node.column {
            return false;
        }
        let key = (node.row, node.column);
        if self.index.contains_key(&key) {
            return false;
        }

        let sim = node.similarity();
        self.sum += sim;
        self.sum_sq += sim * sim;
        self.count += 1;

        let idx = self.nodes.len();
        self.index.insert(key, idx);
        self.by_doc.entry(node.row).or_default().push(idx);
        self.by_doc.entry(node.column).or_default().push(idx);
        self.nodes.push(node);
        true
    }

    pub fn get(&self, a: DocId, b: DocId) -> Option<&DocNode> {
        self.index.get(&pair_key(a, b)).map(|&idx| &self.nodes[idx])
    }

    /// Similarity of a pair, 0 when no cell exists
    pub fn similarity(&self, a: DocId, b: DocId) -> f64 {
        self.get(a, b).map(|n| n.similarity()).unwrap_or(0.0)
    }

    /// Every document sharing a cell with `doc_id`, by ascending id
    pub fn neighbors(&self, doc_id: DocId) -> Vec<(DocId, f64)> {
        let mut result: Vec<(DocId, f64)> = self
            .by_doc
            .get(&doc_id)
            .map(|idxs| {
                idxs.iter()
                    .filter_map(|&idx| {
                        let node = &self.nodes[idx];
                        node.other(doc_id).map(|other| (other, node.similarity()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(|&(id, _)| id);
        result
    }

    /// The single highest-similarity partner of `doc_id`.
    ///
    /// Ties go to the lower document id. Cells with zero similarity are
    /// not matches.
    pub fn best_match(&self, doc_id: DocId) -> Option<DocId> {
        let mut best: Option<(DocId, f64)> = None;
        for (other, sim) in self.neighbors(doc_id) {
            if sim <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_sim)) if sim <= best_sim => {}
                _ => best = Some((other, sim)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn nodes(&self) -> &[DocNode] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Documents appearing in at least one cell
    pub fn documents(&self) -> BTreeSet<DocId> {
        self.by_doc.keys().copied().collect()
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Population standard deviation of the stored similarities
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

impl Extend<DocNode> for SimilarityMatrix {
    fn extend<I: IntoIterator<Item = DocNode>>(&mut self, iter: I) {
        for node in iter {
            self.add(node);
        }
    }
}
