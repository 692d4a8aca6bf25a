//! Similarity measures shared by the prototype and pairwise passes.
//!
//! Two components are combined per document pair:
//! - vertex overlap (`sim_v`): Dice over the informative weight of the
//!   shared vertices,
//! - walk overlap (`sim_w`): Dice over the weight of the walks that the
//!   shared vertices connect on each side.
//!
//! `alpha` is the share of the evidence carried by vertices alone.

use std::collections::BTreeSet;

use crate::corpus::{CorpusError, CorpusView};
use crate::models::{DocId, DocProfile, VertexId, Walk};

/// Dice coefficient `2 * common / denominator`, clamped to `[0, 1]`.
///
/// Returns 0 when the denominator is not positive.
#[inline]
pub fn sim_measure(common: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 || common <= 0.0 {
        return 0.0;
    }
    (2.0 * common / denominator).min(1.0)
}

/// Half the absolute difference of two sizes.
///
/// Added to a Dice denominator so that unbalanced splits (0 + 10) score
/// lower than balanced ones (5 + 5).
#[inline]
pub fn skew_normalize(a: f64, b: f64) -> f64 {
    (a - b).abs() / 2.0
}

/// Weight of the walks reached by a set of shared vertices
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeakConnection {
    /// Full arc weight of every walk touching a shared vertex
    pub connection: f64,
    /// Informative value of the shared endpoints inside those walks
    pub weak_vertex_weight: f64,
}

/// Aggregate the walks of `doc_id` that contain any shared vertex.
///
/// Each qualifying walk contributes its arc-weight sum once. Every arc
/// endpoint of a qualifying walk that is a shared vertex contributes its
/// informative value to `weak_vertex_weight`.
pub fn weakly_connected<C: CorpusView>(
    corpus: &C,
    shared: &BTreeSet<VertexId>,
    walks: &[Walk],
    doc_id: DocId,
) -> Result<WeakConnection, CorpusError> {
    let doc = corpus.document(doc_id)?;
    let mut result = WeakConnection::default();

    for walk in walks {
        if !shared.iter().any(|&v| walk.contains_vertex(v)) {
            continue;
        }
        result.connection += corpus.summed_arc_weights(walk.arcs(), doc_id)?;
        for key in walk.arcs() {
            for v in key.vertices() {
                if shared.contains(&v) {
                    result.weak_vertex_weight += corpus.vertex_weight(v, &doc.collection)?;
                }
            }
        }
    }

    Ok(result)
}

/// Raw similarity components of a document pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub shared: BTreeSet<VertexId>,
    pub sim_v: f64,
    pub sim_w: f64,
    pub alpha: f64,
    pub connect_a: WeakConnection,
    pub connect_b: WeakConnection,
}

impl PairScore {
    /// `sim_v * (alpha + beta * sim_w)` with `beta = 1 - alpha`
    pub fn similarity(&self) -> f64 {
        self.sim_v * (self.alpha + (1.0 - self.alpha) * self.sim_w)
    }
}

/// Shared vertices of two profiles
pub fn shared_vertices(a: &DocProfile, b: &DocProfile) -> BTreeSet<VertexId> {
    a.vertices.intersection(&b.vertices).copied().collect()
}

/// Score two profiles over a precomputed shared vertex set.
///
/// The shared weight is the geometric mean of the shared vertices' summed
/// weight in each side's collection, so the score does not depend on
/// argument order.
pub fn score_pair<C: CorpusView>(
    corpus: &C,
    a: &DocProfile,
    b: &DocProfile,
    shared: BTreeSet<VertexId>,
) -> Result<PairScore, CorpusError> {
    let shared_a = corpus.summed_vertex_weights(&shared, a.doc_id)?;
    let shared_b = corpus.summed_vertex_weights(&shared, b.doc_id)?;
    let shared_weight = (shared_a * shared_b).sqrt();

    let total_a = corpus.summed_vertex_weights(&a.vertices, a.doc_id)?;
    let total_b = corpus.summed_vertex_weights(&b.vertices, b.doc_id)?;
    let sim_v = sim_measure(
        shared_weight,
        total_a + total_b + skew_normalize(total_a, total_b),
    );

    let connect_a = weakly_connected(corpus, &shared, &a.walks, a.doc_id)?;
    let connect_b = weakly_connected(corpus, &shared, &b.walks, b.doc_id)?;
    let (c1, c2) = (connect_a.connection, connect_b.connection);
    let weak = (connect_a.weak_vertex_weight * connect_b.weak_vertex_weight).sqrt();
    let sim_w = sim_measure(weak, c1 + c2 + skew_normalize(c1, c2));

    let alpha = sim_measure(shared_weight, 2.0 * shared_weight + c1 + c2);

    Ok(PairScore {
        shared,
        sim_v,
        sim_w,
        alpha,
        connect_a,
        connect_b,
    })
}
