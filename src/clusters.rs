//! Clustering of the retained documents around their best matches.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::kcore::{core_numbers, Adjacency};
use crate::matrix::SimilarityMatrix;
use crate::models::{rank_documents, DocId, RankedDoc};

/// Focus document -> members (focus included).
///
/// No document belongs to two clusters and no cluster is a subset of
/// another.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterMap {
    clusters: BTreeMap<DocId, BTreeSet<DocId>>,
}

impl ClusterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cluster, merging by containment.
    ///
    /// A cluster contained in an existing one is discarded (returns false);
    /// existing clusters contained in the new one are replaced by it.
    pub fn register(&mut self, focus: DocId, members: BTreeSet<DocId>) -> bool {
        if self.clusters.values().any(|existing| existing.is_superset(&members)) {
            return false;
        }
        self.clusters.retain(|_, existing| !existing.is_subset(&members));
        self.clusters.insert(focus, members);
        true
    }

    pub fn members(&self, focus: DocId) -> Option<&BTreeSet<DocId>> {
        self.clusters.get(&focus)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &BTreeSet<DocId>)> {
        self.clusters.iter().map(|(&focus, members)| (focus, members))
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn contains_doc(&self, doc_id: DocId) -> bool {
        self.focus_of(doc_id).is_some()
    }

    /// Focus of the cluster containing `doc_id`
    pub fn focus_of(&self, doc_id: DocId) -> Option<DocId> {
        self.clusters
            .iter()
            .find(|(_, members)| members.contains(&doc_id))
            .map(|(&focus, _)| focus)
    }
}

/// Clusters and the documents that ended up in one
#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    pub clusters: ClusterMap,
    /// Clustered documents in rank order
    pub retained: Vec<RankedDoc>,
}

/// Group the ranked documents around foci.
///
/// The documents are first restricted to the main core (see
/// [`CoreDecomposition::main_core`](crate::kcore::CoreDecomposition::main_core))
/// of the graph formed by the non-zero matrix cells among them. Then, in
/// rank order, each unused document gathers the unused core neighbors whose
/// best match in the whole matrix is that document.
pub fn make_cluster_map(
    matrix: &SimilarityMatrix,
    ranked: &[RankedDoc],
    core_number: usize,
) -> ClusterOutcome {
    let mut ranked = ranked.to_vec();
    rank_documents(&mut ranked);

    let candidates: BTreeSet<DocId> = ranked.iter().map(|d| d.doc_id).collect();
    let adjacency: Adjacency = candidates
        .iter()
        .map(|&doc_id| {
            let neighbors = matrix
                .neighbors(doc_id)
                .into_iter()
                .filter(|&(other, sim)| sim > 0.0 && candidates.contains(&other))
                .map(|(other, _)| other)
                .collect();
            (doc_id, neighbors)
        })
        .collect();

    let core = core_numbers(&adjacency).main_core(core_number);
    debug!(
        documents = candidates.len(),
        core = core.len(),
        "Main core of the document graph"
    );

    let mut clusters = ClusterMap::new();
    let mut used: HashSet<DocId> = HashSet::new();

    for focus in ranked.iter().map(|d| d.doc_id).filter(|id| core.contains(id)) {
        if used.contains(&focus) {
            continue;
        }
        let neighbors = match adjacency.get(&focus) {
            Some(neighbors) if !neighbors.is_empty() => neighbors,
            _ => continue,
        };

        let mut members: BTreeSet<DocId> = neighbors
            .iter()
            .copied()
            .filter(|n| core.contains(n) && !used.contains(n))
            .filter(|&n| matrix.best_match(n) == Some(focus))
            .collect();
        if members.is_empty() {
            continue;
        }

        members.insert(focus);
        used.extend(members.iter().copied());
        clusters.register(focus, members);
    }

    let retained: Vec<RankedDoc> = ranked
        .into_iter()
        .filter(|d| clusters.contains_doc(d.doc_id))
        .collect();

    if clusters.is_empty() {
        warn!(documents = candidates.len(), "No clusters formed");
    }

    ClusterOutcome { clusters, retained }
}
