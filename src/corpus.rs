//! Document graphs, vertex weights and collection statistics.
//!
//! The similarity passes read the corpus through [`CorpusView`]. [`Corpus`]
//! is the in-memory implementation; it also builds each document's
//! co-occurrence graph from its vertex sequence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

use crate::models::{Arc, ArcKey, CollectionStats, DocId, DocumentInfo, VertexId, DUMMY_VERTEX};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorpusError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),
    #[error("Document already present: {0}")]
    DuplicateDocument(DocId),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("No weight for vertex {vertex} in collection {collection}")]
    WeightNotFound { vertex: VertexId, collection: String },
    #[error("Arc {key} not found in document {doc_id}")]
    ArcNotFound { doc_id: DocId, key: ArcKey },
}

/// A token type with its informative value per collection and its
/// neighbours per document.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    pub id: VertexId,
    weights: HashMap<String, f64>,
    adjacency: HashMap<DocId, BTreeSet<VertexId>>,
}

impl Vertex {
    pub fn new(id: VertexId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn weight(&self, collection: &str) -> Option<f64> {
        self.weights.get(collection).copied()
    }

    /// Vertices adjacent to this one inside a document
    pub fn neighbors(&self, doc_id: DocId) -> Option<&BTreeSet<VertexId>> {
        self.adjacency.get(&doc_id)
    }
}

/// Co-occurrence graph of one document
#[derive(Debug, Clone)]
pub struct DocumentGraph {
    pub doc_id: DocId,
    pub collection: String,
    pub token_count: usize,
    arcs: HashMap<ArcKey, Arc>,
    positions: BTreeMap<u32, ArcKey>,
}

impl DocumentGraph {
    pub fn arc(&self, key: &ArcKey) -> Option<&Arc> {
        self.arcs.get(key)
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Arc keys in text order, one entry per occurrence
    pub fn positions(&self) -> &BTreeMap<u32, ArcKey> {
        &self.positions
    }

    pub fn arc_at(&self, position: u32) -> Option<&ArcKey> {
        self.positions.get(&position)
    }

    /// Distinct arcs ordered by their first position
    pub fn arcs_in_order(&self) -> Vec<&Arc> {
        let mut arcs: Vec<&Arc> = self.arcs.values().collect();
        arcs.sort_by_key(|a| a.position);
        arcs
    }

    /// Mean arc weight; 0 for a document without arcs.
    pub fn mean_arc_weight(&self) -> f64 {
        if self.arcs.is_empty() {
            return 0.0;
        }
        self.arcs.values().map(|a| a.weight).sum::<f64>() / self.arcs.len() as f64
    }

    pub fn vertices(&self) -> BTreeSet<VertexId> {
        vertex_ids(self.arcs.keys())
    }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            doc_id: self.doc_id,
            collection: self.collection.clone(),
            token_count: self.token_count,
            arc_count: self.arc_count(),
            vertex_count: self.vertices().len(),
            mean_arc_weight: self.mean_arc_weight(),
        }
    }
}

/// Read access to the corpus used by the similarity passes.
pub trait CorpusView: Sync {
    fn document(&self, doc_id: DocId) -> Result<&DocumentGraph, CorpusError>;

    fn vertex_weight(&self, vertex: VertexId, collection: &str) -> Result<f64, CorpusError>;

    fn collection_stats(&self, key: &str) -> Result<&CollectionStats, CorpusError>;

    fn arc_weight(&self, doc_id: DocId, key: &ArcKey) -> Result<f64, CorpusError> {
        self.document(doc_id)?
            .arc(key)
            .map(|a| a.weight)
            .ok_or(CorpusError::ArcNotFound { doc_id, key: *key })
    }

    /// Sum of the vertices' informative values in the document's collection
    fn summed_vertex_weights<'a, I>(&self, vertices: I, doc_id: DocId) -> Result<f64, CorpusError>
    where
        I: IntoIterator<Item = &'a VertexId>,
        Self: Sized,
    {
        let collection = &self.document(doc_id)?.collection;
        let mut total = 0.0;
        for &v in vertices {
            total += self.vertex_weight(v, collection)?;
        }
        Ok(total)
    }

    fn summed_arc_weights<'a, I>(&self, keys: I, doc_id: DocId) -> Result<f64, CorpusError>
    where
        I: IntoIterator<Item = &'a ArcKey>,
        Self: Sized,
    {
        let doc = self.document(doc_id)?;
        let mut total = 0.0;
        for key in keys {
            total += doc
                .arc(key)
                .map(|a| a.weight)
                .ok_or(CorpusError::ArcNotFound { doc_id, key: *key })?;
        }
        Ok(total)
    }
}

/// Vertex ids touched by a set of arc keys, dummy vertex excluded.
pub fn vertex_ids<'a, I>(keys: I) -> BTreeSet<VertexId>
where
    I: IntoIterator<Item = &'a ArcKey>,
{
    keys.into_iter()
        .flat_map(|k| k.vertices())
        .filter(|&v| v != DUMMY_VERTEX)
        .collect()
}

/// In-memory corpus
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    collections: HashMap<String, CollectionStats>,
    vertices: HashMap<VertexId, Vertex>,
    documents: BTreeMap<DocId, DocumentGraph>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, key: impl Into<String>, stats: CollectionStats) {
        self.collections.insert(key.into(), stats);
    }

    pub fn set_vertex_weight(&mut self, vertex: VertexId, collection: impl Into<String>, weight: f64) {
        self.vertices
            .entry(vertex)
            .or_insert_with(|| Vertex::new(vertex))
            .weights
            .insert(collection.into(), weight);
    }

    /// Build and store the co-occurrence graph of a document.
    ///
    /// Every adjacent pair of the sequence that is neither a self-loop nor
    /// touches the dummy vertex becomes an arc at the position of its first
    /// token. The first occurrence of a pair defines the arc; later
    /// occurrences only enter the position map. Arc weight is the sum of
    /// both endpoints' informative values in the document's collection.
    pub fn add_document(
        &mut self,
        doc_id: DocId,
        collection: &str,
        sequence: &[VertexId],
    ) -> Result<(), CorpusError> {
        if self.documents.contains_key(&doc_id) {
            return Err(CorpusError::DuplicateDocument(doc_id));
        }
        if !self.collections.contains_key(collection) {
            return Err(CorpusError::CollectionNotFound(collection.to_string()));
        }

        let mut arcs: HashMap<ArcKey, Arc> = HashMap::new();
        let mut positions = BTreeMap::new();

        for (i, pair) in sequence.windows(2).enumerate() {
            let key = ArcKey::new(pair[0], pair[1]);
            if !key.is_valid() {
                continue;
            }
            let position = i as u32;
            positions.insert(position, key);

            if arcs.contains_key(&key) {
                continue;
            }
            let mut arc = Arc {
                key,
                doc_id,
                position,
                weight: 0.0,
            };
            for v in key.vertices() {
                arc.weight += self.vertex_weight(v, collection)?;
            }
            arcs.insert(key, arc);
        }

        for key in arcs.keys() {
            for (v, other) in [(key.from, key.to), (key.to, key.from)] {
                self.vertices
                    .entry(v)
                    .or_insert_with(|| Vertex::new(v))
                    .adjacency
                    .entry(doc_id)
                    .or_default()
                    .insert(other);
            }
        }

        debug!(doc_id, arcs = arcs.len(), tokens = sequence.len(), "Built document graph");

        self.documents.insert(
            doc_id,
            DocumentGraph {
                doc_id,
                collection: collection.to_string(),
                token_count: sequence.len(),
                arcs,
                positions,
            },
        );
        Ok(())
    }

    pub fn vertex(&self, vertex: VertexId) -> Option<&Vertex> {
        self.vertices.get(&vertex)
    }

    pub fn document_ids(&self) -> Vec<DocId> {
        self.documents.keys().copied().collect()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn collections(&self) -> impl Iterator<Item = (&String, &CollectionStats)> {
        self.collections.iter()
    }

    /// Deterministic corpus for benchmarks: `documents` documents of
    /// `length` tokens in one collection, split over four topics that each
    /// draw from their own quarter of the vocabulary.
    pub fn synthetic(documents: u32, length: usize, vocabulary: u32) -> Result<Self, CorpusError> {
        let mut corpus = Corpus::new();
        corpus.add_collection("synthetic", CollectionStats::default());

        let vocabulary = vocabulary.max(4);
        let topic_size = vocabulary / 4;
        for v in 1..=vocabulary {
            corpus.set_vertex_weight(v, "synthetic", 1.0 + (v % 5) as f64 * 0.5);
        }

        for doc_id in 1..=documents {
            let base = (doc_id % 4) * topic_size;
            let sequence: Vec<VertexId> = (0..length as u32)
                .map(|i| 1 + base + (i * 7 + doc_id * 3 + i / 5) % topic_size)
                .collect();
            corpus.add_document(doc_id, "synthetic", &sequence)?;
        }
        Ok(corpus)
    }
}

impl CorpusView for Corpus {
    fn document(&self, doc_id: DocId) -> Result<&DocumentGraph, CorpusError> {
        self.documents
            .get(&doc_id)
            .ok_or(CorpusError::DocumentNotFound(doc_id))
    }

    fn vertex_weight(&self, vertex: VertexId, collection: &str) -> Result<f64, CorpusError> {
        self.vertices
            .get(&vertex)
            .and_then(|v| v.weight(collection))
            .ok_or_else(|| CorpusError::WeightNotFound {
                vertex,
                collection: collection.to_string(),
            })
    }

    fn collection_stats(&self, key: &str) -> Result<&CollectionStats, CorpusError> {
        self.collections
            .get(key)
            .ok_or_else(|| CorpusError::CollectionNotFound(key.to_string()))
    }
}
