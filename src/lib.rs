//! Graph-based Topic Detection and Tracking Library
//!
//! Every document is a token co-occurrence graph. Documents are reduced to
//! their informative arcs and walks, compared against a prototype and then
//! pairwise, and the related documents are clustered on the main core of
//! the resulting similarity graph.
//!
//! # Example
//!
//! ```no_run
//! use tdt_graph::prelude::*;
//! use std::path::Path;
//!
//! let corpus = load_corpus(Path::new("corpus.db")).unwrap();
//! let params = TdtParams::default();
//!
//! let request = TopicRequest {
//!     prototype: 230,
//!     query: [17, 42, 311].into_iter().collect(),
//!     candidates: corpus.document_ids(),
//! };
//!
//! let result = analyze(&corpus, &request, &params, false).unwrap();
//! println!("{}", result.status.message());
//! for (focus, members) in result.clusters.iter() {
//!     println!("{}: {:?}", focus, members);
//! }
//! ```
//!
//! # Facet cores
//!
//! ```
//! use tdt_graph::kcore::{core_numbers, Adjacency};
//!
//! let mut graph = Adjacency::new();
//! for (a, b) in [(1, 2), (2, 3), (3, 1), (3, 4)] {
//!     graph.entry(a).or_default().insert(b);
//! }
//! let cores = core_numbers(&graph);
//! assert_eq!(cores.max_core(), 2);
//! assert_eq!(cores.main_core(1).len(), 3);
//! ```

pub mod analysis;
pub mod arc_select;
pub mod clusters;
pub mod corpus;
pub mod db;
pub mod doc_compare;
pub mod doc_select;
pub mod kcore;
pub mod matrix;
pub mod models;
pub mod output;
pub mod similarity;
pub mod walk;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analysis::{analyze, analyze_with_cancel, AnalysisError};
    pub use crate::arc_select::ArcSelector;
    pub use crate::clusters::{make_cluster_map, ClusterMap, ClusterOutcome};
    pub use crate::corpus::{vertex_ids, Corpus, CorpusError, CorpusView, DocumentGraph, Vertex};
    pub use crate::db::{
        create_schema, load_corpus, load_corpus_from_connection, load_corpus_stats,
        load_document_ids, load_document_vertices, store_collection, store_document,
        store_vertex_weight, DbError,
    };
    pub use crate::doc_compare::{doc_similarity, PairwiseComparison};
    pub use crate::doc_select::{find_similar_docs, PrototypeSelection};
    pub use crate::kcore::{core_numbers, facet_core, Adjacency, CoreDecomposition};
    pub use crate::matrix::{DocNode, SimilarityMatrix};
    pub use crate::models::{
        rank_documents, AnalysisResult, AnalysisStatus, Arc, ArcKey, CollectionStats,
        ComparisonSummary, CorpusStats, DocId, DocProfile, DocumentInfo, ParamsError, RankedDoc,
        RecallEntry, RecallMap, Selection, TdtParams, TopicRequest, VertexId, Walk,
    };
    pub use crate::output::{
        format_cluster, format_node, print_clusters, print_summary, write_clusters_csv,
        write_clusters_csv_file, write_json, write_json_file, write_matrix_csv,
        write_matrix_csv_file, OutputError,
    };
    pub use crate::similarity::{
        score_pair, shared_vertices, sim_measure, skew_normalize, weakly_connected, PairScore,
        WeakConnection,
    };
    pub use crate::walk::build_walks;
}

// Re-export commonly used types at the crate root
pub use models::{AnalysisResult, AnalysisStatus, TdtParams, TopicRequest};
