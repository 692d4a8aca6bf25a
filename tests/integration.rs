//! Integration tests for tdt-graph.
//!
//! These tests verify the end-to-end functionality of the topic detection pipeline.

use rusqlite::Connection;
use std::collections::BTreeSet;

use tdt_graph::analysis::analyze;
use tdt_graph::arc_select::ArcSelector;
use tdt_graph::corpus::{Corpus, CorpusView};
use tdt_graph::db::{
    create_schema, load_corpus_from_connection, store_collection, store_document,
    store_vertex_weight,
};
use tdt_graph::doc_compare::doc_similarity;
use tdt_graph::doc_select::find_similar_docs;
use tdt_graph::kcore::{core_numbers, Adjacency};
use tdt_graph::models::{
    AnalysisStatus, CollectionStats, DocId, RecallEntry, RecallMap, TdtParams, TopicRequest,
    VertexId,
};
use tdt_graph::output::{write_clusters_csv, write_json, write_matrix_csv};

/// Two topics of four documents each plus one unrelated document.
///
/// Topic A draws from vertices 1..=20, topic B from 40..=60, the outlier
/// from 80..=90. Documents of a topic share long stretches of text.
const DOCUMENTS: &[(DocId, &[VertexId])] = &[
    (1, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
    (2, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 13, 14, 15]),
    (3, &[2, 3, 4, 5, 6, 7, 8, 16, 17, 18, 19, 20]),
    (4, &[1, 2, 3, 4, 5, 6, 10, 11, 12, 13, 14, 15]),
    (5, &[40, 41, 42, 43, 44, 45, 46, 47, 48, 49]),
    (6, &[40, 41, 42, 43, 44, 45, 46, 50, 51, 52]),
    (7, &[40, 41, 42, 50, 51, 52, 53, 54, 55, 56]),
    (8, &[40, 41, 42, 43, 44, 56, 57, 58, 59, 60]),
    (9, &[80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90]),
];

fn vertex_weight(v: VertexId) -> f64 {
    1.0 + (v % 3) as f64 * 0.5
}

fn create_corpus() -> Corpus {
    let mut corpus = Corpus::new();
    corpus.add_collection("news", CollectionStats::default());
    for v in 1..=90 {
        corpus.set_vertex_weight(v, "news", vertex_weight(v));
    }
    for (doc_id, sequence) in DOCUMENTS {
        corpus.add_document(*doc_id, "news", sequence).unwrap();
    }
    corpus
}

fn create_database() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    create_schema(&conn).unwrap();
    store_collection(&conn, "news", &CollectionStats::default()).unwrap();
    for v in 1..=90 {
        store_vertex_weight(&conn, v, "news", vertex_weight(v)).unwrap();
    }
    for (doc_id, sequence) in DOCUMENTS {
        store_document(&conn, *doc_id, "news", sequence).unwrap();
    }
    conn
}

fn topic_a_request() -> TopicRequest {
    TopicRequest {
        prototype: 1,
        query: [2, 3, 4, 5].into_iter().collect(),
        candidates: (1..=9).collect(),
    }
}

#[test]
fn test_full_pipeline_finds_topic() {
    let corpus = create_corpus();
    let result = analyze(&corpus, &topic_a_request(), &TdtParams::default(), false).unwrap();

    assert_eq!(result.status, AnalysisStatus::Complete);
    assert!(!result.clusters.is_empty());

    // Nothing from the other topic or the outlier is retained
    for doc in &result.retained {
        assert!(doc.doc_id <= 4, "unexpected document {}", doc.doc_id);
    }
    assert!(result.prototype_matrix.get(1, 9).is_none());
    assert!(result.prototype_matrix.get(1, 5).is_none());

    // Retained documents are exactly the clustered ones, in rank order
    for pair in result.retained.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for doc in &result.retained {
        assert!(result.clusters.contains_doc(doc.doc_id));
    }
}

#[test]
fn test_sqlite_round_trip_matches_in_memory() {
    let conn = create_database();
    let loaded = load_corpus_from_connection(&conn).unwrap();
    let built = create_corpus();

    assert_eq!(loaded.document_ids(), built.document_ids());
    for doc_id in built.document_ids() {
        let a = loaded.document(doc_id).unwrap();
        let b = built.document(doc_id).unwrap();
        assert_eq!(a.positions(), b.positions());
        assert!((a.mean_arc_weight() - b.mean_arc_weight()).abs() < 1e-12);
    }

    let params = TdtParams::default();
    let from_db = analyze(&loaded, &topic_a_request(), &params, false).unwrap();
    let in_memory = analyze(&built, &topic_a_request(), &params, false).unwrap();
    assert_eq!(from_db.clusters, in_memory.clusters);
    assert_eq!(from_db.retained, in_memory.retained);
}

#[test]
fn test_pipeline_is_deterministic() {
    let corpus = create_corpus();
    let params = TdtParams::default();
    let first = analyze(&corpus, &topic_a_request(), &params, false).unwrap();
    let second = analyze(&corpus, &topic_a_request(), &params, false).unwrap();

    assert_eq!(first.matrix.nodes(), second.matrix.nodes());
    assert_eq!(first.clusters, second.clusters);
}

#[test]
fn test_disjoint_documents_produce_no_cell() {
    let corpus = create_corpus();
    let params = TdtParams::default();
    let query = BTreeSet::new();
    let selector = ArcSelector::new(&corpus, 0, &query, &params);

    let mut recall = RecallMap::new();
    for doc_id in [1, 9] {
        recall.insert(RecallEntry {
            profile: selector.profile(doc_id).unwrap().unwrap(),
            similarity: 0.5,
        });
    }

    let comparison = doc_similarity(&corpus, &recall, &params, false, None).unwrap();
    assert!(comparison.matrix.is_empty());
    assert!(comparison.matrix.get(1, 9).is_none());
}

#[test]
fn test_document_identical_to_prototype() {
    let mut corpus = create_corpus();
    corpus.add_document(10, "news", DOCUMENTS[4].1).unwrap();

    let request = TopicRequest {
        prototype: 5,
        query: DOCUMENTS[4].1.iter().copied().collect(),
        candidates: vec![10],
    };
    let selection = find_similar_docs(&corpus, &request, &TdtParams::default()).unwrap();

    let node = selection.matrix.get(5, 10).unwrap();
    assert!((node.sim_v() - 1.0).abs() < 1e-9);
    assert!((node.sim_w() - 1.0).abs() < 1e-9);
    assert!((node.similarity() - 1.0).abs() < 1e-9);
}

#[test]
fn test_cycle_and_star_cores() {
    let mut cycle = Adjacency::new();
    for (a, b) in [(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)] {
        cycle.entry(a).or_default().insert(b);
    }
    let cores = core_numbers(&cycle);
    assert!((1..=5).all(|v| cores.core(v) == Some(2)));

    let mut star = Adjacency::new();
    star.insert(1, (2..=5).collect());
    let cores = core_numbers(&star);
    assert!((1..=5).all(|v| cores.core(v) == Some(1)));
}

#[test]
fn test_short_document_selects_every_arc() {
    let mut corpus = create_corpus();
    // Three arcs; 12*15 falls below the mean weight
    corpus.add_document(20, "news", &[9, 10, 12, 15]).unwrap();

    let params = TdtParams::default();
    let query = BTreeSet::new();
    let selector = ArcSelector::new(&corpus, 0, &query, &params);
    let selection = selector.select_arcs(20).unwrap();

    assert_eq!(selection.arcs.len(), 3);
    assert_eq!(selection.vertices.len(), 4);
}

#[test]
fn test_outputs_render() {
    let corpus = create_corpus();
    let result = analyze(&corpus, &topic_a_request(), &TdtParams::default(), false).unwrap();

    let mut json = Vec::new();
    write_json(&result, &mut json).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value["status"], "complete");
    assert_eq!(value["prototype"], 1);

    let mut matrix_csv = Vec::new();
    write_matrix_csv(&result.matrix, &mut matrix_csv).unwrap();
    assert_eq!(
        String::from_utf8(matrix_csv).unwrap().lines().count(),
        result.matrix.len() + 1
    );

    let mut clusters_csv = Vec::new();
    write_clusters_csv(&result.clusters, &result.retained, &mut clusters_csv).unwrap();
    assert_eq!(
        String::from_utf8(clusters_csv).unwrap().lines().count(),
        result.retained.len() + 1
    );
}
