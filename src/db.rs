//! SQLite storage for corpus.db
//!
//! Schema:
//! - `collections(key, cutoff, noise, stddev)`
//! - `vertex_weights(vertex_id, collection, weight)`
//! - `documents(id, collection, vertex_ids)` where `vertex_ids` is a
//!   little-endian `u32` array

use crate::corpus::{Corpus, CorpusError};
use crate::models::{CollectionStats, CorpusStats, DocId, VertexId};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),
    #[error("Invalid vertex blob size")]
    InvalidVertexBlob,
}

/// Pack vertex ids as a little-endian u32 array
pub fn pack_vertex_ids(ids: &[VertexId]) -> Vec<u8> {
    ids.iter().flat_map(|id| id.to_le_bytes()).collect()
}

/// Unpack a little-endian u32 array
pub fn unpack_vertex_ids(blob: &[u8]) -> Result<Vec<VertexId>, DbError> {
    // Validate blob size is multiple of 4
    if blob.len() % 4 != 0 {
        return Err(DbError::InvalidVertexBlob);
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Create the corpus tables if they do not exist
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS collections (
             key TEXT PRIMARY KEY,
             cutoff REAL NOT NULL,
             noise REAL NOT NULL,
             stddev REAL NOT NULL
         );
         CREATE TABLE IF NOT EXISTS vertex_weights (
             vertex_id INTEGER NOT NULL,
             collection TEXT NOT NULL,
             weight REAL NOT NULL,
             PRIMARY KEY (vertex_id, collection)
         );
         CREATE TABLE IF NOT EXISTS documents (
             id INTEGER PRIMARY KEY,
             collection TEXT NOT NULL,
             vertex_ids BLOB NOT NULL
         );",
    )?;
    Ok(())
}

pub fn store_collection(conn: &Connection, key: &str, stats: &CollectionStats) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO collections (key, cutoff, noise, stddev) VALUES (?1, ?2, ?3, ?4)",
        params![key, stats.cutoff, stats.noise, stats.stddev],
    )?;
    Ok(())
}

pub fn store_vertex_weight(
    conn: &Connection,
    vertex_id: VertexId,
    collection: &str,
    weight: f64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO vertex_weights (vertex_id, collection, weight) VALUES (?1, ?2, ?3)",
        params![vertex_id, collection, weight],
    )?;
    Ok(())
}

pub fn store_document(
    conn: &Connection,
    doc_id: DocId,
    collection: &str,
    vertex_ids: &[VertexId],
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO documents (id, collection, vertex_ids) VALUES (?1, ?2, ?3)",
        params![doc_id, collection, pack_vertex_ids(vertex_ids)],
    )?;
    Ok(())
}

/// Open an existing corpus.db; a missing file is an IO error
fn open_existing(db_path: &Path) -> Result<Connection, DbError> {
    if !db_path.exists() {
        return Err(DbError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("corpus database not found: {}", db_path.display()),
        )));
    }
    Ok(Connection::open(db_path)?)
}

/// Load the full corpus from corpus.db
pub fn load_corpus(db_path: &Path) -> Result<Corpus, DbError> {
    let conn = open_existing(db_path)?;
    load_corpus_from_connection(&conn)
}

/// Load the full corpus from an open connection.
///
/// Collections and vertex weights are read first so that arc weights can
/// be set while each document graph is built.
pub fn load_corpus_from_connection(conn: &Connection) -> Result<Corpus, DbError> {
    let mut corpus = Corpus::new();

    let mut stmt = conn.prepare("SELECT key, cutoff, noise, stddev FROM collections")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let stats = CollectionStats {
            cutoff: row.get(1)?,
            noise: row.get(2)?,
            stddev: row.get(3)?,
        };
        corpus.add_collection(key, stats);
    }

    let mut stmt = conn.prepare("SELECT vertex_id, collection, weight FROM vertex_weights")?;
    let mut rows = stmt.query([])?;
    let mut weight_count = 0usize;
    while let Some(row) = rows.next()? {
        let vertex_id: VertexId = row.get(0)?;
        let collection: String = row.get(1)?;
        let weight: f64 = row.get(2)?;
        corpus.set_vertex_weight(vertex_id, collection, weight);
        weight_count += 1;
    }
    debug!(weights = weight_count, "Loaded vertex weights");

    let mut stmt = conn.prepare("SELECT id, collection, vertex_ids FROM documents ORDER BY id")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let doc_id: DocId = row.get(0)?;
        let collection: String = row.get(1)?;
        let blob: Vec<u8> = row.get(2)?;
        let vertex_ids = unpack_vertex_ids(&blob)?;
        corpus.add_document(doc_id, &collection, &vertex_ids)?;
    }

    info!(
        documents = corpus.document_count(),
        collections = corpus.collections().count(),
        "Loaded corpus"
    );
    Ok(corpus)
}

/// Load corpus statistics
pub fn load_corpus_stats(db_path: &Path) -> Result<CorpusStats, DbError> {
    let conn = open_existing(db_path)?;
    corpus_stats(&conn)
}

fn corpus_stats(conn: &Connection) -> Result<CorpusStats, DbError> {
    let total_documents: u64 =
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

    let total_collections: u64 =
        conn.query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;

    let total_tokens: u64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(vertex_ids) / 4), 0) FROM documents",
        [],
        |row| row.get(0),
    )?;

    let weighted_vertices: u64 = conn.query_row(
        "SELECT COUNT(DISTINCT vertex_id) FROM vertex_weights",
        [],
        |row| row.get(0),
    )?;

    Ok(CorpusStats {
        total_documents,
        total_collections,
        total_tokens,
        weighted_vertices,
    })
}

/// All document ids in ascending order
pub fn load_document_ids(db_path: &Path) -> Result<Vec<DocId>, DbError> {
    let conn = open_existing(db_path)?;
    document_ids(&conn)
}

fn document_ids(conn: &Connection) -> Result<Vec<DocId>, DbError> {
    let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<DocId>>>()?;
    Ok(ids)
}

/// Vertex sequence of a single document
pub fn load_document_vertices(conn: &Connection, doc_id: DocId) -> Result<Vec<VertexId>, DbError> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT vertex_ids FROM documents WHERE id = ?",
            [doc_id],
            |row| row.get(0),
        )
        .optional()?;

    match blob {
        Some(blob) => unpack_vertex_ids(&blob),
        None => Err(DbError::DocumentNotFound(doc_id)),
    }
}
