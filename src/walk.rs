//! Walk construction over a document's selected arcs.
//!
//! A walk is a maximal run of selected arcs, in text order, where each arc
//! starts at the vertex the previous one ended on. Self-loops never become
//! arcs, so a doubled token does not interrupt a walk.

use std::collections::{BTreeSet, HashSet};

use crate::corpus::DocumentGraph;
use crate::models::{ArcKey, Walk};

/// Build the walks of a document restricted to `selected` arcs.
///
/// Runs shorter than `min_len` are dropped, except that a document with
/// fewer selected arcs than `min_len` keeps a run covering all of them.
pub fn build_walks(doc: &DocumentGraph, selected: &BTreeSet<ArcKey>, min_len: usize) -> Vec<Walk> {
    if selected.is_empty() {
        return Vec::new();
    }

    let required = min_len.min(selected.len()).max(1);
    let mut walks = Vec::new();
    let mut seen: HashSet<Vec<ArcKey>> = HashSet::new();

    let mut run: Vec<ArcKey> = Vec::new();
    let mut in_run: HashSet<ArcKey> = HashSet::new();

    let mut close_run = |run: &mut Vec<ArcKey>, in_run: &mut HashSet<ArcKey>| {
        if run.len() >= required && seen.insert(run.clone()) {
            walks.push(Walk::from_arcs(run.clone()));
        }
        run.clear();
        in_run.clear();
    };

    for key in doc.positions().values() {
        if !selected.contains(key) {
            close_run(&mut run, &mut in_run);
            continue;
        }

        let continues = run
            .last()
            .map_or(false, |prev| prev.to == key.from && !in_run.contains(key));

        if !continues {
            close_run(&mut run, &mut in_run);
        }
        run.push(*key);
        in_run.insert(*key);
    }
    close_run(&mut run, &mut in_run);

    walks
}
