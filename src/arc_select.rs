//! Informative arc selection.
//!
//! Each document is reduced to a bounded set of arcs that either touch the
//! query or carry at least the document's mean arc weight, plus their
//! flanking arcs. The prototype only keeps arcs touching the query.

use std::collections::BTreeSet;

use crate::corpus::{vertex_ids, CorpusError, CorpusView};
use crate::models::{Arc, DocId, DocProfile, Selection, TdtParams, VertexId, Walk};
use crate::walk::build_walks;

/// Selects informative arcs for one topic request
pub struct ArcSelector<'a, C: CorpusView> {
    corpus: &'a C,
    prototype: DocId,
    query: &'a BTreeSet<VertexId>,
    params: &'a TdtParams,
}

impl<'a, C: CorpusView> ArcSelector<'a, C> {
    pub fn new(
        corpus: &'a C,
        prototype: DocId,
        query: &'a BTreeSet<VertexId>,
        params: &'a TdtParams,
    ) -> Self {
        Self {
            corpus,
            prototype,
            query,
            params,
        }
    }

    /// Query-matched endpoints a document must accumulate to be kept.
    pub fn required_query_hits(&self) -> usize {
        let size = self.query.len();
        if size < 4 {
            size
        } else {
            size.min((size as f64 / 2.0).round() as usize)
        }
    }

    fn query_hits(&self, arc: &Arc) -> usize {
        arc.key
            .vertices()
            .iter()
            .filter(|v| self.query.contains(*v))
            .count()
    }

    /// Select the informative arcs and vertices of a document.
    ///
    /// Returns an empty selection when the document has no arcs or does
    /// not reach the query-overlap gate.
    pub fn select_arcs(&self, doc_id: DocId) -> Result<Selection, CorpusError> {
        let doc = self.corpus.document(doc_id)?;
        if doc.arc_count() == 0 {
            return Ok(Selection::default());
        }

        let is_prototype = doc_id == self.prototype;
        let mean = doc.mean_arc_weight();
        let tolerance = self.params.mean_tolerance;
        let passes = |arc: &Arc, hits: usize| {
            hits > 0 || (!is_prototype && arc.weight + tolerance >= mean)
        };

        let arcs = doc.arcs_in_order();
        let mut selected = BTreeSet::new();
        let mut query_count = 0usize;
        let mut other_count = 0usize;

        if arcs.len() < 2 * self.params.extra_arcs {
            // Short document: one passing arc pulls in all of them
            let mut any = false;
            for arc in &arcs {
                let hits = self.query_hits(arc);
                query_count += hits;
                any |= passes(*arc, hits);
            }
            if any {
                selected.extend(arcs.iter().map(|a| a.key));
            }
        } else {
            let flank = self.params.flank_width() as u32;
            for arc in &arcs {
                if query_count + other_count >= self.params.arc_budget {
                    break;
                }
                let hits = self.query_hits(arc);
                if !passes(*arc, hits) {
                    continue;
                }

                let newly = selected.insert(arc.key);
                if hits > 0 {
                    query_count += hits;
                } else if newly {
                    other_count += 1;
                }

                for offset in 1..=flank {
                    let around = [
                        arc.position.checked_sub(offset),
                        arc.position.checked_add(offset),
                    ];
                    for position in around.into_iter().flatten() {
                        if let Some(key) = doc.arc_at(position) {
                            if selected.insert(*key) {
                                other_count += 1;
                            }
                        }
                    }
                }
            }
        }

        if query_count < self.required_query_hits() {
            return Ok(Selection::default());
        }

        let vertices = vertex_ids(&selected);
        Ok(Selection {
            arcs: selected,
            vertices,
        })
    }

    /// Walks over the selected arcs of a document
    pub fn connected_arcs(
        &self,
        selection: &Selection,
        doc_id: DocId,
        min_walk_len: usize,
    ) -> Result<Vec<Walk>, CorpusError> {
        let doc = self.corpus.document(doc_id)?;
        Ok(build_walks(doc, &selection.arcs, min_walk_len))
    }

    pub fn summed_vertex_weights(
        &self,
        vertices: &BTreeSet<VertexId>,
        doc_id: DocId,
    ) -> Result<f64, CorpusError> {
        self.corpus.summed_vertex_weights(vertices, doc_id)
    }

    /// Selection plus walks, or `None` if nothing was selected.
    pub fn profile(&self, doc_id: DocId) -> Result<Option<DocProfile>, CorpusError> {
        let selection = self.select_arcs(doc_id)?;
        if selection.is_empty() {
            return Ok(None);
        }
        let walks = self.connected_arcs(&selection, doc_id, self.params.min_walk_len)?;
        Ok(Some(DocProfile {
            doc_id,
            arcs: selection.arcs,
            vertices: selection.vertices,
            walks,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::models::{ArcKey, CollectionStats};

    fn create_corpus(docs: &[(DocId, Vec<VertexId>)], weight: impl Fn(VertexId) -> f64) -> Corpus {
        let mut corpus = Corpus::new();
        corpus.add_collection("c", CollectionStats::default());
        for v in 1..=40 {
            corpus.set_vertex_weight(v, "c", weight(v));
        }
        for (id, seq) in docs {
            corpus.add_document(*id, "c", seq).unwrap();
        }
        corpus
    }

    fn query(ids: &[VertexId]) -> BTreeSet<VertexId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_required_query_hits() {
        let corpus = Corpus::new();
        let params = TdtParams::default();
        for (size, expected) in [(0, 0), (3, 3), (4, 2), (5, 3), (9, 5)] {
            let q: BTreeSet<VertexId> = (1..=size).collect();
            let selector = ArcSelector::new(&corpus, 0, &q, &params);
            assert_eq!(selector.required_query_hits(), expected as usize, "size {}", size);
        }
    }

    #[test]
    fn test_mean_filter() {
        let corpus = create_corpus(&[(1, vec![1, 2, 3, 4, 5, 6])], |v| v as f64);
        let params = TdtParams {
            extra_arcs: 1,
            ..Default::default()
        };
        let q = query(&[]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        // Arc weights 3, 5, 7, 9, 11 with mean 7
        let selection = selector.select_arcs(1).unwrap();
        let keys: Vec<ArcKey> = selection.arcs.iter().copied().collect();
        assert_eq!(
            keys,
            vec![ArcKey::new(3, 4), ArcKey::new(4, 5), ArcKey::new(5, 6)]
        );
        assert_eq!(
            selection.vertices.iter().copied().collect::<Vec<_>>(),
            vec![3, 4, 5, 6]
        );
    }

    #[test]
    fn test_prototype_only_keeps_query_arcs_and_flanks() {
        let seq = vec![1, 2, 10, 11, 12, 13, 14, 3, 4];
        let corpus = create_corpus(&[(1, seq.clone()), (2, seq)], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[1, 2, 3, 4]);
        let selector = ArcSelector::new(&corpus, 1, &q, &params);

        let proto = selector.select_arcs(1).unwrap();
        assert!(proto.arcs.contains(&ArcKey::new(10, 11))); // flank
        assert!(!proto.arcs.contains(&ArcKey::new(11, 12)));
        assert!(!proto.arcs.contains(&ArcKey::new(12, 13)));
        assert_eq!(proto.arcs.len(), 6);

        // Same text as an ordinary document: every arc meets the mean
        let ordinary = selector.select_arcs(2).unwrap();
        assert_eq!(ordinary.arcs.len(), 8);
    }

    #[test]
    fn test_budget_cap() {
        let seq: Vec<VertexId> = (1..=30).collect();
        let corpus = create_corpus(&[(1, seq)], |_| 1.0);
        let params = TdtParams {
            arc_budget: 5,
            ..Default::default()
        };
        let q = query(&[]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        let selection = selector.select_arcs(1).unwrap();
        assert_eq!(selection.arcs.len(), 5);
        assert!(selection.arcs.contains(&ArcKey::new(5, 6)));
        assert!(!selection.arcs.contains(&ArcKey::new(6, 7)));
    }

    #[test]
    fn test_query_gate_rejects_unrelated() {
        let corpus = create_corpus(&[(1, vec![1, 10, 11, 12, 13, 14])], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[1, 2, 3, 4, 5]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        assert!(selector.select_arcs(1).unwrap().is_empty());
        assert!(selector.profile(1).unwrap().is_none());
    }

    #[test]
    fn test_short_document_selects_everything() {
        // Three arcs with extra_arcs = 2: fewer than 2 * extra_arcs
        let corpus = create_corpus(&[(1, vec![1, 2, 3, 4])], |v| if v == 1 { 5.0 } else { 1.0 });
        let params = TdtParams::default();
        let q = query(&[]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        // Only 1*2 meets the mean on its own
        let selection = selector.select_arcs(1).unwrap();
        assert_eq!(selection.arcs.len(), 3);
    }

    #[test]
    fn test_short_prototype_without_query_match() {
        let corpus = create_corpus(&[(1, vec![1, 2, 3])], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[20]);
        let selector = ArcSelector::new(&corpus, 1, &q, &params);

        assert!(selector.select_arcs(1).unwrap().is_empty());
    }

    #[test]
    fn test_document_without_arcs() {
        let corpus = create_corpus(&[(1, vec![7])], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[7]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        assert!(selector.select_arcs(1).unwrap().is_empty());
    }

    #[test]
    fn test_profile_includes_walks() {
        let seq: Vec<VertexId> = (1..=8).collect();
        let corpus = create_corpus(&[(1, seq)], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[2, 3]);
        let selector = ArcSelector::new(&corpus, 99, &q, &params);

        let profile = selector.profile(1).unwrap().unwrap();
        assert_eq!(profile.arcs.len(), 7);
        assert_eq!(profile.walks.len(), 1);
        assert_eq!(profile.walks[0].len(), 7);
        assert!((selector.summed_vertex_weights(&profile.vertices, 1).unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_document() {
        let corpus = create_corpus(&[], |_| 1.0);
        let params = TdtParams::default();
        let q = query(&[]);
        let selector = ArcSelector::new(&corpus, 1, &q, &params);
        assert_eq!(
            selector.select_arcs(5).unwrap_err(),
            CorpusError::DocumentNotFound(5)
        );
    }
}
