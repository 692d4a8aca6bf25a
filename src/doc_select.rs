//! Prototype pass: find the candidates related to a topic's prototype.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::arc_select::ArcSelector;
use crate::corpus::{CorpusError, CorpusView};
use crate::matrix::{DocNode, SimilarityMatrix};
use crate::models::{DocId, DocProfile, RecallEntry, RecallMap, TdtParams, TopicRequest};
use crate::similarity::{score_pair, shared_vertices, PairScore};

/// Documents retained by the prototype pass
#[derive(Debug, Clone, Default)]
pub struct PrototypeSelection {
    /// Profile of the prototype, `None` if it shares no arc with the query
    pub prototype_profile: Option<DocProfile>,
    pub recall: RecallMap,
    /// Prototype-candidate cells
    pub matrix: SimilarityMatrix,
}

enum Candidate {
    Prototype,
    Unrelated,
    Scored(DocProfile, PairScore),
}

/// Compare every candidate of `request` with its prototype.
///
/// Candidates are profiled and scored in parallel, then assembled in
/// candidate order. A candidate that is the prototype itself is recorded
/// with similarity 1.0 and no matrix cell.
pub fn find_similar_docs<C: CorpusView>(
    corpus: &C,
    request: &TopicRequest,
    params: &TdtParams,
) -> Result<PrototypeSelection, CorpusError> {
    let selector = ArcSelector::new(corpus, request.prototype, &request.query, params);

    let prototype = match selector.profile(request.prototype)? {
        Some(profile) => profile,
        None => {
            warn!(
                prototype = request.prototype,
                query_size = request.query.len(),
                "Prototype has no arcs touching the query"
            );
            return Ok(PrototypeSelection::default());
        }
    };
    debug!(
        prototype = prototype.doc_id,
        arcs = prototype.arcs.len(),
        walks = prototype.walks.len(),
        "Prototype profiled"
    );

    let outcomes: Vec<Candidate> = request
        .candidates
        .par_iter()
        .map(|&doc_id| score_candidate(corpus, &selector, &prototype, doc_id, params))
        .collect::<Result<_, _>>()?;

    let mut selection = PrototypeSelection {
        prototype_profile: None,
        recall: RecallMap::new(),
        matrix: SimilarityMatrix::new(),
    };

    for outcome in outcomes {
        match outcome {
            Candidate::Prototype => selection.recall.insert(RecallEntry {
                profile: prototype.clone(),
                similarity: 1.0,
            }),
            Candidate::Unrelated => {}
            Candidate::Scored(profile, score) => {
                let node = DocNode::from_score(prototype.doc_id, profile.doc_id, score);
                let similarity = node.similarity();
                selection.matrix.add(node);
                if similarity > params.sim_tolerance {
                    selection.recall.insert(RecallEntry {
                        profile,
                        similarity,
                    });
                }
            }
        }
    }

    info!(
        prototype = prototype.doc_id,
        candidates = request.candidates.len(),
        retained = selection.recall.len(),
        "Prototype pass complete"
    );

    selection.prototype_profile = Some(prototype);
    Ok(selection)
}

fn score_candidate<C: CorpusView>(
    corpus: &C,
    selector: &ArcSelector<'_, C>,
    prototype: &DocProfile,
    doc_id: DocId,
    params: &TdtParams,
) -> Result<Candidate, CorpusError> {
    if doc_id == prototype.doc_id {
        return Ok(Candidate::Prototype);
    }
    let profile = match selector.profile(doc_id)? {
        Some(profile) => profile,
        None => return Ok(Candidate::Unrelated),
    };

    let shared = shared_vertices(prototype, &profile);
    if shared.len() <= params.vertex_shared {
        return Ok(Candidate::Unrelated);
    }

    let score = score_pair(corpus, prototype, &profile, shared)?;
    if score.sim_w <= params.sim_tolerance {
        return Ok(Candidate::Unrelated);
    }
    Ok(Candidate::Scored(profile, score))
}
