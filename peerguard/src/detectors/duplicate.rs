// peerguard/src/detectors/duplicate.rs
//
// Duplicate-content detector.
// Compares titles only within one author's history: O(k²) per author
// instead of O(n²) over the corpus. Similarity must strictly exceed
// duplicate_similarity_threshold.
//
// One canonical anomaly per unordered pair. Subjects are ordered
// (earlier-created, later-created), ties broken by id, so a pair yields
// the same record whichever submission the scan started from.

use std::collections::HashSet;

use crate::anomaly::{Anomaly, Evidence, Subject};
use crate::config::EngineConfig;
use crate::detectors::similarity::{jaccard, token_set};
use crate::records::Submission;

fn canonical<'a>(a: &'a Submission, b: &'a Submission) -> (&'a Submission, &'a Submission) {
    if (a.created_at, &a.id) <= (b.created_at, &b.id) { (a, b) } else { (b, a) }
}

fn pair_anomaly(a: &Submission, b: &Submission, similarity: f64) -> Anomaly {
    let (first, second) = canonical(a, b);
    Anomaly::new(
        vec![
            Subject::Submission(first.id.clone()),
            Subject::Submission(second.id.clone()),
        ],
        Evidence::DuplicateContent {
            author_id: first.author_id.clone(),
            submission_a: first.id.clone(),
            submission_b: second.id.clone(),
            title_a: first.title.clone(),
            title_b: second.title.clone(),
            similarity: (similarity * 10000.0).round() / 10000.0,
        },
    )
}

/// Every qualifying pair within one author's submissions.
pub fn analyze_author(submissions: &[Submission], cfg: &EngineConfig) -> Vec<Anomaly> {
    let sets: Vec<HashSet<String>> = submissions.iter().map(|s| token_set(&s.title)).collect();
    let mut out = Vec::new();

    for i in 0..submissions.len() {
        for j in (i + 1)..submissions.len() {
            if submissions[i].id == submissions[j].id {
                continue;
            }
            let sim = jaccard(&sets[i], &sets[j]);
            if sim > cfg.duplicate_similarity_threshold {
                out.push(pair_anomaly(&submissions[i], &submissions[j], sim));
            }
        }
    }
    out
}

/// Pairs between `target` and the rest of its author's submissions.
pub fn analyze_submission(
    target: &Submission,
    history: &[Submission],
    cfg: &EngineConfig,
) -> Vec<Anomaly> {
    let target_set = token_set(&target.title);
    history
        .iter()
        .filter(|other| other.id != target.id)
        .filter_map(|other| {
            let sim = jaccard(&target_set, &token_set(&other.title));
            (sim > cfg.duplicate_similarity_threshold).then(|| pair_anomaly(target, other, sim))
        })
        .collect()
}
