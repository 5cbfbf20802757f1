// peerguard/src/detectors/self_citation.rs
//
// Excessive self-citation detector.
// A reference is a self-citation when any of its authors is also an author
// of the citing submission (names compared case/whitespace-insensitively).
// Fires on >= min_references_for_check references AND rate > threshold.
// The rate comparison is strict: exactly 30% does not fire at the default.

use std::collections::HashSet;

use crate::anomaly::{Anomaly, Evidence, Subject};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::records::{normalize_name, Submission};

/// (self_citations, total_references) for a submission.
pub fn self_citation_counts(submission: &Submission) -> Result<(usize, usize)> {
    let references = submission.parsed_references()?;
    let own: HashSet<String> = submission
        .authors
        .iter()
        .map(|a| normalize_name(a))
        .filter(|a| !a.is_empty())
        .collect();

    let self_count = references
        .iter()
        .filter(|r| r.authors.iter().any(|a| own.contains(&normalize_name(a))))
        .count();
    Ok((self_count, references.len()))
}

pub fn analyze(submission: &Submission, cfg: &EngineConfig) -> Result<Option<Anomaly>> {
    let (self_count, total) = self_citation_counts(submission)?;
    if total < cfg.min_references_for_check {
        return Ok(None);
    }

    let rate = self_count as f64 / total as f64;
    if rate <= cfg.high_self_citation_threshold {
        return Ok(None);
    }

    Ok(Some(Anomaly::new(
        vec![Subject::Submission(submission.id.clone())],
        Evidence::ExcessiveSelfCitations {
            submission_id: submission.id.clone(),
            author_id: submission.author_id.clone(),
            self_citations: self_count,
            total_references: total,
            rate: (rate * 10000.0).round() / 10000.0,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyKind, Severity};
    use crate::error::EngineError;
    use crate::records::SubmissionStatus;
    use chrono::Utc;
    use serde_json::json;

    fn with_refs(self_refs: usize, other_refs: usize) -> Submission {
        let mut refs = Vec::new();
        for i in 0..self_refs {
            refs.push(json!({ "title": format!("own {}", i), "authors": ["Grace  HOPPER", "Someone Else"] }));
        }
        for i in 0..other_refs {
            refs.push(json!({ "title": format!("other {}", i), "authors": ["Alan Turing"] }));
        }
        Submission {
            id: "sub".into(),
            author_id: "u-grace".into(),
            authors: vec!["Grace Hopper".into(), "Co Author".into()],
            title: "Compilers".into(),
            created_at: Utc::now(),
            references: serde_json::Value::Array(refs),
            status: SubmissionStatus::Submitted,
        }
    }

    #[test]
    fn thirty_percent_does_not_fire() {
        assert!(analyze(&with_refs(3, 7), &EngineConfig::default()).unwrap().is_none());
    }

    #[test]
    fn forty_percent_fires() {
        let a = analyze(&with_refs(4, 6), &EngineConfig::default()).unwrap().unwrap();
        assert_eq!(a.kind(), AnomalyKind::ExcessiveSelfCitations);
        assert_eq!(a.severity(), Severity::Medium);
        match a.evidence() {
            Evidence::ExcessiveSelfCitations { self_citations, total_references, rate, author_id, .. } => {
                assert_eq!(*self_citations, 4);
                assert_eq!(*total_references, 10);
                assert!((rate - 0.40).abs() < 1e-12);
                assert_eq!(author_id, "u-grace");
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn too_few_references_skipped() {
        // 100% self-citation but only 9 references
        assert!(analyze(&with_refs(9, 0), &EngineConfig::default()).unwrap().is_none());
    }

    #[test]
    fn malformed_references_propagate() {
        let mut s = with_refs(0, 0);
        s.references = json!({ "oops": true });
        assert!(matches!(
            analyze(&s, &EngineConfig::default()),
            Err(EngineError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn counts_each_reference_once() {
        assert_eq!(self_citation_counts(&with_refs(2, 3)).unwrap(), (2, 5));
    }
}
