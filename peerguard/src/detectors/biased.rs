// peerguard/src/detectors/biased.rs
//
// Biased reviewer detector.
// With >= min_reviews_for_pattern completed reviews, a reviewer whose
// ACCEPT share or REJECT share exceeds suspicious_rate_threshold is flagged.
// Revision recommendations count toward the total only.

use crate::anomaly::{Anomaly, BiasDirection, Evidence, Subject};
use crate::config::EngineConfig;
use crate::records::{CompletedReview, Recommendation};

pub fn analyze(reviewer_id: &str, reviews: &[CompletedReview], cfg: &EngineConfig) -> Option<Anomaly> {
    let total = reviews.len();
    if total < cfg.min_reviews_for_pattern {
        return None;
    }

    let accepts = reviews.iter().filter(|r| r.recommendation == Recommendation::Accept).count();
    let rejects = reviews.iter().filter(|r| r.recommendation == Recommendation::Reject).count();
    let accept_rate = accepts as f64 / total as f64;
    let reject_rate = rejects as f64 / total as f64;

    let (direction, rate) = if accept_rate > cfg.suspicious_rate_threshold {
        (BiasDirection::Accepts, accept_rate)
    } else if reject_rate > cfg.suspicious_rate_threshold {
        (BiasDirection::Rejects, reject_rate)
    } else {
        return None;
    };

    Some(Anomaly::new(
        vec![Subject::User(reviewer_id.to_string())],
        Evidence::BiasedReviewer {
            reviewer_id: reviewer_id.to_string(),
            direction,
            rate: (rate * 10000.0).round() / 10000.0,
            total_reviews: total,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyKind;
    use chrono::Utc;

    fn reviews(recs: &[(Recommendation, usize)]) -> Vec<CompletedReview> {
        let now = Utc::now();
        recs.iter()
            .flat_map(|(rec, n)| std::iter::repeat(*rec).take(*n))
            .enumerate()
            .map(|(i, rec)| CompletedReview {
                id: format!("r{}", i),
                reviewer_id: "rev".into(),
                submission_id: format!("s{}", i),
                recommendation: rec,
                invited_at: now,
                accepted_at: None,
                completed_at: now,
            })
            .collect()
    }

    #[test]
    fn always_accepts_fires() {
        let a = analyze("rev", &reviews(&[(Recommendation::Accept, 12)]), &EngineConfig::default())
            .unwrap();
        assert_eq!(a.kind(), AnomalyKind::BiasedReviewerAccepts);
    }

    #[test]
    fn always_rejects_fires() {
        let rs = reviews(&[(Recommendation::Reject, 19), (Recommendation::MajorRevision, 1)]);
        let a = analyze("rev", &rs, &EngineConfig::default()).unwrap();
        assert_eq!(a.kind(), AnomalyKind::BiasedReviewerRejects);
        match a.evidence() {
            Evidence::BiasedReviewer { rate, total_reviews, .. } => {
                assert!((rate - 0.95).abs() < 1e-12);
                assert_eq!(*total_reviews, 20);
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn ninety_percent_exactly_does_not_fire() {
        let rs = reviews(&[(Recommendation::Accept, 9), (Recommendation::Reject, 1)]);
        assert!(analyze("rev", &rs, &EngineConfig::default()).is_none());
    }

    #[test]
    fn too_few_reviews() {
        let rs = reviews(&[(Recommendation::Accept, 9)]);
        assert!(analyze("rev", &rs, &EngineConfig::default()).is_none());
    }

    #[test]
    fn minor_revisions_are_not_accepts() {
        let rs = reviews(&[(Recommendation::Accept, 5), (Recommendation::MinorRevision, 7)]);
        assert!(analyze("rev", &rs, &EngineConfig::default()).is_none());
    }
}
