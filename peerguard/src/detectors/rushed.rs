// peerguard/src/detectors/rushed.rs
//
// Rushed review detector: a completed review that took less than
// `rushed_review_hours` from acceptance (or invitation) to completion.

use crate::anomaly::{Anomaly, Evidence, Subject};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::records::CompletedReview;

pub fn analyze(
    review: &CompletedReview,
    submission_title: Option<&str>,
    cfg: &EngineConfig,
) -> Result<Option<Anomaly>> {
    let hours = review.hours_taken()?;
    if hours >= cfg.rushed_review_hours {
        return Ok(None);
    }

    Ok(Some(Anomaly::new(
        vec![Subject::Review(review.id.clone())],
        Evidence::RushedReview {
            review_id: review.id.clone(),
            reviewer_id: review.reviewer_id.clone(),
            submission_id: review.submission_id.clone(),
            submission_title: submission_title.map(str::to_string),
            hours_taken: (hours * 100.0).round() / 100.0,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyKind;
    use crate::records::Recommendation;
    use chrono::{Duration, TimeZone, Utc};

    fn review(minutes: i64) -> CompletedReview {
        let invited = Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap();
        CompletedReview {
            id: "r1".into(),
            reviewer_id: "rev".into(),
            submission_id: "s1".into(),
            recommendation: Recommendation::Accept,
            invited_at: invited,
            accepted_at: None,
            completed_at: invited + Duration::minutes(minutes),
        }
    }

    #[test]
    fn twenty_minutes_is_rushed() {
        let a = analyze(&review(20), Some("On Sorting"), &EngineConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(a.kind(), AnomalyKind::RushedReview);
        assert!(a.implicates("rev"));
        assert!(a.description().contains("On Sorting"));
        match a.evidence() {
            Evidence::RushedReview { hours_taken, .. } => assert!((hours_taken - 0.33).abs() < 1e-9),
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn one_hour_is_not_rushed() {
        assert!(analyze(&review(60), None, &EngineConfig::default()).unwrap().is_none());
        assert!(analyze(&review(600), None, &EngineConfig::default()).unwrap().is_none());
    }

    #[test]
    fn completion_before_start_is_malformed() {
        assert!(analyze(&review(-5), None, &EngineConfig::default()).is_err());
    }
}
