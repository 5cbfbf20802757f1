// peerguard/src/detectors/rapid.rs
//
// Rapid-submission burst detector.
// Fires when an author has >= threshold submissions whose creation times
// fit in any rolling window of `rapid_submission_window_hours`.
// O(k log k) in the author's submission count (sort + two-pointer sweep).

use chrono::{DateTime, Duration, Utc};

use crate::anomaly::{Anomaly, Evidence, Subject};
use crate::config::EngineConfig;
use crate::records::Submission;

/// Largest number of timestamps inside any window of `window` length.
/// Returns (count, first, last) for the densest window.
pub fn densest_window(
    times: &[DateTime<Utc>],
    window: Duration,
) -> Option<(usize, DateTime<Utc>, DateTime<Utc>)> {
    let mut sorted = times.to_vec();
    sorted.sort();

    let mut best: Option<(usize, DateTime<Utc>, DateTime<Utc>)> = None;
    let mut start = 0usize;
    for end in 0..sorted.len() {
        while sorted[end] - sorted[start] > window {
            start += 1;
        }
        let count = end - start + 1;
        if best.map(|(c, _, _)| count > c).unwrap_or(true) {
            best = Some((count, sorted[start], sorted[end]));
        }
    }
    best
}

pub fn analyze(author_id: &str, submissions: &[Submission], cfg: &EngineConfig) -> Option<Anomaly> {
    if submissions.len() < cfg.rapid_submission_threshold {
        return None;
    }

    let times: Vec<DateTime<Utc>> = submissions.iter().map(|s| s.created_at).collect();
    let window = Duration::hours(cfg.rapid_submission_window_hours);
    let (count, first_at, last_at) = densest_window(&times, window)?;

    if count < cfg.rapid_submission_threshold {
        return None;
    }

    Some(Anomaly::new(
        vec![Subject::User(author_id.to_string())],
        Evidence::RapidSubmissions {
            author_id: author_id.to_string(),
            count,
            window_hours: cfg.rapid_submission_window_hours,
            first_at,
            last_at,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyKind, Severity};
    use crate::records::SubmissionStatus;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    fn subs(offsets_h: &[i64]) -> Vec<Submission> {
        offsets_h
            .iter()
            .enumerate()
            .map(|(i, h)| Submission {
                id: format!("s{}", i),
                author_id: "x".into(),
                authors: vec![],
                title: format!("Title {}", i),
                created_at: t0() + Duration::hours(*h),
                references: serde_json::Value::Null,
                status: SubmissionStatus::Submitted,
            })
            .collect()
    }

    #[test]
    fn five_in_a_day_fires() {
        let a = analyze("x", &subs(&[0, 2, 4, 6, 8]), &EngineConfig::default()).unwrap();
        assert_eq!(a.kind(), AnomalyKind::RapidSubmissions);
        assert_eq!(a.severity(), Severity::High);
        match a.evidence() {
            Evidence::RapidSubmissions { count, window_hours, .. } => {
                assert_eq!(*count, 5);
                assert_eq!(*window_hours, 24);
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn four_in_a_day_does_not_fire() {
        assert!(analyze("x", &subs(&[0, 2, 4, 6]), &EngineConfig::default()).is_none());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        // first and last exactly 24h apart
        assert!(analyze("x", &subs(&[0, 6, 12, 18, 24]), &EngineConfig::default()).is_some());
        assert!(analyze("x", &subs(&[0, 6, 12, 18, 25]), &EngineConfig::default()).is_none());
    }

    #[test]
    fn spread_out_history_does_not_fire() {
        let offsets: Vec<i64> = (0..10).map(|i| i * 30).collect();
        assert!(analyze("x", &subs(&offsets), &EngineConfig::default()).is_none());
    }

    #[test]
    fn reports_densest_window() {
        // 3 early, then 6 within 10 hours a week later
        let a = analyze("x", &subs(&[0, 1, 2, 200, 202, 204, 206, 208, 210]), &EngineConfig::default())
            .unwrap();
        match a.evidence() {
            Evidence::RapidSubmissions { count, first_at, last_at, .. } => {
                assert_eq!(*count, 6);
                assert_eq!(*first_at, t0() + Duration::hours(200));
                assert_eq!(*last_at, t0() + Duration::hours(210));
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn threshold_is_configurable() {
        let cfg = EngineConfig { rapid_submission_threshold: 3, ..EngineConfig::default() };
        assert!(analyze("x", &subs(&[0, 1, 2]), &cfg).is_some());
    }

    #[test]
    fn unsorted_input() {
        let (count, _, _) =
            densest_window(&[t0() + Duration::hours(5), t0(), t0() + Duration::hours(1)], Duration::hours(2))
                .unwrap();
        assert_eq!(count, 2);
        assert!(densest_window(&[], Duration::hours(1)).is_none());
    }
}
