// peerguard/src/engine/risk.rs
//
// Per-user risk aggregation.
//
// Each anomaly that implicates the user contributes a fixed weight by
// severity; the sum is capped at 1.0:
//   HIGH    0.4
//   MEDIUM  0.2
//   LOW     0.1
//
// Levels: HIGH ≥ 0.7, MEDIUM ≥ 0.4, LOW otherwise.
//
// Weights are held in tenths and summed as integers so the same anomaly set
// always yields bit-identical scores, whatever order it arrives in.

use serde::{Deserialize, Serialize};

use crate::anomaly::{Anomaly, Severity};

const WEIGHTS: &[(Severity, u32)] = &[
    (Severity::High,   4),
    (Severity::Medium, 2),
    (Severity::Low,    1),
];

const SCALE:        u32 = 10;
const HIGH_CUT:     u32 = 7;
const MEDIUM_CUT:   u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
    pub user_id: String,
    pub score: f64,
    pub level: RiskLevel,
    pub anomaly_count: usize,
    pub contributing_anomalies: Vec<Anomaly>,
}

impl RiskScore {
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn tenths(severity: Severity) -> u32 {
    WEIGHTS.iter().find(|(s, _)| *s == severity).map(|(_, w)| *w).unwrap_or(0)
}

pub fn severity_weight(severity: Severity) -> f64 {
    tenths(severity) as f64 / SCALE as f64
}

fn level_for_tenths(t: u32) -> RiskLevel {
    if t >= HIGH_CUT {
        RiskLevel::High
    } else if t >= MEDIUM_CUT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Folds anomalies into a score. Anomalies that do not implicate `user_id`
/// are dropped before weighting.
pub fn aggregate(user_id: &str, anomalies: Vec<Anomaly>) -> RiskScore {
    let contributing: Vec<Anomaly> = anomalies.into_iter().filter(|a| a.implicates(user_id)).collect();
    let total: u32 = contributing
        .iter()
        .map(|a| tenths(a.severity()))
        .fold(0u32, |acc, w| acc.saturating_add(w))
        .min(SCALE);

    RiskScore {
        user_id: user_id.to_string(),
        score: total as f64 / SCALE as f64,
        level: level_for_tenths(total),
        anomaly_count: contributing.len(),
        contributing_anomalies: contributing,
    }
}
