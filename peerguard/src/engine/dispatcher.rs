// peerguard/src/engine/dispatcher.rs
//
// Writes scan findings to output JSONL files.
//   audit_log.jsonl     every anomaly, stamped with fingerprint + scope
//   review_queue.jsonl  HIGH-severity anomalies for moderator triage
//   risk_alerts.jsonl   risk scores at HIGH level
//
// The engine itself never persists anything; this is a caller-side sink.
// Records carry the anomaly fingerprint so downstream consumers can drop
// repeats across scans.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::anomaly::{Anomaly, Severity};
use crate::engine::risk::{RiskLevel, RiskScore};
use crate::engine::scan::{Scope, ScanReport};

pub const AUDIT_LOG: &str = "audit_log.jsonl";
pub const REVIEW_QUEUE: &str = "review_queue.jsonl";
pub const RISK_ALERTS: &str = "risk_alerts.jsonl";

#[derive(Serialize)]
struct FindingRecord<'a> {
    fingerprint: String,
    scope: &'a Scope,
    scanned_at: DateTime<Utc>,
    #[serde(flatten)]
    anomaly: &'a Anomaly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub audited: usize,
    pub queued: usize,
}

pub struct Dispatcher {
    out: PathBuf,
}

impl Dispatcher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let out: PathBuf = output_dir.into();
        std::fs::create_dir_all(&out)
            .with_context(|| format!("creating output directory {}", out.display()))?;
        Ok(Self { out })
    }

    pub fn output_dir(&self) -> &Path {
        &self.out
    }

    pub async fn dispatch_report(&self, report: &ScanReport) -> Result<DispatchSummary> {
        let mut audit = String::new();
        let mut queue = String::new();
        let mut summary = DispatchSummary::default();

        for anomaly in report.anomalies() {
            let record = FindingRecord {
                fingerprint: anomaly.fingerprint(),
                scope: &report.scope,
                scanned_at: report.generated_at,
                anomaly,
            };
            let line = serde_json::to_string(&record)? + "\n";
            if anomaly.severity() == Severity::High {
                queue.push_str(&line);
                summary.queued += 1;
            }
            audit.push_str(&line);
            summary.audited += 1;
        }

        if !queue.is_empty() {
            self.write(REVIEW_QUEUE, &queue).await?;
        }
        if !audit.is_empty() {
            self.write(AUDIT_LOG, &audit).await?;
        }

        info!(
            "Dispatched scope={} audited={} queued={}",
            report.scope, summary.audited, summary.queued
        );
        Ok(summary)
    }

    /// Returns true when the score was written as an alert.
    pub async fn dispatch_risk(&self, risk: &RiskScore) -> Result<bool> {
        if risk.level != RiskLevel::High {
            return Ok(false);
        }
        self.write(RISK_ALERTS, &(risk.to_jsonl() + "\n")).await?;
        info!("RISK_ALERT user={} score={:.2}", risk.user_id, risk.score);
        Ok(true)
    }

    async fn write(&self, file: &str, content: &str) -> Result<()> {
        let mut f = OpenOptions::new().create(true).append(true)
            .open(self.out.join(file)).await?;
        f.write_all(content.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{Evidence, Subject};
    use crate::engine::risk;
    use crate::engine::scan::{Findings, SeverityCounts};

    fn ring() -> Anomaly {
        Anomaly::new(
            vec![Subject::User("a".into()), Subject::User("b".into())],
            Evidence::ReviewRing { user_a: "a".into(), user_b: "b".into(), a_to_b: 3, b_to_a: 3, reciprocal_strength: 3 },
        )
    }

    fn rushed() -> Anomaly {
        Anomaly::new(
            vec![Subject::Review("r1".into())],
            Evidence::RushedReview {
                review_id: "r1".into(),
                reviewer_id: "a".into(),
                submission_id: "s1".into(),
                submission_title: Some("Title".into()),
                hours_taken: 0.5,
            },
        )
    }

    fn report(anomalies: Vec<Anomaly>) -> ScanReport {
        ScanReport {
            scope: Scope::User("a".into()),
            generated_at: Utc::now(),
            total: anomalies.len(),
            by_severity: SeverityCounts::tally(&anomalies),
            findings: Findings::Flat { anomalies },
            incomplete: vec![],
            skipped: vec![],
        }
    }

    fn lines(dir: &Path, file: &str) -> Vec<serde_json::Value> {
        std::fs::read_to_string(dir.join(file))
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn high_findings_go_to_review_queue() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Dispatcher::new(tmp.path()).unwrap();

        let summary = d.dispatch_report(&report(vec![ring(), rushed()])).await.unwrap();
        assert_eq!(summary, DispatchSummary { audited: 2, queued: 1 });

        let audit = lines(tmp.path(), AUDIT_LOG);
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0]["type"], "REVIEW_RING");
        assert_eq!(audit[0]["fingerprint"], ring().fingerprint());
        assert_eq!(audit[0]["scope"]["scope"], "user");

        let queue = lines(tmp.path(), REVIEW_QUEUE);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0]["severity"], "HIGH");
    }

    #[tokio::test]
    async fn only_high_risk_is_alerted() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Dispatcher::new(tmp.path()).unwrap();

        assert!(!d.dispatch_risk(&risk::aggregate("a", vec![ring()])).await.unwrap());
        assert!(!tmp.path().join(RISK_ALERTS).exists());

        let hot = risk::aggregate("a", vec![ring(), ring()]);
        assert_eq!(hot.level, RiskLevel::High);
        assert!(d.dispatch_risk(&hot).await.unwrap());
        assert_eq!(lines(tmp.path(), RISK_ALERTS)[0]["user_id"], "a");
    }
}
