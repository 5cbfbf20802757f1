// peerguard/src/lib.rs
//
// Peerguard: anomaly and fraud detection for peer-review platforms.
//
// Read-only analysis over a DataStore. Seven detectors cover author-side
// abuse (rapid submissions, self-citation, duplicate titles, fabricated
// accounts), reviewer-side abuse (biased and rushed reviews) and review
// rings. Results are immutable Anomaly records; per-user risk is a capped
// severity-weighted sum.

pub mod anomaly;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod records;
pub mod store;

pub use anomaly::{Anomaly, AnomalyKind, Detector, Evidence, Severity, Subject};
pub use config::EngineConfig;
pub use engine::{RiskLevel, RiskScore, ScanEngine, ScanReport, Scope};
pub use error::{EngineError, Result};
pub use store::{DataStore, MemoryStore};
