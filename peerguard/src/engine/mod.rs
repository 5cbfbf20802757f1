// peerguard/src/engine/mod.rs

pub mod dispatcher;
pub mod risk;
pub mod scan;

pub use risk::{RiskLevel, RiskScore};
pub use scan::{Findings, ScanEngine, ScanReport, Scope, SeverityCounts, SkippedEntity};
