// peerguard/src/records.rs
//
// Read-only entities supplied by the platform's data store.
// The engine never mutates any of these; they arrive either through a
// DataStore implementation or a JSON snapshot loaded by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ── Submissions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Draft,
    #[default]
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Published,
    Withdrawn,
}

/// One bibliography entry of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    /// User id of the submitting author.
    pub author_id: String,
    /// Author names as printed on the manuscript.
    #[serde(default)]
    pub authors: Vec<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Bibliography exactly as stored upstream. Parsed lazily so one bad
    /// record only costs the detectors that need it.
    #[serde(default)]
    pub references: serde_json::Value,
    #[serde(default)]
    pub status: SubmissionStatus,
}

impl Submission {
    /// Parse the stored reference list. A missing list is empty; anything
    /// other than an array of reference objects is malformed.
    pub fn parsed_references(&self) -> Result<Vec<Reference>> {
        match &self.references {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(_) => serde_json::from_value(self.references.clone())
                .map_err(|e| EngineError::unavailable(format!("submission {}", self.id), e)),
            other => Err(EngineError::unavailable(
                format!("submission {}", self.id),
                format!("reference list is not an array: {}", json_kind(other)),
            )),
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Case- and whitespace-insensitive form of a person's name, used when
/// matching reference authors against submission authors.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Reviews ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl Recommendation {
    /// Favorable outcomes feed the review sentiment graph.
    pub fn is_favorable(self) -> bool {
        matches!(self, Self::Accept | Self::MinorRevision)
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "ACCEPT"),
            Self::MinorRevision => write!(f, "MINOR_REVISION"),
            Self::MajorRevision => write!(f, "MAJOR_REVISION"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// A completed review joined with its assignment timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedReview {
    pub id: String,
    pub reviewer_id: String,
    pub submission_id: String,
    pub recommendation: Recommendation,
    pub invited_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

impl CompletedReview {
    /// Hours between the reviewer taking the assignment and completing it.
    /// Uses the acceptance time when tracked, otherwise the invitation.
    pub fn hours_taken(&self) -> Result<f64> {
        let start = self.accepted_at.unwrap_or(self.invited_at);
        let secs = (self.completed_at - start).num_seconds();
        if secs < 0 {
            return Err(EngineError::unavailable(
                format!("review {}", self.id),
                "completed before it was started",
            ));
        }
        Ok(secs as f64 / 3600.0)
    }
}

// ── Accounts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    pub account_created_at: DateTime<Utc>,
}

impl Profile {
    pub fn has_bio(&self) -> bool {
        self.bio.as_deref().map(|b| !b.trim().is_empty()).unwrap_or(false)
    }

    pub fn has_affiliation(&self) -> bool {
        self.affiliation.as_deref().map(|a| !a.trim().is_empty()).unwrap_or(false)
    }

    /// Local part of the email address, lowercased. Empty when malformed.
    pub fn email_local_part(&self) -> String {
        match self.email.split_once('@') {
            Some((local, _)) => local.trim().to_lowercase(),
            None => String::new(),
        }
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// A point-in-time export of everything the engine reads. This is the input
/// format of the CLI and the easiest way to seed a MemoryStore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub reviews: Vec<CompletedReview>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}
