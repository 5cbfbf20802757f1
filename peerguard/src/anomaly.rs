// peerguard/src/anomaly.rs
//
// Detection output types.
//
// An Anomaly is built once from its typed evidence and never changes:
// kind, severity, description and recommendation are all derived from the
// evidence variant, so two anomalies with equal evidence are equal. Nothing
// here carries a timestamp or id; repeated scans produce identical records
// and deduplication is left to the caller (see `fingerprint`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Severity ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

// ── Kind ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    RapidSubmissions,
    ExcessiveSelfCitations,
    DuplicateContent,
    BotAccount,
    BiasedReviewerAccepts,
    BiasedReviewerRejects,
    RushedReview,
    ReviewRing,
}

/// Which partition of a full-scope report an anomaly belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Author,
    Reviewer,
    Ring,
}

impl AnomalyKind {
    /// Severity is fixed per kind, never computed.
    pub fn severity(self) -> Severity {
        match self {
            Self::RapidSubmissions
            | Self::DuplicateContent
            | Self::BotAccount
            | Self::ReviewRing => Severity::High,
            Self::ExcessiveSelfCitations
            | Self::BiasedReviewerAccepts
            | Self::BiasedReviewerRejects
            | Self::RushedReview => Severity::Medium,
        }
    }

    pub fn category(self) -> Category {
        match self {
            Self::RapidSubmissions
            | Self::ExcessiveSelfCitations
            | Self::DuplicateContent
            | Self::BotAccount => Category::Author,
            Self::BiasedReviewerAccepts | Self::BiasedReviewerRejects | Self::RushedReview => {
                Category::Reviewer
            }
            Self::ReviewRing => Category::Ring,
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RapidSubmissions => write!(f, "RAPID_SUBMISSIONS"),
            Self::ExcessiveSelfCitations => write!(f, "EXCESSIVE_SELF_CITATIONS"),
            Self::DuplicateContent => write!(f, "DUPLICATE_CONTENT"),
            Self::BotAccount => write!(f, "BOT_ACCOUNT"),
            Self::BiasedReviewerAccepts => write!(f, "BIASED_REVIEWER_ACCEPTS"),
            Self::BiasedReviewerRejects => write!(f, "BIASED_REVIEWER_REJECTS"),
            Self::RushedReview => write!(f, "RUSHED_REVIEW"),
            Self::ReviewRing => write!(f, "REVIEW_RING"),
        }
    }
}

// ── Detectors ─────────────────────────────────────────────────────────────────

/// Detector identity, used to annotate incomplete scans and skipped entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    RapidSubmissions,
    SelfCitation,
    DuplicateContent,
    BotAccount,
    BiasedReviewer,
    RushedReview,
    ReviewRing,
}

impl std::fmt::Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RapidSubmissions => write!(f, "rapid_submissions"),
            Self::SelfCitation => write!(f, "self_citation"),
            Self::DuplicateContent => write!(f, "duplicate_content"),
            Self::BotAccount => write!(f, "bot_account"),
            Self::BiasedReviewer => write!(f, "biased_reviewer"),
            Self::RushedReview => write!(f, "rushed_review"),
            Self::ReviewRing => write!(f, "review_ring"),
        }
    }
}

// ── Subjects ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum Subject {
    User(String),
    Submission(String),
    Review(String),
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Self::User(id) | Self::Submission(id) | Self::Review(id) => id,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Submission(id) => write!(f, "submission:{}", id),
            Self::Review(id) => write!(f, "review:{}", id),
        }
    }
}

// ── Evidence ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasDirection {
    Accepts,
    Rejects,
}

impl std::fmt::Display for BiasDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepts => write!(f, "accepts"),
            Self::Rejects => write!(f, "rejects"),
        }
    }
}

/// Weighted contributions behind a bot-account score. Each field is the
/// weight actually added (0 when the component did not fire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotComponents {
    pub generic_email: f64,
    pub missing_bio: f64,
    pub missing_affiliation: f64,
    pub submission_rate: f64,
    pub submissions: usize,
    pub account_age_days: f64,
}

/// Strongly typed evidence, one variant per detector. Serialized as the
/// anomaly's `metrics` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evidence {
    RapidSubmissions {
        author_id: String,
        count: usize,
        window_hours: i64,
        first_at: DateTime<Utc>,
        last_at: DateTime<Utc>,
    },
    ExcessiveSelfCitations {
        submission_id: String,
        author_id: String,
        self_citations: usize,
        total_references: usize,
        rate: f64,
    },
    DuplicateContent {
        author_id: String,
        submission_a: String,
        submission_b: String,
        title_a: String,
        title_b: String,
        similarity: f64,
    },
    BotAccount {
        user_id: String,
        score: f64,
        components: BotComponents,
    },
    BiasedReviewer {
        reviewer_id: String,
        direction: BiasDirection,
        rate: f64,
        total_reviews: usize,
    },
    RushedReview {
        review_id: String,
        reviewer_id: String,
        submission_id: String,
        submission_title: Option<String>,
        hours_taken: f64,
    },
    ReviewRing {
        user_a: String,
        user_b: String,
        a_to_b: u32,
        b_to_a: u32,
        reciprocal_strength: u32,
    },
}

impl Evidence {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Self::RapidSubmissions { .. } => AnomalyKind::RapidSubmissions,
            Self::ExcessiveSelfCitations { .. } => AnomalyKind::ExcessiveSelfCitations,
            Self::DuplicateContent { .. } => AnomalyKind::DuplicateContent,
            Self::BotAccount { .. } => AnomalyKind::BotAccount,
            Self::BiasedReviewer { direction: BiasDirection::Accepts, .. } => {
                AnomalyKind::BiasedReviewerAccepts
            }
            Self::BiasedReviewer { direction: BiasDirection::Rejects, .. } => {
                AnomalyKind::BiasedReviewerRejects
            }
            Self::RushedReview { .. } => AnomalyKind::RushedReview,
            Self::ReviewRing { .. } => AnomalyKind::ReviewRing,
        }
    }

    /// User ids this evidence counts against.
    pub fn implicated_users(&self) -> Vec<&str> {
        match self {
            Self::RapidSubmissions { author_id, .. }
            | Self::ExcessiveSelfCitations { author_id, .. }
            | Self::DuplicateContent { author_id, .. } => vec![author_id.as_str()],
            Self::BotAccount { user_id, .. } => vec![user_id.as_str()],
            Self::BiasedReviewer { reviewer_id, .. } | Self::RushedReview { reviewer_id, .. } => {
                vec![reviewer_id.as_str()]
            }
            Self::ReviewRing { user_a, user_b, .. } => vec![user_a.as_str(), user_b.as_str()],
        }
    }

    fn description(&self) -> String {
        match self {
            Self::RapidSubmissions { author_id, count, window_hours, .. } => format!(
                "Author {} created {} submissions within {} hours",
                author_id, count, window_hours
            ),
            Self::ExcessiveSelfCitations { submission_id, self_citations, total_references, rate, .. } => format!(
                "Submission {} cites its own authors in {} of {} references ({:.0}%)",
                submission_id, self_citations, total_references, rate * 100.0
            ),
            Self::DuplicateContent { submission_a, submission_b, similarity, .. } => format!(
                "Submissions {} and {} by the same author have {:.0}% similar titles",
                submission_a, submission_b, similarity * 100.0
            ),
            Self::BotAccount { user_id, score, .. } => format!(
                "Account {} matches automated-account heuristics (score {:.2})",
                user_id, score
            ),
            Self::BiasedReviewer { reviewer_id, direction, rate, total_reviews } => format!(
                "Reviewer {} {} {:.0}% of {} completed reviews",
                reviewer_id, direction, rate * 100.0, total_reviews
            ),
            Self::RushedReview { review_id, submission_title, hours_taken, .. } => format!(
                "Review {} of \"{}\" was completed in {:.2} hours",
                review_id,
                submission_title.as_deref().unwrap_or("unknown submission"),
                hours_taken
            ),
            Self::ReviewRing { user_a, user_b, reciprocal_strength, .. } => format!(
                "Users {} and {} gave each other at least {} favorable reviews",
                user_a, user_b, reciprocal_strength
            ),
        }
    }

    fn recommendation(&self) -> String {
        match self {
            Self::RapidSubmissions { .. } => {
                "Review the author's recent submissions for spam or salami slicing".into()
            }
            Self::ExcessiveSelfCitations { .. } => {
                "Ask the authors to justify self-citations before review".into()
            }
            Self::DuplicateContent { .. } => {
                "Compare both manuscripts for duplicate or recycled content".into()
            }
            Self::BotAccount { .. } => {
                "Verify the account's identity and institutional affiliation".into()
            }
            Self::BiasedReviewer { .. } => {
                "Audit the reviewer's recent decisions and consider rebalancing assignments".into()
            }
            Self::RushedReview { .. } => {
                "Check the review for substance; consider requesting a second review".into()
            }
            Self::ReviewRing { .. } => {
                "Avoid assigning these users to each other's submissions and audit past reviews"
                    .into()
            }
        }
    }
}

// ── Anomaly ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    kind: AnomalyKind,
    severity: Severity,
    #[serde(rename = "subject_refs")]
    subjects: Vec<Subject>,
    #[serde(rename = "metrics")]
    evidence: Evidence,
    description: String,
    recommendation: String,
}

impl Anomaly {
    pub fn new(subjects: Vec<Subject>, evidence: Evidence) -> Self {
        let kind = evidence.kind();
        Self {
            kind,
            severity: kind.severity(),
            subjects,
            description: evidence.description(),
            recommendation: evidence.recommendation(),
            evidence,
        }
    }

    pub fn kind(&self) -> AnomalyKind { self.kind }
    pub fn severity(&self) -> Severity { self.severity }
    pub fn category(&self) -> Category { self.kind.category() }
    pub fn subjects(&self) -> &[Subject] { &self.subjects }
    pub fn evidence(&self) -> &Evidence { &self.evidence }
    pub fn description(&self) -> &str { &self.description }
    pub fn recommendation(&self) -> &str { &self.recommendation }

    pub fn implicated_users(&self) -> Vec<&str> {
        self.evidence.implicated_users()
    }

    pub fn implicates(&self, user_id: &str) -> bool {
        self.implicated_users().contains(&user_id)
    }

    pub fn involves(&self, subject: &Subject) -> bool {
        self.subjects.contains(subject)
    }

    /// SHA256[:8] over kind, subjects and evidence. Stable across scans, so
    /// callers can use it to deduplicate repeated detections.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let canonical = serde_json::to_string(&(&self.kind, &self.subjects, &self.evidence))
            .unwrap_or_default();
        let mut h = Sha256::new();
        h.update(canonical.as_bytes());
        hex::encode(&h.finalize()[..8])
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(a: &str, b: &str) -> Anomaly {
        Anomaly::new(
            vec![Subject::User(a.into()), Subject::User(b.into())],
            Evidence::ReviewRing {
                user_a: a.into(),
                user_b: b.into(),
                a_to_b: 3,
                b_to_a: 4,
                reciprocal_strength: 3,
            },
        )
    }

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn kind_and_severity_follow_evidence() {
        let a = Anomaly::new(
            vec![Subject::User("r1".into())],
            Evidence::BiasedReviewer {
                reviewer_id: "r1".into(),
                direction: BiasDirection::Rejects,
                rate: 0.95,
                total_reviews: 20,
            },
        );
        assert_eq!(a.kind(), AnomalyKind::BiasedReviewerRejects);
        assert_eq!(a.severity(), Severity::Medium);
        assert_eq!(a.category(), Category::Reviewer);
        assert!(a.description().contains("rejects 95% of 20"));
    }

    #[test]
    fn ring_implicates_both_members() {
        let a = ring("alice", "bob");
        assert_eq!(a.severity(), Severity::High);
        assert!(a.implicates("alice"));
        assert!(a.implicates("bob"));
        assert!(!a.implicates("carol"));
    }

    #[test]
    fn fingerprint_is_content_derived() {
        assert_eq!(ring("a", "b").fingerprint(), ring("a", "b").fingerprint());
        assert_ne!(ring("a", "b").fingerprint(), ring("a", "c").fingerprint());
        assert_eq!(ring("a", "b").fingerprint().len(), 16);
    }

    #[test]
    fn serializes_with_wire_names() {
        let v: serde_json::Value = serde_json::from_str(&ring("a", "b").to_jsonl()).unwrap();
        assert_eq!(v["type"], "REVIEW_RING");
        assert_eq!(v["severity"], "HIGH");
        assert_eq!(v["subject_refs"][0]["entity"], "user");
        assert_eq!(v["subject_refs"][1]["id"], "b");
        assert_eq!(v["metrics"]["reciprocal_strength"], 3);
    }
}
