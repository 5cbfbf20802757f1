// peerguard/src/store/mod.rs
//
// Read-only query surface the engine needs from the platform's data store.
// Implementations may hit a database, an API or an in-memory snapshot; the
// engine only ever calls these methods and never writes back.
//
// Per-entity failures should come back as EngineError::DataUnavailable so the
// calling detector can skip that entity and carry on.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::records::{CompletedReview, Profile, Submission};

pub use memory::MemoryStore;

pub trait DataStore: Send + Sync {
    fn submission(&self, id: &str) -> Result<Option<Submission>>;

    /// Submissions by `author_id`, oldest first. `since` is inclusive.
    fn submissions_by_author(
        &self,
        author_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>>;

    /// Submissions created in `[since, until]`, oldest first.
    fn submissions_in_window(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Submission>>;

    fn completed_reviews_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<CompletedReview>>;

    fn completed_reviews_for_submission(&self, submission_id: &str) -> Result<Vec<CompletedReview>>;

    /// Reviews completed in `[since, until]`, oldest first.
    fn completed_reviews_in_window(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CompletedReview>>;

    fn profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Every user who has submitted at least once.
    fn author_ids(&self) -> Result<Vec<String>>;

    /// Every user with at least one completed review.
    fn reviewer_ids(&self) -> Result<Vec<String>>;

    /// Every user with a profile.
    fn user_ids(&self) -> Result<Vec<String>>;
}
