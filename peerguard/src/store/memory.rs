// peerguard/src/store/memory.rs
//
// Concurrent in-memory DataStore.
// DashMap = sharded concurrent HashMap, so a loader can keep ingesting while
// scans read; a scan may or may not see records ingested mid-flight.
//
// Layout:
//   - Primary maps: submission / review / profile by id
//   - Per-author history: submission ids kept sorted by creation time
//   - Reverse indexes: reviewer → review ids, submission → review ids

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::records::{CompletedReview, Profile, Snapshot, Submission};
use crate::store::DataStore;

// ── Per-author history ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AuthorHistory {
    /// (created_at, submission_id), ascending.
    entries: Vec<(DateTime<Utc>, String)>,
}

impl AuthorHistory {
    fn upsert(&mut self, created_at: DateTime<Utc>, id: &str) {
        self.entries.retain(|(_, existing)| existing != id);
        let pos = self
            .entries
            .partition_point(|(ts, existing)| (*ts, existing.as_str()) <= (created_at, id));
        self.entries.insert(pos, (created_at, id.to_string()));
    }

    fn ids_since(&self, since: Option<DateTime<Utc>>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(ts, _)| since.map(|s| *ts >= s).unwrap_or(true))
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct MemoryStore {
    submissions: DashMap<String, Submission>,
    reviews:     DashMap<String, CompletedReview>,
    profiles:    DashMap<String, Profile>,

    authors:           DashMap<String, Arc<RwLock<AuthorHistory>>>,
    reviewer_idx:      DashMap<String, HashSet<String>>, // reviewer_id → review ids
    submission_reviews: DashMap<String, HashSet<String>>, // submission_id → review ids

    pub total_records: AtomicU64,
}

/// Drop `id` from the set under `key`, removing the key once empty.
fn unlink(idx: &DashMap<String, HashSet<String>>, key: &str, id: &str) {
    if let Some(mut ids) = idx.get_mut(key) {
        ids.remove(id);
    }
    idx.remove_if(key, |_, ids| ids.is_empty());
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            submissions:        DashMap::new(),
            reviews:            DashMap::new(),
            profiles:           DashMap::new(),
            authors:            DashMap::new(),
            reviewer_idx:       DashMap::new(),
            submission_reviews: DashMap::new(),
            total_records:      AtomicU64::new(0),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.load(snapshot);
        store
    }

    pub fn load(&self, snapshot: Snapshot) {
        let (n_sub, n_rev, n_prof) =
            (snapshot.submissions.len(), snapshot.reviews.len(), snapshot.profiles.len());
        for profile in snapshot.profiles {
            self.ingest_profile(profile);
        }
        for submission in snapshot.submissions {
            self.ingest_submission(submission);
        }
        for review in snapshot.reviews {
            self.ingest_review(review);
        }
        debug!("Loaded snapshot: {} submissions, {} reviews, {} profiles", n_sub, n_rev, n_prof);
    }

    pub fn ingest_submission(&self, submission: Submission) {
        self.total_records.fetch_add(1, Ordering::Relaxed);
        let previous_author = self
            .submissions
            .get(&submission.id)
            .map(|s| s.author_id.clone())
            .filter(|a| *a != submission.author_id);
        if let Some(prev) = previous_author {
            if let Some(h) = self.authors.get(&prev) {
                h.write().entries.retain(|(_, id)| *id != submission.id);
            }
        }
        let history = self
            .authors
            .entry(submission.author_id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(AuthorHistory::default())))
            .clone();
        history.write().upsert(submission.created_at, &submission.id);
        self.submissions.insert(submission.id.clone(), submission);
    }

    pub fn ingest_review(&self, review: CompletedReview) {
        self.total_records.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .reviews
            .get(&review.id)
            .map(|r| (r.reviewer_id.clone(), r.submission_id.clone()));
        if let Some((prev_reviewer, prev_submission)) = previous {
            if prev_reviewer != review.reviewer_id {
                unlink(&self.reviewer_idx, &prev_reviewer, &review.id);
            }
            if prev_submission != review.submission_id {
                unlink(&self.submission_reviews, &prev_submission, &review.id);
            }
        }
        self.reviewer_idx
            .entry(review.reviewer_id.clone())
            .or_default()
            .insert(review.id.clone());
        self.submission_reviews
            .entry(review.submission_id.clone())
            .or_default()
            .insert(review.id.clone());
        self.reviews.insert(review.id.clone(), review);
    }

    pub fn ingest_profile(&self, profile: Profile) {
        self.total_records.fetch_add(1, Ordering::Relaxed);
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    pub fn n_submissions(&self) -> usize { self.submissions.len() }
    pub fn n_reviews(&self) -> usize { self.reviews.len() }
    pub fn n_profiles(&self) -> usize { self.profiles.len() }

    fn reviews_for(&self, ids: Option<HashSet<String>>) -> Vec<CompletedReview> {
        let mut out: Vec<CompletedReview> = ids
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.reviews.get(id).map(|r| r.clone()))
            .collect();
        sort_reviews(&mut out);
        out
    }
}

impl Default for MemoryStore { fn default() -> Self { Self::new() } }

fn sort_reviews(reviews: &mut [CompletedReview]) {
    reviews.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then_with(|| a.id.cmp(&b.id)));
}

fn sort_submissions(subs: &mut [Submission]) {
    subs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn sorted_keys<V>(map: &DashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.iter().map(|e| e.key().clone()).collect();
    keys.sort();
    keys
}

impl DataStore for MemoryStore {
    fn submission(&self, id: &str) -> Result<Option<Submission>> {
        Ok(self.submissions.get(id).map(|s| s.clone()))
    }

    fn submissions_by_author(
        &self,
        author_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>> {
        let ids = match self.authors.get(author_id) {
            Some(h) => h.read().ids_since(since),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.submissions.get(id).map(|s| s.clone()))
            .collect())
    }

    fn submissions_in_window(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Submission>> {
        let mut out: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|s| s.created_at >= since && s.created_at <= until)
            .map(|s| s.clone())
            .collect();
        sort_submissions(&mut out);
        Ok(out)
    }

    fn completed_reviews_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<CompletedReview>> {
        Ok(self.reviews_for(self.reviewer_idx.get(reviewer_id).map(|ids| ids.clone())))
    }

    fn completed_reviews_for_submission(&self, submission_id: &str) -> Result<Vec<CompletedReview>> {
        Ok(self.reviews_for(self.submission_reviews.get(submission_id).map(|ids| ids.clone())))
    }

    fn completed_reviews_in_window(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CompletedReview>> {
        let mut out: Vec<CompletedReview> = self
            .reviews
            .iter()
            .filter(|r| r.completed_at >= since && r.completed_at <= until)
            .map(|r| r.clone())
            .collect();
        sort_reviews(&mut out);
        Ok(out)
    }

    fn profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    fn author_ids(&self) -> Result<Vec<String>> {
        Ok(sorted_keys(&self.authors))
    }

    fn reviewer_ids(&self) -> Result<Vec<String>> {
        Ok(sorted_keys(&self.reviewer_idx))
    }

    fn user_ids(&self) -> Result<Vec<String>> {
        Ok(sorted_keys(&self.profiles))
    }
}
