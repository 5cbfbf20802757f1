// peerguard/src/engine/scan.rs
//
// Scan orchestrator.
//
// Every call is a fresh computation over whatever the store returns right
// now; nothing is cached between scans and nothing is written back.
//
//   Scope::All         every detector family on its own blocking task,
//                        joined and merged; results partitioned into
//                        author / reviewer / ring lists
//   Scope::Submission  self-citation, duplicates of that submission,
//                        rushed reviews of it
//   Scope::Reviewer    biased pattern, rushed reviews, rings
//   Scope::User        everything that can implicate the user
//
// Failure isolation: an entity that cannot be read is skipped and listed in
// `skipped`; a detector whose top-level query fails (or that panics) is
// listed in `incomplete` and the rest of the scan still completes.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anomaly::{Anomaly, Category, Detector, Severity};
use crate::config::EngineConfig;
use crate::detectors::bot::EmailClassifier;
use crate::detectors::ring::{FavorableEdge, SentimentGraph};
use crate::detectors::{biased, bot, duplicate, rapid, ring, rushed, self_citation};
use crate::engine::risk::{self, RiskScore};
use crate::error::{EngineError, Result};
use crate::records::{CompletedReview, Submission};
use crate::store::DataStore;

// ── Scope ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Scope {
    All,
    Submission(String),
    Reviewer(String),
    User(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Submission(id) => write!(f, "submission:{}", id),
            Self::Reviewer(id) => write!(f, "reviewer:{}", id),
            Self::User(id) => write!(f, "user:{}", id),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected all | submission:ID | reviewer:ID | user:ID, got {:?}", s))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(format!("missing id in scope {:?}", s));
        }
        match kind.trim().to_lowercase().as_str() {
            "submission" => Ok(Self::Submission(id.to_string())),
            "reviewer" => Ok(Self::Reviewer(id.to_string())),
            "user" => Ok(Self::User(id.to_string())),
            other => Err(format!("unknown scope kind {:?}", other)),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(anomalies: impl IntoIterator<Item = &'a Anomaly>) -> Self {
        let mut c = Self::default();
        for a in anomalies {
            match a.severity() {
                Severity::Low => c.low += 1,
                Severity::Medium => c.medium += 1,
                Severity::High => c.high += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize { self.low + self.medium + self.high }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub detector: Detector,
    pub entity: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Findings {
    Partitioned {
        author_related: Vec<Anomaly>,
        reviewer_related: Vec<Anomaly>,
        ring_related: Vec<Anomaly>,
    },
    Flat {
        anomalies: Vec<Anomaly>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scope: Scope,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub findings: Findings,
    /// Detectors that did not finish; their anomalies are missing.
    pub incomplete: Vec<Detector>,
    pub skipped: Vec<SkippedEntity>,
}

impl ScanReport {
    pub fn anomalies(&self) -> Vec<&Anomaly> {
        match &self.findings {
            Findings::Partitioned { author_related, reviewer_related, ring_related } => author_related
                .iter()
                .chain(reviewer_related.iter())
                .chain(ring_related.iter())
                .collect(),
            Findings::Flat { anomalies } => anomalies.iter().collect(),
        }
    }

    pub fn into_anomalies(self) -> Vec<Anomaly> {
        match self.findings {
            Findings::Partitioned { mut author_related, reviewer_related, ring_related } => {
                author_related.extend(reviewer_related);
                author_related.extend(ring_related);
                author_related
            }
            Findings::Flat { anomalies } => anomalies,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

// ── Per-detector output ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DetectorRun {
    anomalies: Vec<Anomaly>,
    skipped: Vec<SkippedEntity>,
}

impl DetectorRun {
    fn skip(&mut self, detector: Detector, err: EngineError) {
        let (entity, reason) = match err {
            EngineError::DataUnavailable { entity, reason } => (entity, reason),
            other => ("unknown".to_string(), other.to_string()),
        };
        warn!("{}: skipping {} ({})", detector, entity, reason);
        self.skipped.push(SkippedEntity { detector, entity, reason });
    }
}

#[derive(Default)]
struct Collector {
    anomalies: Vec<Anomaly>,
    incomplete: Vec<Detector>,
    skipped: Vec<SkippedEntity>,
}

impl Collector {
    fn absorb(&mut self, detector: Detector, outcome: Result<DetectorRun>) {
        match outcome {
            Ok(run) => {
                debug!("{}: {} anomalies, {} skipped", detector, run.anomalies.len(), run.skipped.len());
                self.anomalies.extend(run.anomalies);
                self.skipped.extend(run.skipped);
            }
            Err(e) => {
                warn!("{}: did not complete: {}", detector, e);
                self.incomplete.push(detector);
            }
        }
    }

    fn absorb_joined(
        &mut self,
        detector: Detector,
        joined: std::result::Result<Result<DetectorRun>, tokio::task::JoinError>,
    ) {
        match joined {
            Ok(outcome) => self.absorb(detector, outcome),
            Err(e) => {
                warn!("{}: task failed: {}", detector, e);
                self.incomplete.push(detector);
            }
        }
    }
}

// ── Scan context ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct ScanContext {
    store: Arc<dyn DataStore>,
    cfg: Arc<EngineConfig>,
    email: Arc<EmailClassifier>,
    now: DateTime<Utc>,
    /// Start of the look-back window, `now - scan_window_days`.
    since: DateTime<Utc>,
}

impl ScanContext {
    fn rapid(&self, authors: &[String]) -> DetectorRun {
        let mut run = DetectorRun::default();
        for author in authors {
            match self.store.submissions_by_author(author, Some(self.since)) {
                Ok(subs) => run.anomalies.extend(rapid::analyze(author, &subs, &self.cfg)),
                Err(e) => run.skip(Detector::RapidSubmissions, e),
            }
        }
        run
    }

    fn self_citation(&self, submissions: &[Submission]) -> DetectorRun {
        let mut run = DetectorRun::default();
        for s in submissions {
            match self_citation::analyze(s, &self.cfg) {
                Ok(found) => run.anomalies.extend(found),
                Err(e) => run.skip(Detector::SelfCitation, e),
            }
        }
        run
    }

    fn duplicates_by_author(&self, authors: &[String]) -> DetectorRun {
        let mut run = DetectorRun::default();
        for author in authors {
            match self.store.submissions_by_author(author, None) {
                Ok(subs) => run.anomalies.extend(duplicate::analyze_author(&subs, &self.cfg)),
                Err(e) => run.skip(Detector::DuplicateContent, e),
            }
        }
        run
    }

    fn duplicates_of(&self, target: &Submission) -> Result<DetectorRun> {
        let history = self.store.submissions_by_author(&target.author_id, None)?;
        Ok(DetectorRun {
            anomalies: duplicate::analyze_submission(target, &history, &self.cfg),
            skipped: Vec::new(),
        })
    }

    fn bots(&self, users: &[String]) -> DetectorRun {
        let mut run = DetectorRun::default();
        for user in users {
            let found = self.store.profile(user).and_then(|p| {
                let profile = p.ok_or_else(|| EngineError::unavailable(format!("user {}", user), "no profile"))?;
                let count = self.store.submissions_by_author(user, None)?.len();
                Ok(bot::analyze(&profile, count, self.now, &self.email, &self.cfg))
            });
            match found {
                Ok(a) => run.anomalies.extend(a),
                Err(e) => run.skip(Detector::BotAccount, e),
            }
        }
        run
    }

    fn biased(&self, reviewers: &[String]) -> DetectorRun {
        let mut run = DetectorRun::default();
        for reviewer in reviewers {
            match self.store.completed_reviews_by_reviewer(reviewer) {
                Ok(reviews) => run.anomalies.extend(biased::analyze(reviewer, &reviews, &self.cfg)),
                Err(e) => run.skip(Detector::BiasedReviewer, e),
            }
        }
        run
    }

    fn rushed(&self, reviews: &[CompletedReview]) -> DetectorRun {
        let mut run = DetectorRun::default();
        let mut titles: HashMap<String, Option<String>> = HashMap::new();
        for review in reviews {
            let title = titles
                .entry(review.submission_id.clone())
                .or_insert_with(|| match self.store.submission(&review.submission_id) {
                    Ok(found) => found.map(|s| s.title),
                    Err(e) => {
                        warn!("{}: no title for review {} ({})", Detector::RushedReview, review.id, e);
                        None
                    }
                })
                .clone();
            match rushed::analyze(review, title.as_deref(), &self.cfg) {
                Ok(found) => run.anomalies.extend(found),
                Err(e) => run.skip(Detector::RushedReview, e),
            }
        }
        run
    }

    /// Favorable reviews in the scan window, resolved to reviewer → author.
    fn favorable_edges(&self, run: &mut DetectorRun) -> Result<Vec<FavorableEdge>> {
        let reviews = self.store.completed_reviews_in_window(self.since, self.now)?;
        let mut authors: HashMap<String, Option<String>> = HashMap::new();
        let mut edges = Vec::new();

        for review in reviews.iter().filter(|r| r.recommendation.is_favorable()) {
            let author = match authors.get(&review.submission_id) {
                Some(a) => a.clone(),
                None => {
                    let resolved = match self.store.submission(&review.submission_id) {
                        Ok(Some(s)) => Some(s.author_id),
                        Ok(None) => {
                            run.skip(
                                Detector::ReviewRing,
                                EngineError::unavailable(
                                    format!("review {}", review.id),
                                    format!("submission {} not found", review.submission_id),
                                ),
                            );
                            None
                        }
                        Err(e) => {
                            run.skip(Detector::ReviewRing, e);
                            None
                        }
                    };
                    authors.insert(review.submission_id.clone(), resolved.clone());
                    resolved
                }
            };
            if let Some(author_id) = author {
                edges.push(FavorableEdge { reviewer_id: review.reviewer_id.clone(), author_id });
            }
        }
        Ok(edges)
    }

    fn rings(&self, focus: Option<&str>) -> Result<DetectorRun> {
        let mut run = DetectorRun::default();
        let edges = self.favorable_edges(&mut run)?;
        let graph = SentimentGraph::build(&edges);
        debug!("Review graph: {} nodes, {} edges", graph.node_count(), graph.edge_count());
        run.anomalies = match focus {
            Some(user) => ring::analyze_for_user(&graph, user, &self.cfg),
            None => ring::analyze(&graph, &self.cfg),
        };
        Ok(run)
    }

    fn reviews_in_window(&self, reviews: Vec<CompletedReview>) -> Vec<CompletedReview> {
        reviews
            .into_iter()
            .filter(|r| r.completed_at >= self.since && r.completed_at <= self.now)
            .collect()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct ScanEngine {
    store: Arc<dyn DataStore>,
    cfg: Arc<EngineConfig>,
    email: Arc<EmailClassifier>,
}

impl ScanEngine {
    /// Validates the configuration up front; no scan can run on a bad one.
    pub fn new(store: Arc<dyn DataStore>, cfg: EngineConfig) -> Result<Self> {
        cfg.validate()?;
        let email = EmailClassifier::new(&cfg.bot_email_keywords)?;
        Ok(Self { store, cfg: Arc::new(cfg), email: Arc::new(email) })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn context(&self, now: DateTime<Utc>) -> Result<ScanContext> {
        let since = Duration::try_days(self.cfg.scan_window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                EngineError::config(format!(
                    "scan_window_days={} reaches outside the representable time range from {}",
                    self.cfg.scan_window_days, now
                ))
            })?;
        Ok(ScanContext {
            store: Arc::clone(&self.store),
            cfg: Arc::clone(&self.cfg),
            email: Arc::clone(&self.email),
            now,
            since,
        })
    }

    pub async fn scan(&self, scope: Scope) -> Result<ScanReport> {
        self.scan_at(scope, Utc::now()).await
    }

    pub async fn scan_at(&self, scope: Scope, now: DateTime<Utc>) -> Result<ScanReport> {
        info!("Scan started scope={}", scope);
        let ctx = self.context(now)?;

        let report = match &scope {
            Scope::All => build_report(scope.clone(), now, scan_all(&ctx).await, true),
            Scope::Submission(id) => {
                let target = id.clone();
                let submission = resolve(&ctx, &scope, move |c| {
                    c.store
                        .submission(&target)?
                        .ok_or(EngineError::ScopeNotFound { kind: "submission", id: target })
                })
                .await?;
                build_report(scope.clone(), now, scan_submission(&ctx, submission).await, false)
            }
            Scope::Reviewer(id) => {
                require_profile(&ctx, &scope, "reviewer", id).await?;
                build_report(scope.clone(), now, scan_reviewer(&ctx, id).await, false)
            }
            Scope::User(id) => {
                require_profile(&ctx, &scope, "user", id).await?;
                build_report(scope.clone(), now, scan_user(&ctx, id).await, false)
            }
        };

        info!(
            "Scan finished scope={} total={} high={} medium={} low={} incomplete={}",
            report.scope,
            report.total,
            report.by_severity.high,
            report.by_severity.medium,
            report.by_severity.low,
            report.incomplete.len()
        );
        Ok(report)
    }

    pub async fn risk_score(&self, user_id: &str) -> Result<RiskScore> {
        self.risk_score_at(user_id, Utc::now()).await
    }

    /// Folds the user's USER-scope anomalies into a bounded score.
    pub async fn risk_score_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<RiskScore> {
        let report = self.scan_at(Scope::User(user_id.to_string()), now).await?;
        Ok(risk::aggregate(user_id, report.into_anomalies()))
    }
}

fn spawn_detector<F>(ctx: &ScanContext, f: F) -> tokio::task::JoinHandle<Result<DetectorRun>>
where
    F: FnOnce(&ScanContext) -> Result<DetectorRun> + Send + 'static,
{
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || f(&ctx))
}

async fn scan_all(ctx: &ScanContext) -> Collector {
    let (rap, cite, dup, bots, bias, rush, rings) = tokio::join!(
        spawn_detector(ctx, |c| Ok(c.rapid(&c.store.author_ids()?))),
        spawn_detector(ctx, |c| Ok(c.self_citation(&c.store.submissions_in_window(c.since, c.now)?))),
        spawn_detector(ctx, |c| Ok(c.duplicates_by_author(&c.store.author_ids()?))),
        spawn_detector(ctx, |c| Ok(c.bots(&c.store.user_ids()?))),
        spawn_detector(ctx, |c| Ok(c.biased(&c.store.reviewer_ids()?))),
        spawn_detector(ctx, |c| Ok(c.rushed(&c.store.completed_reviews_in_window(c.since, c.now)?))),
        spawn_detector(ctx, |c| c.rings(None)),
    );

    let mut out = Collector::default();
    out.absorb_joined(Detector::RapidSubmissions, rap);
    out.absorb_joined(Detector::SelfCitation, cite);
    out.absorb_joined(Detector::DuplicateContent, dup);
    out.absorb_joined(Detector::BotAccount, bots);
    out.absorb_joined(Detector::BiasedReviewer, bias);
    out.absorb_joined(Detector::RushedReview, rush);
    out.absorb_joined(Detector::ReviewRing, rings);
    out
}

// ── Narrow scopes ─────────────────────────────────────────────────────────────
//
// The scope entity is resolved first; failing that is the only error a
// narrow scan returns. Each detector family then runs on its own blocking
// task, exactly as in a full scan.

async fn resolve<T, F>(ctx: &ScanContext, scope: &Scope, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ScanContext) -> Result<T> + Send + 'static,
{
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|e| EngineError::unavailable(scope.to_string(), e))?
}

async fn require_profile(ctx: &ScanContext, scope: &Scope, kind: &'static str, id: &str) -> Result<()> {
    let id = id.to_string();
    resolve(ctx, scope, move |c| match c.store.profile(&id)? {
        Some(_) => Ok(()),
        None => Err(EngineError::ScopeNotFound { kind, id }),
    })
    .await
}

async fn scan_submission(ctx: &ScanContext, submission: Submission) -> Collector {
    let (s1, s2, id) = (submission.clone(), submission.clone(), submission.id.clone());
    let (cite, dup, rush) = tokio::join!(
        spawn_detector(ctx, move |c| Ok(c.self_citation(std::slice::from_ref(&s1)))),
        spawn_detector(ctx, move |c| c.duplicates_of(&s2)),
        spawn_detector(ctx, move |c| Ok(c.rushed(&c.store.completed_reviews_for_submission(&id)?))),
    );

    let mut out = Collector::default();
    out.absorb_joined(Detector::SelfCitation, cite);
    out.absorb_joined(Detector::DuplicateContent, dup);
    out.absorb_joined(Detector::RushedReview, rush);
    out
}

async fn scan_reviewer(ctx: &ScanContext, id: &str) -> Collector {
    let (r1, r2, r3) = (id.to_string(), id.to_string(), id.to_string());
    let (bias, rush, rings) = tokio::join!(
        spawn_detector(ctx, move |c| Ok(c.biased(std::slice::from_ref(&r1)))),
        spawn_detector(ctx, move |c| {
            Ok(c.rushed(&c.reviews_in_window(c.store.completed_reviews_by_reviewer(&r2)?)))
        }),
        spawn_detector(ctx, move |c| c.rings(Some(r3.as_str()))),
    );

    let mut out = Collector::default();
    out.absorb_joined(Detector::BiasedReviewer, bias);
    out.absorb_joined(Detector::RushedReview, rush);
    out.absorb_joined(Detector::ReviewRing, rings);
    out
}

async fn scan_user(ctx: &ScanContext, id: &str) -> Collector {
    let user = || vec![id.to_string()];
    let (u1, u2, u3, u4, u5, u6, u7) = (user(), user(), user(), user(), user(), user(), user());
    let (rap, cite, dup, bots, bias, rush, rings) = tokio::join!(
        // as author
        spawn_detector(ctx, move |c| Ok(c.rapid(&u1))),
        spawn_detector(ctx, move |c| {
            Ok(c.self_citation(&c.store.submissions_by_author(&u2[0], Some(c.since))?))
        }),
        spawn_detector(ctx, move |c| Ok(c.duplicates_by_author(&u3))),
        spawn_detector(ctx, move |c| Ok(c.bots(&u4))),
        // as reviewer
        spawn_detector(ctx, move |c| Ok(c.biased(&u5))),
        spawn_detector(ctx, move |c| {
            Ok(c.rushed(&c.reviews_in_window(c.store.completed_reviews_by_reviewer(&u6[0])?)))
        }),
        spawn_detector(ctx, move |c| c.rings(Some(u7[0].as_str()))),
    );

    let mut out = Collector::default();
    out.absorb_joined(Detector::RapidSubmissions, rap);
    out.absorb_joined(Detector::SelfCitation, cite);
    out.absorb_joined(Detector::DuplicateContent, dup);
    out.absorb_joined(Detector::BotAccount, bots);
    out.absorb_joined(Detector::BiasedReviewer, bias);
    out.absorb_joined(Detector::RushedReview, rush);
    out.absorb_joined(Detector::ReviewRing, rings);
    out
}

fn build_report(scope: Scope, now: DateTime<Utc>, collected: Collector, partitioned: bool) -> ScanReport {
    let Collector { anomalies, mut incomplete, skipped } = collected;
    incomplete.sort();
    incomplete.dedup();

    let by_severity = SeverityCounts::tally(&anomalies);
    let total = anomalies.len();

    let findings = if partitioned {
        let mut author_related = Vec::new();
        let mut reviewer_related = Vec::new();
        let mut ring_related = Vec::new();
        for a in anomalies {
            match a.category() {
                Category::Author => author_related.push(a),
                Category::Reviewer => reviewer_related.push(a),
                Category::Ring => ring_related.push(a),
            }
        }
        Findings::Partitioned { author_related, reviewer_related, ring_related }
    } else {
        Findings::Flat { anomalies }
    };

    ScanReport { scope, generated_at: now, total, by_severity, findings, incomplete, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parsing() {
        assert_eq!("all".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!("ALL".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!("submission:s-1".parse::<Scope>().unwrap(), Scope::Submission("s-1".into()));
        assert_eq!("Reviewer: r9".parse::<Scope>().unwrap(), Scope::Reviewer("r9".into()));
        assert_eq!("user:u:42".parse::<Scope>().unwrap(), Scope::User("u:42".into()));
        assert!("user:".parse::<Scope>().is_err());
        assert!("team:x".parse::<Scope>().is_err());
        assert!("everything".parse::<Scope>().is_err());
    }

    #[test]
    fn scope_round_trips_through_display() {
        for s in [Scope::All, Scope::Submission("a".into()), Scope::User("b".into())] {
            assert_eq!(s.to_string().parse::<Scope>().unwrap(), s);
        }
    }

    #[test]
    fn empty_report_shapes() {
        let now = Utc::now();
        let full = build_report(Scope::All, now, Collector::default(), true);
        assert!(matches!(full.findings, Findings::Partitioned { .. }));
        assert_eq!(full.total, 0);
        assert!(full.is_complete());

        let narrow = build_report(Scope::User("u".into()), now, Collector::default(), false);
        assert!(matches!(narrow.findings, Findings::Flat { .. }));
    }

    #[test]
    fn incomplete_detectors_are_deduplicated() {
        let mut c = Collector::default();
        c.absorb(Detector::ReviewRing, Err(EngineError::unavailable("graph", "down")));
        c.absorb(Detector::ReviewRing, Err(EngineError::unavailable("graph", "down")));
        let report = build_report(Scope::All, Utc::now(), c, true);
        assert_eq!(report.incomplete, vec![Detector::ReviewRing]);
    }
}
