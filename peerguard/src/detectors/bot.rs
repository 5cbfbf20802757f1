// peerguard/src/detectors/bot.rs
//
// Bot / fabricated account heuristic.
//
// Composite score = sum of the weights of the components that fire:
//   generic_email        local part starts with a throwaway keyword
//                        (test, admin, user...) followed by end-of-string or
//                        a non-letter, or is all digits
//   missing_bio          empty or absent bio
//   missing_affiliation  empty or absent affiliation
//   submission_rate      submissions per day of account age (min 1 day)
//                        above bot_max_submissions_per_day
//
// Fires when the score reaches bot_score_threshold.

use aho_corasick::{AhoCorasick, MatchKind};
use chrono::{DateTime, Utc};

use crate::anomaly::{Anomaly, BotComponents, Evidence, Subject};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::records::Profile;

// ── Email classification ──────────────────────────────────────────────────────

pub struct EmailClassifier {
    keywords: AhoCorasick,
}

impl EmailClassifier {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let patterns: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if patterns.is_empty() {
            return Err(EngineError::config("bot_email_keywords must not be empty"));
        }
        let keywords = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| EngineError::config(format!("bot_email_keywords: {}", e)))?;
        Ok(Self { keywords })
    }

    pub fn is_generic(&self, local_part: &str) -> bool {
        if local_part.is_empty() {
            return true;
        }
        if local_part.len() >= 3 && local_part.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        match self.keywords.find(local_part) {
            Some(m) if m.start() == 0 => local_part[m.end()..]
                .chars()
                .next()
                .map(|c| !c.is_alphabetic())
                .unwrap_or(true),
            _ => false,
        }
    }
}

// ── Detector ──────────────────────────────────────────────────────────────────

pub fn components(
    profile: &Profile,
    submission_count: usize,
    now: DateTime<Utc>,
    classifier: &EmailClassifier,
    cfg: &EngineConfig,
) -> BotComponents {
    let w = &cfg.bot_weights;
    let age_days = ((now - profile.account_created_at).num_seconds() as f64 / 86_400.0).max(1.0);
    let rate = submission_count as f64 / age_days;

    let fired = |hit: bool, weight: f64| if hit { weight } else { 0.0 };
    BotComponents {
        generic_email:       fired(classifier.is_generic(&profile.email_local_part()), w.generic_email),
        missing_bio:         fired(!profile.has_bio(), w.missing_bio),
        missing_affiliation: fired(!profile.has_affiliation(), w.missing_affiliation),
        submission_rate:     fired(rate > cfg.bot_max_submissions_per_day, w.submission_rate),
        submissions:         submission_count,
        account_age_days:    (age_days * 100.0).round() / 100.0,
    }
}

pub fn analyze(
    profile: &Profile,
    submission_count: usize,
    now: DateTime<Utc>,
    classifier: &EmailClassifier,
    cfg: &EngineConfig,
) -> Option<Anomaly> {
    let parts = components(profile, submission_count, now, classifier, cfg);
    let raw = parts.generic_email + parts.missing_bio + parts.missing_affiliation + parts.submission_rate;
    let score = (raw.min(1.0) * 10000.0).round() / 10000.0;

    if score < cfg.bot_score_threshold {
        return None;
    }

    Some(Anomaly::new(
        vec![Subject::User(profile.user_id.clone())],
        Evidence::BotAccount {
            user_id: profile.user_id.clone(),
            score,
            components: parts,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyKind, Severity};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn classifier() -> EmailClassifier {
        EmailClassifier::new(&EngineConfig::default().bot_email_keywords).unwrap()
    }

    fn profile(email: &str, bio: Option<&str>, affiliation: Option<&str>, age_days: i64) -> Profile {
        Profile {
            user_id: "u1".into(),
            email: email.into(),
            bio: bio.map(str::to_string),
            affiliation: affiliation.map(str::to_string),
            account_created_at: now() - Duration::days(age_days),
        }
    }

    #[test]
    fn generic_local_parts() {
        let c = classifier();
        for local in ["test", "test1", "admin", "user123", "user_7", "bot", "12345", "Demo-account", ""] {
            assert!(c.is_generic(&local.to_lowercase()), "{} should be generic", local);
        }
        for local in ["jane.doe", "temperance", "usha", "testudo", "a.admin", "42"] {
            assert!(!c.is_generic(local), "{} should not be generic", local);
        }
    }

    #[test]
    fn throwaway_account_with_burst_fires() {
        let p = profile("user123@mail.example", Some("PhD student"), Some("MIT"), 2);
        let a = analyze(&p, 6, now(), &classifier(), &EngineConfig::default()).unwrap();
        assert_eq!(a.kind(), AnomalyKind::BotAccount);
        assert_eq!(a.severity(), Severity::High);
        match a.evidence() {
            Evidence::BotAccount { score, components, .. } => {
                assert!((score - 0.70).abs() < 1e-12);
                assert_eq!(components.missing_bio, 0.0);
                assert_eq!(components.submissions, 6);
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn empty_profile_without_activity_stays_below_threshold() {
        let p = profile("test@x.org", None, None, 400);
        assert!(analyze(&p, 1, now(), &classifier(), &EngineConfig::default()).is_none());
    }

    #[test]
    fn empty_profile_with_burst_fires() {
        let p = profile("maria.garcia@uni.edu", None, Some("  "), 1);
        let a = analyze(&p, 3, now(), &classifier(), &EngineConfig::default()).unwrap();
        match a.evidence() {
            Evidence::BotAccount { score, .. } => assert!((score - 0.70).abs() < 1e-12),
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn established_researcher_is_clean() {
        let p = profile("j.smith@uni.edu", Some("Professor"), Some("Uni"), 2000);
        assert!(analyze(&p, 40, now(), &classifier(), &EngineConfig::default()).is_none());
    }

    #[test]
    fn young_account_rate_uses_one_day_floor() {
        let mut p = profile("j.smith@uni.edu", Some("x"), Some("y"), 0);
        p.account_created_at = now() - Duration::hours(1);
        let parts = components(&p, 1, now(), &classifier(), &EngineConfig::default());
        assert_eq!(parts.submission_rate, 0.0);
        assert_eq!(parts.account_age_days, 1.0);
    }

    #[test]
    fn empty_keywords_rejected() {
        assert!(EmailClassifier::new(&[" ".to_string()]).is_err());
    }
}
