// peerguard/src/config.rs
//
// Detector thresholds and windows.
//
// Loading order: built-in defaults → optional JSON file → PEERGUARD_* env
// vars. Every field can be overridden; validate() runs last so an invalid
// deployment fails before the first scan.
//
// Example override:
//   PEERGUARD_RAPID_SUBMISSION_THRESHOLD=8 peerguard scan --data snap.json

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, Result};

pub const ENV_PREFIX: &str = "PEERGUARD_";

/// Upper bound on look-back windows (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;
pub const MAX_WINDOW_HOURS: i64 = MAX_WINDOW_DAYS * 24;

// ── Bot heuristic weights ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotWeights {
    pub generic_email: f64,
    pub missing_bio: f64,
    pub missing_affiliation: f64,
    pub submission_rate: f64,
}

impl Default for BotWeights {
    fn default() -> Self {
        // Sum = 1.00
        Self {
            generic_email:       0.30,
            missing_bio:         0.15,
            missing_affiliation: 0.15,
            submission_rate:     0.40,
        }
    }
}

// ── Engine configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Rapid submissions
    pub rapid_submission_threshold: usize,
    pub rapid_submission_window_hours: i64,

    // Self-citation
    pub min_references_for_check: usize,
    pub high_self_citation_threshold: f64,

    // Rushed review
    pub rushed_review_hours: f64,

    // Biased reviewer
    pub min_reviews_for_pattern: usize,
    pub suspicious_rate_threshold: f64,

    // Bot account
    pub bot_score_threshold: f64,
    pub bot_weights: BotWeights,
    pub bot_max_submissions_per_day: f64,
    pub bot_email_keywords: Vec<String>,

    // Duplicate content
    pub duplicate_similarity_threshold: f64,

    // Review ring
    pub review_ring_min_reciprocal: u32,

    /// Look-back for windowed scans (submissions, reviews, review graph).
    pub scan_window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rapid_submission_threshold:     5,
            rapid_submission_window_hours:  24,
            min_references_for_check:       10,
            high_self_citation_threshold:   0.30,
            rushed_review_hours:            1.0,
            min_reviews_for_pattern:        10,
            suspicious_rate_threshold:      0.90,
            bot_score_threshold:            0.70,
            bot_weights:                    BotWeights::default(),
            bot_max_submissions_per_day:    1.0,
            bot_email_keywords: ["test", "admin", "user", "demo", "fake", "temp", "sample", "noreply", "bot"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            duplicate_similarity_threshold: 0.70,
            review_ring_min_reciprocal:     3,
            scan_window_days:               90,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `path` (if any), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(std::env::vars())?;
        cfg.validate()?;
        info!("Configuration loaded (window={}d)", cfg.scan_window_days);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Apply `PEERGUARD_<FIELD>` overrides from the given variables.
    /// Unknown PEERGUARD_ keys are rejected so typos do not go unnoticed.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else { continue };
            let field = field.to_lowercase();
            debug!("Config override {}={}", field, value);
            let v = value.trim();
            match field.as_str() {
                "rapid_submission_threshold" => self.rapid_submission_threshold = parse(&key, v)?,
                "rapid_submission_window_hours" => self.rapid_submission_window_hours = parse(&key, v)?,
                "min_references_for_check" => self.min_references_for_check = parse(&key, v)?,
                "high_self_citation_threshold" => self.high_self_citation_threshold = parse(&key, v)?,
                "rushed_review_hours" => self.rushed_review_hours = parse(&key, v)?,
                "min_reviews_for_pattern" => self.min_reviews_for_pattern = parse(&key, v)?,
                "suspicious_rate_threshold" => self.suspicious_rate_threshold = parse(&key, v)?,
                "bot_score_threshold" => self.bot_score_threshold = parse(&key, v)?,
                "bot_weight_generic_email" => self.bot_weights.generic_email = parse(&key, v)?,
                "bot_weight_missing_bio" => self.bot_weights.missing_bio = parse(&key, v)?,
                "bot_weight_missing_affiliation" => self.bot_weights.missing_affiliation = parse(&key, v)?,
                "bot_weight_submission_rate" => self.bot_weights.submission_rate = parse(&key, v)?,
                "bot_max_submissions_per_day" => self.bot_max_submissions_per_day = parse(&key, v)?,
                "bot_email_keywords" => {
                    self.bot_email_keywords = v
                        .split(',')
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                }
                "duplicate_similarity_threshold" => self.duplicate_similarity_threshold = parse(&key, v)?,
                "review_ring_min_reciprocal" => self.review_ring_min_reciprocal = parse(&key, v)?,
                "scan_window_days" => self.scan_window_days = parse(&key, v)?,
                _ => return Err(EngineError::config(format!("unknown setting {}", key))),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rapid_submission_threshold == 0 {
            return Err(EngineError::config("rapid_submission_threshold must be at least 1"));
        }
        if self.rapid_submission_window_hours <= 0 || self.rapid_submission_window_hours > MAX_WINDOW_HOURS {
            return Err(EngineError::config(format!(
                "rapid_submission_window_hours must be in 1..={}",
                MAX_WINDOW_HOURS
            )));
        }
        if self.min_references_for_check == 0 {
            return Err(EngineError::config("min_references_for_check must be at least 1"));
        }
        check_rate("high_self_citation_threshold", self.high_self_citation_threshold)?;
        if !(self.rushed_review_hours > 0.0) {
            return Err(EngineError::config("rushed_review_hours must be positive"));
        }
        if self.min_reviews_for_pattern == 0 {
            return Err(EngineError::config("min_reviews_for_pattern must be at least 1"));
        }
        check_rate("suspicious_rate_threshold", self.suspicious_rate_threshold)?;
        check_rate("bot_score_threshold", self.bot_score_threshold)?;
        check_rate("duplicate_similarity_threshold", self.duplicate_similarity_threshold)?;

        let w = &self.bot_weights;
        for (name, weight) in [
            ("bot_weights.generic_email", w.generic_email),
            ("bot_weights.missing_bio", w.missing_bio),
            ("bot_weights.missing_affiliation", w.missing_affiliation),
            ("bot_weights.submission_rate", w.submission_rate),
        ] {
            if !(weight >= 0.0) {
                return Err(EngineError::config(format!("{} must be non-negative", name)));
            }
        }
        if !(self.bot_max_submissions_per_day > 0.0) {
            return Err(EngineError::config("bot_max_submissions_per_day must be positive"));
        }
        if self.bot_email_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(EngineError::config("bot_email_keywords must not be empty"));
        }
        if self.review_ring_min_reciprocal == 0 {
            return Err(EngineError::config("review_ring_min_reciprocal must be at least 1"));
        }
        if self.scan_window_days <= 0 || self.scan_window_days > MAX_WINDOW_DAYS {
            return Err(EngineError::config(format!("scan_window_days must be in 1..={}", MAX_WINDOW_DAYS)));
        }
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| EngineError::config(format!("{}={:?}: {}", key, value, e)))
}

/// Rates and scores live in (0, 1]. NaN fails both comparisons.
fn check_rate(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::config(format!("{} must be in (0, 1], got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.rapid_submission_threshold, 5);
        assert_eq!(cfg.rapid_submission_window_hours, 24);
        assert_eq!(cfg.review_ring_min_reciprocal, 3);
        let w = &cfg.bot_weights;
        let sum = w.generic_email + w.missing_bio + w.missing_affiliation + w.submission_rate;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_windows_rejected() {
        let cfg = EngineConfig { scan_window_days: 100_000_000, ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::Configuration(_))));

        let cfg = EngineConfig { rapid_submission_window_hours: i64::MAX, ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::Configuration(_))));

        let cfg = EngineConfig {
            scan_window_days: MAX_WINDOW_DAYS,
            rapid_submission_window_hours: MAX_WINDOW_HOURS,
            ..EngineConfig::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = EngineConfig::default();
        cfg.apply_env(vars(&[
            ("PEERGUARD_RAPID_SUBMISSION_THRESHOLD", "8"),
            ("PEERGUARD_DUPLICATE_SIMILARITY_THRESHOLD", "0.85"),
            ("PEERGUARD_BOT_EMAIL_KEYWORDS", "Spam, , qa"),
            ("HOME", "/root"),
        ]))
        .unwrap();
        assert_eq!(cfg.rapid_submission_threshold, 8);
        assert!((cfg.duplicate_similarity_threshold - 0.85).abs() < 1e-12);
        assert_eq!(cfg.bot_email_keywords, vec!["spam".to_string(), "qa".to_string()]);
    }

    #[test]
    fn env_rejects_garbage() {
        let mut cfg = EngineConfig::default();
        let err = cfg.apply_env(vars(&[("PEERGUARD_RUSHED_REVIEW_HOURS", "soon")])).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let err = cfg.apply_env(vars(&[("PEERGUARD_NOT_A_SETTING", "1")])).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn negative_window_fails_fast() {
        let mut cfg = EngineConfig::default();
        cfg.apply_env(vars(&[("PEERGUARD_RAPID_SUBMISSION_WINDOW_HOURS", "-24")])).unwrap();
        assert!(matches!(cfg.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn out_of_range_rates_fail() {
        let cfg = EngineConfig { suspicious_rate_threshold: 1.5, ..EngineConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig { high_self_citation_threshold: f64::NAN, ..EngineConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig { bot_email_keywords: vec![], ..EngineConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "review_ring_min_reciprocal": 5, "bot_weights": {{ "missing_bio": 0.25 }} }}"#)
            .unwrap();
        let cfg = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.review_ring_min_reciprocal, 5);
        assert!((cfg.bot_weights.missing_bio - 0.25).abs() < 1e-12);
        assert!((cfg.bot_weights.generic_email - 0.30).abs() < 1e-12);
        assert_eq!(cfg.min_reviews_for_pattern, 10);
    }

    #[test]
    fn unreadable_file_is_configuration_error() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/peerguard.json")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
