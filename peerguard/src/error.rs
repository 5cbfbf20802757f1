// peerguard/src/error.rs
//
// Engine error taxonomy.
//
//   DataUnavailable  one entity could not be read or parsed; the detector
//                     that hit it skips the entity and keeps going
//   Configuration    a threshold is missing or out of range; raised while
//                     loading config, before any scan runs
//   ScopeNotFound    a narrow scan names an id the store cannot resolve

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("data unavailable for {entity}: {reason}")]
    DataUnavailable { entity: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{kind} '{id}' not found")]
    ScopeNotFound { kind: &'static str, id: String },
}

impl EngineError {
    pub fn unavailable(entity: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DataUnavailable { entity: entity.into(), reason: reason.to_string() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ScopeNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
