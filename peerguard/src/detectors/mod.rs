// peerguard/src/detectors/mod.rs
//
// Detectors are pure functions over a slice of store data plus config.
// None of them touch the store directly; the scan engine fetches, skips
// unreadable entities, and feeds them here.

pub mod biased;
pub mod bot;
pub mod duplicate;
pub mod rapid;
pub mod ring;
pub mod rushed;
pub mod self_citation;
pub mod similarity;

pub use similarity::similarity;
