//! Remote LLM fallback for intent classification
//!
//! Only consulted after the pattern table misses. Every failure here is
//! absorbed by the classifier and surfaces as an unknown command.

pub mod client;
pub mod oracle;

pub use client::{ApiFormat, LlmClient};
pub use oracle::LlmOracle;
