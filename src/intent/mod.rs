//! Intent classification: pattern table first, fallback oracle second

pub mod classifier;
pub mod context;
pub mod keyword;
pub mod oracle;

pub use classifier::{
    Classification, ClassifierState, ClassifierStats, ClassifierStatsSnapshot, IntentClassifier,
};
pub use context::ContextHint;
pub use keyword::{KeywordOracle, KeywordRule};
pub use oracle::IntentOracle;
