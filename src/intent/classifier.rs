//! Two-stage intent classification
//!
//! Stage one is the deterministic pattern table. Only when every pattern
//! misses does the classifier consult the fallback oracle, under a timeout,
//! and only guesses at or above the confidence threshold are kept. Oracle
//! errors, panics and timeouts all come back as `Unknown`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::{Builder, Runtime};
use tokio::task::{JoinError, JoinHandle};

use crate::core::error::Result;
use crate::intent::context::ContextHint;
use crate::intent::oracle::IntentOracle;
use crate::parser::command::{ParsedCommand, PATTERN_CONFIDENCE};
use crate::parser::patterns::{PatternSpec, PatternTable};

/// Which stage produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassifierState {
    PatternMatched,
    Fallback,
}

/// Outcome of classifying one input
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub command: ParsedCommand,
    pub state: ClassifierState,
}

/// Running counters, readable while the engine is live
#[derive(Debug, Default)]
pub struct ClassifierStats {
    pattern_hits: AtomicU64,
    fallback_attempts: AtomicU64,
    fallback_accepted: AtomicU64,
    fallback_rejected: AtomicU64,
    fallback_failures: AtomicU64,
}

/// Point-in-time copy of `ClassifierStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifierStatsSnapshot {
    pub pattern_hits: u64,
    pub fallback_attempts: u64,
    /// Oracle guesses at or above the threshold
    pub fallback_accepted: u64,
    /// Oracle guesses below the threshold
    pub fallback_rejected: u64,
    /// Oracle errors, panics and timeouts
    pub fallback_failures: u64,
}

impl ClassifierStats {
    pub fn snapshot(&self) -> ClassifierStatsSnapshot {
        ClassifierStatsSnapshot {
            pattern_hits: self.pattern_hits.load(Ordering::Relaxed),
            fallback_attempts: self.fallback_attempts.load(Ordering::Relaxed),
            fallback_accepted: self.fallback_accepted.load(Ordering::Relaxed),
            fallback_rejected: self.fallback_rejected.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Pattern-first classifier with a pluggable fallback oracle
pub struct IntentClassifier {
    patterns: RwLock<PatternTable>,
    oracle: Option<Arc<dyn IntentOracle>>,
    threshold: f32,
    timeout: Duration,
    stats: ClassifierStats,
    /// Runtime used to drive the oracle from the blocking entry point
    blocking_runtime: OnceLock<Option<Runtime>>,
}

impl IntentClassifier {
    pub fn new(patterns: PatternTable, threshold: f32, timeout: Duration) -> Self {
        Self {
            patterns: RwLock::new(patterns),
            oracle: None,
            threshold,
            timeout,
            stats: ClassifierStats::default(),
            blocking_runtime: OnceLock::new(),
        }
    }

    /// Install the fallback oracle
    pub fn with_oracle(mut self, oracle: Arc<dyn IntentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn oracle_name(&self) -> Option<&str> {
        self.oracle.as_deref().map(|o| o.name())
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn stats(&self) -> ClassifierStatsSnapshot {
        self.stats.snapshot()
    }

    /// Append a pattern at the end of the table
    pub fn add_pattern(&self, spec: PatternSpec) -> Result<()> {
        let mut table = self.patterns.write().unwrap_or_else(|e| e.into_inner());
        table.add(spec)
    }

    /// Pattern specs in matching order
    pub fn pattern_specs(&self) -> Vec<PatternSpec> {
        let table = self.patterns.read().unwrap_or_else(|e| e.into_inner());
        table.specs()
    }

    /// Stage one only: deterministic pattern matching
    pub fn match_patterns(&self, text: &str) -> Option<ParsedCommand> {
        let table = self.patterns.read().unwrap_or_else(|e| e.into_inner());
        let m = table.find_match(text)?;
        let target = m.parameters.get("target").cloned();
        Some(ParsedCommand::new(
            m.command_type,
            target,
            m.parameters,
            text,
            PATTERN_CONFIDENCE,
        ))
    }

    /// Classify from a blocking context
    ///
    /// Safe to call from inside an async runtime: the oracle is then driven
    /// on a scoped helper thread instead of blocking the caller's runtime.
    pub fn classify(&self, text: &str, hint: &ContextHint) -> Classification {
        if let Some(done) = self.try_patterns(text) {
            return done;
        }
        if self.oracle.is_none() {
            return self.fallback_without_oracle(text);
        }

        let command = self
            .block_on(self.consult_oracle(text, hint))
            .unwrap_or_else(|| {
                ClassifierStats::bump(&self.stats.fallback_failures);
                tracing::warn!("Fallback runtime unavailable; treating '{}' as unknown", text);
                ParsedCommand::unknown(text)
            });
        Classification {
            command,
            state: ClassifierState::Fallback,
        }
    }

    /// Classify from an async context
    pub async fn classify_async(&self, text: &str, hint: &ContextHint) -> Classification {
        if let Some(done) = self.try_patterns(text) {
            return done;
        }
        if self.oracle.is_none() {
            return self.fallback_without_oracle(text);
        }

        Classification {
            command: self.consult_oracle(text, hint).await,
            state: ClassifierState::Fallback,
        }
    }

    fn try_patterns(&self, text: &str) -> Option<Classification> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Classification {
                command: ParsedCommand::unknown(text),
                state: ClassifierState::PatternMatched,
            });
        }

        let command = self.match_patterns(text)?;
        ClassifierStats::bump(&self.stats.pattern_hits);
        tracing::debug!(
            "Pattern matched: {} -> {} {:?}",
            text,
            command.command_type,
            command.parameters
        );
        Some(Classification {
            command,
            state: ClassifierState::PatternMatched,
        })
    }

    fn fallback_without_oracle(&self, text: &str) -> Classification {
        Classification {
            command: ParsedCommand::unknown(text.trim()),
            state: ClassifierState::Fallback,
        }
    }

    /// Ask the oracle, bounded by the timeout; never fails
    async fn consult_oracle(&self, text: &str, hint: &ContextHint) -> ParsedCommand {
        let text = text.trim();
        let Some(oracle) = self.oracle.as_ref().map(Arc::clone) else {
            return ParsedCommand::unknown(text);
        };
        ClassifierStats::bump(&self.stats.fallback_attempts);

        let name = oracle.name().to_string();
        let owned_text = text.to_string();
        let owned_hint = hint.clone();
        // Spawned so a panicking oracle surfaces as a JoinError; the guard
        // aborts it on timeout or when the caller drops this future
        let task = AbortOnDrop(tokio::spawn(async move {
            oracle.classify(&owned_text, &owned_hint).await
        }));

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(guess))) => Ok(guess),
            Ok(Ok(Err(e))) => Err(format!("oracle error: {}", e)),
            Ok(Err(join_error)) => Err(format!("oracle task failed: {}", join_error)),
            Err(_) => Err(format!("oracle timed out after {:?}", self.timeout)),
        };

        match outcome {
            Ok(guess) => self.accept_guess(text, guess, &name),
            Err(reason) => {
                ClassifierStats::bump(&self.stats.fallback_failures);
                tracing::warn!("Fallback '{}' failed for '{}': {}", name, text, reason);
                ParsedCommand::unknown(text)
            }
        }
    }

    fn accept_guess(&self, text: &str, guess: ParsedCommand, oracle: &str) -> ParsedCommand {
        if guess.is_unknown() || guess.confidence < self.threshold {
            ClassifierStats::bump(&self.stats.fallback_rejected);
            tracing::debug!(
                "Fallback '{}' guess {} ({:.2}) below threshold {:.2}",
                oracle,
                guess.command_type,
                guess.confidence,
                self.threshold
            );
            return ParsedCommand::unknown(text);
        }

        ClassifierStats::bump(&self.stats.fallback_accepted);
        tracing::info!(
            "Fallback '{}' classified '{}' as {} ({:.2})",
            oracle,
            text,
            guess.command_type,
            guess.confidence
        );
        ParsedCommand::new(
            guess.command_type,
            guess.target,
            guess.parameters,
            text,
            guess.confidence,
        )
    }

    /// Drive a future to completion from synchronous code
    fn block_on<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let runtime = self
            .blocking_runtime
            .get_or_init(|| {
                Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("intent-fallback")
                    .enable_all()
                    .build()
                    .map_err(|e| tracing::error!("Failed to build fallback runtime: {}", e))
                    .ok()
            })
            .as_ref()?;

        if tokio::runtime::Handle::try_current().is_ok() {
            // block_on panics inside a runtime context, so hop to a plain thread
            std::thread::scope(|scope| scope.spawn(|| runtime.block_on(future)).join().ok())
        } else {
            Some(runtime.block_on(future))
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("oracle", &self.oracle_name())
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Spawned oracle call that is cancelled along with its owner
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = std::result::Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
