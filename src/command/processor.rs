//! Command processor: the engine's entry point
//!
//! raw text -> alias resolution -> intent classification -> middleware chain
//! -> handler selection -> execution -> history. The blocking and async
//! entry points share every step except how the fallback oracle is awaited.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::command::context::{CommandContext, ContextSnapshot};
use crate::command::handler::CommandHandler;
use crate::command::history::{CommandHistory, HistoryEntry, UndoRecord, UndoStack};
use crate::command::registry::HandlerRegistry;
use crate::command::result::CommandResult;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::EngineConfig;
use crate::core::error::{CommandError, EngineError, Result};
use crate::core::types::{CommandSource, CommandType};
use crate::handlers::register_builtin_handlers;
use crate::intent::classifier::{ClassifierStatsSnapshot, IntentClassifier};
use crate::intent::context::ContextHint;
use crate::intent::keyword::KeywordOracle;
use crate::intent::oracle::IntentOracle;
use crate::middleware::{MiddlewareChain, Permissions, ThrottleStore};
use crate::parser::alias::AliasResolver;
use crate::parser::command::ParsedCommand;
use crate::parser::patterns::{FieldMapping, PatternSpec, PatternTable};

/// Flag holding the name of the handler that ran
pub const HANDLER_FLAG: &str = "handler";

/// Cooperative cancellation for the async entry point
///
/// Checked until the handler stage begins; once a handler runs the command
/// completes or fails on its own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builder for `CommandProcessor`
pub struct ProcessorBuilder {
    config: EngineConfig,
    store: Option<Arc<ThrottleStore>>,
    clock: Option<Arc<dyn Clock>>,
    oracle: Option<Arc<dyn IntentOracle>>,
    use_default_oracle: bool,
    aliases: Option<AliasResolver>,
    patterns: Option<PatternTable>,
    permissions: Permissions,
    builtin_handlers: bool,
}

impl ProcessorBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            clock: None,
            oracle: None,
            use_default_oracle: true,
            aliases: None,
            patterns: None,
            permissions: Permissions::default(),
            builtin_handlers: true,
        }
    }

    /// Share throttle state with another engine or inspect it from tests
    pub fn store(mut self, store: Arc<ThrottleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default keyword oracle
    pub fn oracle(mut self, oracle: Arc<dyn IntentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Pattern misses go straight to `Unknown`
    pub fn without_oracle(mut self) -> Self {
        self.oracle = None;
        self.use_default_oracle = false;
        self
    }

    pub fn aliases(mut self, aliases: AliasResolver) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = Some(patterns);
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Start with an empty registry
    pub fn without_builtin_handlers(mut self) -> Self {
        self.builtin_handlers = false;
        self
    }

    pub fn build(self) -> Result<CommandProcessor> {
        self.config.validate().map_err(EngineError::Config)?;

        let store = self.store.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let mut classifier = IntentClassifier::new(
            self.patterns.unwrap_or_else(PatternTable::with_defaults),
            self.config.confidence_threshold,
            self.config.oracle_timeout(),
        );
        let oracle = match self.oracle {
            Some(oracle) => Some(oracle),
            None if self.use_default_oracle => {
                Some(Arc::new(KeywordOracle::new()) as Arc<dyn IntentOracle>)
            }
            None => None,
        };
        if let Some(oracle) = oracle {
            classifier = classifier.with_oracle(oracle);
        }

        let mut registry = HandlerRegistry::new();
        if self.builtin_handlers {
            register_builtin_handlers(&mut registry)?;
        }

        let chain = MiddlewareChain::standard(&self.config, store, clock, self.permissions);

        tracing::info!(
            "Command processor ready: {} handlers, oracle: {}, middleware: {:?}",
            registry.len(),
            classifier.oracle_name().unwrap_or("none"),
            chain.names()
        );

        Ok(CommandProcessor {
            aliases: RwLock::new(self.aliases.unwrap_or_else(AliasResolver::with_defaults)),
            classifier,
            registry: RwLock::new(registry),
            chain,
            history: Mutex::new(CommandHistory::new(self.config.history_capacity)),
            undo: Mutex::new(UndoStack::new(self.config.undo_capacity)),
            config: self.config,
        })
    }
}

/// Turns raw player input into dispatched, recorded results
pub struct CommandProcessor {
    config: EngineConfig,
    aliases: RwLock<AliasResolver>,
    classifier: IntentClassifier,
    registry: RwLock<HandlerRegistry>,
    chain: MiddlewareChain,
    history: Mutex<CommandHistory>,
    undo: Mutex<UndoStack>,
}

impl CommandProcessor {
    /// Processor with default aliases, patterns, keyword oracle and handlers
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> ProcessorBuilder {
        ProcessorBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one input, blocking on the fallback oracle if it is needed
    pub fn process(&self, raw_input: &str, snapshot: &ContextSnapshot) -> CommandResult {
        let started = Instant::now();
        let resolved = self.resolve_aliases(raw_input);
        let hint = self.hint_for(snapshot);
        let classification = self.classifier.classify(&resolved, &hint);
        self.dispatch(raw_input, classification.command, snapshot, None, true, started)
    }

    /// Process one input without blocking the async runtime
    pub async fn process_async(&self, raw_input: &str, snapshot: &ContextSnapshot) -> CommandResult {
        self.process_async_cancellable(raw_input, snapshot, &CancelToken::new())
            .await
    }

    /// Async processing that can be cancelled until a handler starts
    pub async fn process_async_cancellable(
        &self,
        raw_input: &str,
        snapshot: &ContextSnapshot,
        cancel: &CancelToken,
    ) -> CommandResult {
        let started = Instant::now();
        let resolved = self.resolve_aliases(raw_input);
        let hint = self.hint_for(snapshot);
        let command = if cancel.is_cancelled() {
            ParsedCommand::unknown(resolved.clone())
        } else {
            self.classifier.classify_async(&resolved, &hint).await.command
        };

        if cancel.is_cancelled() {
            let result = CommandResult::from_error(&CommandError::Cancelled);
            self.record(raw_input, command.command_type, snapshot, &result, started);
            return result;
        }
        self.dispatch(raw_input, command, snapshot, Some(cancel), true, started)
    }

    /// Replay the inverse of the most recent reversible success
    ///
    /// Runs through the full middleware chain as a System-sourced command,
    /// in the context the original command left behind. A failed replay
    /// stays on the stack. Returns `None` when there is nothing to undo.
    pub fn undo_last(&self) -> Option<CommandResult> {
        let record = self.undo.lock().unwrap_or_else(|e| e.into_inner()).pop()?;
        let inverse = &record.inverse;
        let snapshot = record.snapshot.clone().with_source(CommandSource::System);

        tracing::info!("Undoing with '{}'", inverse.raw_input);
        let command = ParsedCommand::new(
            inverse.command_type,
            inverse.target.clone(),
            inverse.parameters.clone(),
            inverse.raw_input.clone(),
            1.0,
        );
        let result = self.dispatch(
            &inverse.raw_input,
            command,
            &snapshot,
            None,
            false,
            Instant::now(),
        );
        if !result.success {
            tracing::warn!("Undo of '{}' failed, keeping it", inverse.raw_input);
            self.undo
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(record);
        }
        Some(result)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn register_handler(&self, handler: Arc<dyn CommandHandler>) -> Result<()> {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(handler)
    }

    pub fn unregister_handler(&self, name: &str) -> bool {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .unregister(name)
            .is_some()
    }

    pub fn set_handler_enabled(&self, name: &str, enabled: bool) -> bool {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set_enabled(name, enabled)
    }

    pub fn add_alias(&self, short: &str, canonical: &str) -> Result<()> {
        self.aliases
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add(short, canonical)
    }

    /// Append a pattern after every existing one
    pub fn add_pattern(
        &self,
        pattern: &str,
        command_type: CommandType,
        fields: FieldMapping,
    ) -> Result<()> {
        self.classifier
            .add_pattern(PatternSpec::new(pattern, command_type).with_fields(fields))
    }

    /// Alias-resolved form of an input
    pub fn resolve_aliases(&self, raw_input: &str) -> String {
        self.aliases
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve(raw_input)
    }

    /// Help for one command type, or an overview of every enabled handler
    pub fn help(&self, command_type: Option<CommandType>) -> String {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        match command_type {
            Some(command_type) => {
                let handlers = registry.handlers_for(command_type);
                if handlers.is_empty() {
                    return format!("没有可以处理 {} 的命令", command_type);
                }
                handlers
                    .iter()
                    .map(|h| h.help())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            None => {
                let mut lines = vec!["命令帮助:".to_string()];
                lines.extend(
                    registry
                        .help_entries()
                        .into_iter()
                        .map(|(_, help)| format!("  {}", help)),
                );
                lines.join("\n")
            }
        }
    }

    /// Up to `suggestion_limit` completions for an unrecognised input
    ///
    /// Registered command words, handler names and aliases that share a
    /// prefix with the input's first token come first, then earlier
    /// successful inputs starting with that token.
    pub fn suggestions(&self, raw_input: &str) -> Vec<String> {
        let limit = self.config.suggestion_limit;
        let Some(prefix) = raw_input.split_whitespace().next().map(str::to_lowercase) else {
            return Vec::new();
        };

        let mut vocabulary: BTreeSet<String> = CommandType::ALL
            .iter()
            .flat_map(|t| t.keywords().iter().map(|k| k.to_string()))
            .collect();
        vocabulary.extend(
            self.registry
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .suggestion_words(),
        );
        vocabulary.extend(
            self.aliases
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .names()
                .map(str::to_string),
        );

        let shares_prefix = |word: &str| {
            let word = word.to_lowercase();
            word.starts_with(&prefix) || prefix.starts_with(&word)
        };

        let mut out: Vec<String> = Vec::new();
        for word in vocabulary.into_iter().filter(|w| shares_prefix(w)) {
            if out.len() >= limit {
                return out;
            }
            out.push(word);
        }

        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        for entry in history.iter_newest() {
            if out.len() >= limit {
                break;
            }
            if entry.success
                && entry.raw_input.to_lowercase().starts_with(&prefix)
                && !out.contains(&entry.raw_input)
            {
                out.push(entry.raw_input.clone());
            }
        }
        out
    }

    /// Last `n` history entries, oldest first
    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recent(n)
    }

    pub fn clear_history(&self) {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.undo.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn classifier_stats(&self) -> ClassifierStatsSnapshot {
        self.classifier.stats()
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    fn hint_for(&self, snapshot: &ContextSnapshot) -> ContextHint {
        let mut hint = snapshot.hint();
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        for entry in history.recent(5) {
            if entry.success {
                hint.add_recent(entry.raw_input);
            }
        }
        hint
    }

    fn dispatch(
        &self,
        raw_input: &str,
        command: ParsedCommand,
        snapshot: &ContextSnapshot,
        cancel: Option<&CancelToken>,
        record_inverse: bool,
        started: Instant,
    ) -> CommandResult {
        let command_type = command.command_type;

        let mut result = if command.is_unknown() {
            tracing::debug!("No interpretation for '{}'", raw_input);
            let suggestions = self.suggestions(raw_input);
            CommandResult::from_error(&CommandError::UnknownCommand {
                input: raw_input.trim().to_string(),
            })
            .with_suggestions(suggestions)
        } else {
            let mut ctx = CommandContext::new(command, raw_input, snapshot);
            let terminal = |ctx: &mut CommandContext| self.run_handler(ctx, cancel);
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.chain.run(&mut ctx, &terminal)));
            outcome.unwrap_or_else(|payload| {
                let handler = ctx
                    .flag(HANDLER_FLAG)
                    .and_then(|v| v.as_str())
                    .unwrap_or("middleware")
                    .to_string();
                fault(handler, panic_message(payload.as_ref()))
            })
        };

        if let Some(inverse) = result.inverse.take() {
            if record_inverse && result.success {
                // The inverse runs against the state this command left behind
                let mut after = snapshot.clone();
                after.apply_events(&result.events);
                self.undo
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(UndoRecord {
                        inverse,
                        snapshot: after,
                    });
            }
        }

        self.record(raw_input, command_type, snapshot, &result, started);
        result
    }

    /// Terminal stage: cancellation check, selection, validation, execution
    fn run_handler(&self, ctx: &mut CommandContext, cancel: Option<&CancelToken>) -> CommandResult {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return CommandResult::from_error(&CommandError::Cancelled);
        }

        let selected = self
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .select(ctx);
        let handler = match selected {
            Ok(handler) => handler,
            Err(err) => return CommandResult::from_error(&err),
        };

        let name = handler.descriptor().name.clone();
        ctx.set_flag(HANDLER_FLAG, serde_json::Value::String(name.clone()));

        if let Err(reason) = handler.validate(ctx) {
            return CommandResult::from_error(&CommandError::ValidationFailed(reason));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(ctx))) {
            Ok(result) => result,
            Err(payload) => fault(name, panic_message(payload.as_ref())),
        }
    }

    fn record(
        &self,
        raw_input: &str,
        command_type: CommandType,
        snapshot: &ContextSnapshot,
        result: &CommandResult,
        started: Instant,
    ) {
        let mut entry = HistoryEntry::new(
            raw_input,
            command_type,
            result.success,
            started.elapsed().as_millis() as u64,
        );
        entry.source = snapshot.source;
        entry.actor = snapshot.actor.as_ref().map(|a| a.id);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }
}

impl std::fmt::Debug for CommandProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("classifier", &self.classifier)
            .field("chain", &self.chain)
            .finish()
    }
}

fn fault(handler: String, detail: String) -> CommandResult {
    tracing::error!("Handler '{}' panicked: {}", handler, detail);
    CommandResult::from_error(&CommandError::HandlerFault { handler, detail })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
