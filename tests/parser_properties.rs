//! Property tests for alias resolution and pattern matching

use std::sync::Arc;
use std::time::Duration;

use command_engine::core::CommandType;
use command_engine::intent::{ContextHint, IntentClassifier, KeywordOracle};
use command_engine::parser::{AliasResolver, PatternTable};
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("gj".to_string()),
        Just("ZT".to_string()),
        Just("红药".to_string()),
        Just("主城".to_string()),
        Just("治疗术".to_string()),
        Just("i".to_string()),
        "[a-z]{1,3}",
        "[一-龥]{1,3}",
    ]
}

fn phrase() -> impl Strategy<Value = String> {
    (prop::collection::vec(token(), 0..6), "[ \t]{1,3}")
        .prop_map(|(tokens, sep)| tokens.join(&sep))
}

proptest! {
    #[test]
    fn default_aliases_are_idempotent(text in phrase()) {
        let resolver = AliasResolver::with_defaults();
        let once = resolver.resolve(&text);
        prop_assert_eq!(resolver.resolve(&once), once);
    }

    #[test]
    fn custom_aliases_are_idempotent(
        pairs in prop::collection::vec(("[a-d]{1,2}", "[a-d]{1,2}( [a-d]{1,2})?"), 0..8),
        text in "[a-d ]{0,12}",
    ) {
        let mut resolver = AliasResolver::new();
        for (short, canonical) in &pairs {
            // Chains are rejected; the rest must keep resolve idempotent
            let _ = resolver.add(short, canonical);
        }
        let once = resolver.resolve(&text);
        prop_assert_eq!(resolver.resolve(&once), once);
    }

    #[test]
    fn pattern_matching_is_deterministic(text in "\\PC{0,16}") {
        let a = PatternTable::with_defaults();
        let b = PatternTable::with_defaults();
        let first = a.find_match(&text);
        prop_assert_eq!(a.find_match(&text), first.clone());
        prop_assert_eq!(b.find_match(&text), first);
    }

    #[test]
    fn zero_confidence_means_unknown(text in "\\PC{0,12}") {
        let classifier =
            IntentClassifier::new(PatternTable::with_defaults(), 0.5, Duration::from_secs(1))
                .with_oracle(Arc::new(KeywordOracle::new()));
        let command = classifier.classify(&text, &ContextHint::default()).command;
        prop_assert_eq!(command.confidence == 0.0, command.command_type == CommandType::Unknown);
        prop_assert!(command.confidence == 0.0 || command.confidence >= 0.5);
    }
}
