//! Property tests for the cooldown and rate-limit bounds

use std::sync::Arc;
use std::time::Duration;

use command_engine::command::{CommandProcessor, ContextSnapshot};
use command_engine::core::{CommandType, EngineConfig, ManualClock};
use proptest::prelude::*;

fn engine(config: EngineConfig) -> (CommandProcessor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let processor = CommandProcessor::builder(config)
        .clock(clock.clone())
        .without_oracle()
        .build()
        .unwrap();
    (processor, clock)
}

/// Replay `input` after each gap, returning the offsets of the successes
fn successes(
    processor: &CommandProcessor,
    clock: &ManualClock,
    input: &str,
    gaps_ms: &[u64],
) -> Vec<Duration> {
    let snapshot = ContextSnapshot::player("韩立");
    let mut now = Duration::ZERO;
    let mut out = Vec::new();
    for &gap in gaps_ms {
        clock.advance(Duration::from_millis(gap));
        now += Duration::from_millis(gap);
        if processor.process(input, &snapshot).success {
            out.push(now);
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cooldown_spaces_successes(
        cooldown_ms in 100u64..5_000,
        gaps_ms in prop::collection::vec(0u64..3_000, 1..30),
    ) {
        let config = EngineConfig::default()
            .with_cooldown(CommandType::Cultivate, cooldown_ms as f64 / 1000.0)
            .with_rate_limit(1_000, 60.0);
        let (processor, clock) = engine(config);

        let hits = successes(&processor, &clock, "修炼", &gaps_ms);
        prop_assert!(!hits.is_empty());
        for pair in hits.windows(2) {
            prop_assert!(pair[1] - pair[0] >= Duration::from_millis(cooldown_ms));
        }
    }

    #[test]
    fn rate_limit_bounds_every_window(
        max_commands in 1usize..6,
        window_secs in 1u64..10,
        gaps_ms in prop::collection::vec(0u64..2_000, 1..40),
    ) {
        let config = EngineConfig::default().with_rate_limit(max_commands, window_secs as f64);
        let (processor, clock) = engine(config);
        let window = Duration::from_secs(window_secs);

        let hits = successes(&processor, &clock, "状态", &gaps_ms);
        prop_assert!(!hits.is_empty());
        for (i, start) in hits.iter().enumerate() {
            let in_window = hits[i..].iter().take_while(|t| **t - *start < window).count();
            prop_assert!(in_window <= max_commands);
        }
    }

    #[test]
    fn unknown_suggestions_never_exceed_five(input in "[a-z前攻修状帮]{1,4}") {
        let (processor, _) = engine(EngineConfig::default());
        let result = processor.process(&input, &ContextSnapshot::player("韩立"));
        prop_assert!(result.suggestions().len() <= 5);
    }
}
