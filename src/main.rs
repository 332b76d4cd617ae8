//! Command Engine - interactive REPL
//!
//! Feeds stdin lines through the command processor and prints each result.
//! Lines starting with ':' are REPL controls (mode switching, undo, history)
//! and never reach the engine.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use command_engine::command::{CommandProcessor, CommandResult, ContextSnapshot};
use command_engine::core::error::{EngineError, Result};
use command_engine::core::{EngineConfig, GameMode, LlmSettings};
use command_engine::llm::{LlmClient, LlmOracle};

#[derive(Parser, Debug)]
#[command(name = "command_engine")]
#[command(about = "Type commands for a cultivation RPG and see how the engine dispatches them")]
struct Args {
    /// TOML engine configuration (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting game mode: exploring, combat, dialogue or trading
    #[arg(long, default_value = "exploring")]
    mode: String,

    /// Use the LLM oracle for unmatched input (needs LLM_API_KEY)
    #[arg(long)]
    llm: bool,

    /// Name of the player character
    #[arg(long, default_value = "韩立")]
    name: String,

    /// Starting location
    #[arg(long, default_value = "青云城")]
    location: String,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("command_engine=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mode = GameMode::from_name(&args.mode)
        .ok_or_else(|| EngineError::Config(format!("Unknown game mode: {}", args.mode)))?;

    let mut builder = CommandProcessor::builder(config.clone());
    if args.llm {
        let client = LlmClient::new(LlmSettings::from_env()?, config.oracle_timeout())?;
        tracing::info!("Using LLM oracle ({})", client.model());
        builder = builder.oracle(Arc::new(LlmOracle::new(client)));
    }
    let processor = builder.build()?;

    // Drives the async entry point so a slow oracle never blocks a runtime thread
    let rt = Runtime::new()?;

    let mut snapshot = ContextSnapshot::player(args.name.clone())
        .with_location(args.location.clone())
        .with_mode(mode);

    println!("\n=== 修仙世界 命令引擎 ===");
    println!("输入命令（例如: 帮助、状态、攻击 妖兽、前往 青云城、修炼100天）");
    println!("控制命令: :mode <模式>  :at <地点>  :undo  :history  :stats  :help");
    println!();

    loop {
        print!("[{:?} @ {}] > ", snapshot.game_mode, snapshot.location);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(control) = input.strip_prefix(':') {
            handle_control(control, &processor, &mut snapshot);
            continue;
        }

        let result = rt.block_on(processor.process_async(input, &snapshot));
        print_result(&result, args.json);
        snapshot.apply_events(&result.events);

        if !result.continue_processing {
            break;
        }
    }

    tracing::info!("Command engine shutting down");
    Ok(())
}

fn handle_control(control: &str, processor: &CommandProcessor, snapshot: &mut ContextSnapshot) {
    let mut parts = control.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("mode"), Some(name)) => match GameMode::from_name(name) {
            Some(mode) => {
                snapshot.game_mode = mode;
                println!("模式切换为 {:?}", mode);
            }
            None => println!("未知模式: {}", name),
        },
        (Some("at"), Some(location)) => {
            snapshot.location = location.to_string();
            println!("你现在位于 {}", location);
        }
        (Some("undo"), _) => match processor.undo_last() {
            Some(result) => {
                print_result(&result, false);
                snapshot.apply_events(&result.events);
            }
            None => println!("没有可以撤销的操作"),
        },
        (Some("history"), _) => {
            for entry in processor.recent_history(10) {
                let mark = if entry.success { "✓" } else { "✗" };
                println!(
                    "  {} {:<16} {:<12} {}ms",
                    mark, entry.raw_input, entry.parsed_type, entry.duration_ms
                );
            }
        }
        (Some("stats"), _) => {
            let stats = processor.classifier_stats();
            match serde_json::to_string_pretty(&stats) {
                Ok(text) => println!("{}", text),
                Err(e) => println!("无法显示统计: {}", e),
            }
        }
        (Some("help"), _) => println!("{}", processor.help(None)),
        _ => println!("未知控制命令: :{}", control),
    }
}

fn print_result(result: &CommandResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("无法序列化结果: {}", e),
        }
        return;
    }

    let mark = if result.success { "" } else { "✗ " };
    println!("{}{}", mark, result.render());
}
