// Leaderkey CLI
// Validates a sequence config and replays scripted key events through it

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use leaderkey_core::{Config, KeyPosition, Leader, Registry, Replay};

/// Leader key sequence matcher
#[derive(Parser, Debug)]
#[command(name = "leaderkey")]
#[command(author = "leaderkey contributors")]
#[command(version)]
#[command(about = "Replay key events through a leader key sequence matcher", long_about = None)]
struct Args {
    /// TOML sequence configuration (defaults to the user config directory)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Event script to replay
    #[arg(short, long, value_name = "SCRIPT")]
    events: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print every key position's sequences in priority order
    #[arg(long)]
    print_registry: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn resolve_config_path(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(path) = &args.config {
        return Ok(path.clone());
    }
    Config::default_path().context("no --config given and no user config directory found")
}

fn print_registry(registry: &Registry) {
    println!(
        "{} sequences over {} key positions:",
        registry.len(),
        registry.keymap_len()
    );
    for position in (0..registry.keymap_len()).map(KeyPosition) {
        let bucket: Vec<String> = registry
            .lookup(position)
            .map(|(_, def)| def.to_string())
            .collect();
        if !bucket.is_empty() {
            println!("  {:>3}: {}", position, bucket.join(", "));
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = resolve_config_path(&args)?;
    let config = Config::from_toml_path(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let registry = config
        .build_registry()
        .with_context(|| format!("invalid sequences in {}", config_path.display()))?;
    log::info!(
        "Loaded {} leader sequences from {}",
        registry.len(),
        config_path.display()
    );

    if args.print_registry {
        print_registry(&registry);
    }

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    let Some(events_path) = &args.events else {
        if args.print_registry {
            return Ok(());
        }
        bail!("--events is required unless --check-config or --print-registry is given");
    };

    let script = std::fs::read_to_string(events_path)
        .with_context(|| format!("failed to read {}", events_path.display()))?;
    let mut replay = Replay::with_leader(Leader::new(registry), config.leader);
    let report = replay
        .run_script(&script)
        .with_context(|| format!("failed to replay {}", events_path.display()))?;

    for step in &report.steps {
        println!("{}", step);
    }
    if replay.leader().is_active() {
        println!("leader still active at end of script");
    }
    Ok(())
}
