//! Nick Forge - username generation and availability checking
//!
//! Generates random usernames and checks them against avatar and profile
//! services until enough free names are found. Found names go to stdout,
//! progress and logs to stderr.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, CustomType, Select, Text};
use tracing_subscriber::EnvFilter;

use nick_forge::{
    export, Algorithm, ConcurrencyTier, GenerationConfig, HttpProbe, NickForgeError, ProbeConfig,
    RunConfig, RunSummary, Scheduler, StatsSnapshot,
};

/// `nick-forge` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nick-forge",
    about = "Generate random usernames and find ones that are still free",
    version
)]
struct CliArgs {
    /// Shortest name to generate (3-16).
    #[arg(long = "min", value_name = "len", default_value_t = 3)]
    min_length: usize,
    /// Longest name to generate (3-16).
    #[arg(long = "max", value_name = "len", default_value_t = 5)]
    max_length: usize,
    /// pronounceable, mixed, alphabetic or numeric-suffixed.
    #[arg(short, long, default_value = "alphabetic", value_parser = parse_algorithm)]
    algorithm: Algorithm,
    /// Fixed prefix of up to 3 letters.
    #[arg(short, long, default_value = "")]
    prefix: String,
    /// Occasionally replace an inner character with an underscore.
    #[arg(long)]
    underscore: bool,
    /// Number of free names to find (1-10000).
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,
    /// Allow 60 checks in flight instead of 15.
    #[arg(long)]
    turbo: bool,
    /// Skip the profile lookup and trust the avatar check alone.
    #[arg(long)]
    no_confirm: bool,
    /// Directory for the saved name list.
    #[arg(long, value_name = "dir", default_value = "output")]
    output_dir: PathBuf,
    /// Do not save the name list to a file.
    #[arg(long)]
    no_save: bool,
    /// Write a JSON run report to this path.
    #[arg(long, value_name = "path")]
    report: Option<PathBuf>,
    /// Ask for the settings interactively.
    #[arg(short, long)]
    interactive: bool,
    /// More log output (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    if let Err(e) = nick_forge::init() {
        eprintln!("{}", e.user_message());
        process::exit(1);
    }

    let args = CliArgs::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        match e.downcast_ref::<NickForgeError>() {
            Some(err) => {
                eprintln!("{}", err.user_message());
                process::exit(if err.is_user_error() { 2 } else { 1 });
            }
            None => {
                eprintln!("❌ Error: {:#}", e);
                process::exit(1);
            }
        }
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "nick_forge=warn",
        1 => "nick_forge=info",
        _ => "nick_forge=debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, String> {
    raw.parse().map_err(|e: NickForgeError| e.to_string())
}

/// Main checking workflow
async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = if args.interactive {
        prompt_settings(&args)?
    } else {
        settings_from_args(&args)
    };

    let mut probe_config = ProbeConfig::from_env()?;
    if args.no_confirm {
        probe_config.profile_url = None;
    }
    let probe = Arc::new(HttpProbe::with_config(probe_config));

    eprintln!(
        "🔎 Looking for {} free name(s): {} chars, {}{}{}",
        config.target_count,
        length_range(&config.generation),
        config.generation.algorithm,
        if config.generation.prefix.is_empty() {
            String::new()
        } else {
            format!(", prefix '{}'", config.generation.prefix.to_lowercase())
        },
        if config.tier == ConcurrencyTier::Turbo { ", turbo" } else { "" },
    );

    let mut handle = Scheduler::new(probe, config.clone()).start()?;

    let progress = progress_bar(config.target_count as u64);
    let mut refresh = tokio::time::interval(Duration::from_millis(250));
    let mut stopping = false;

    loop {
        tokio::select! {
            result = handle.recv() => match result {
                Some(result) => progress.suspend(|| println!("{}", result.candidate)),
                None => break,
            },
            _ = refresh.tick() => update_progress(&progress, &handle.snapshot()),
            signal = tokio::signal::ctrl_c(), if !stopping => {
                signal.context("failed to listen for Ctrl-C")?;
                stopping = true;
                progress.set_message("stopping, waiting for in-flight checks...");
                handle.stop();
            }
        }
    }
    progress.finish_and_clear();

    let summary = handle.wait().await?;
    print_summary(&summary);

    if !args.no_save && !summary.accepted.is_empty() {
        let path = export::write_list(&args.output_dir, &summary.accepted)?;
        eprintln!("💾 Saved list to {}", path.display());
    }
    if let Some(report) = &args.report {
        export::write_report(report, &summary)?;
        eprintln!("📝 Wrote report to {}", report.display());
    }

    Ok(())
}

fn settings_from_args(args: &CliArgs) -> RunConfig {
    RunConfig {
        generation: GenerationConfig {
            min_length: args.min_length,
            max_length: args.max_length,
            algorithm: args.algorithm,
            prefix: args.prefix.clone(),
            insert_separator: args.underscore,
        },
        target_count: args.count,
        tier: if args.turbo {
            ConcurrencyTier::Turbo
        } else {
            ConcurrencyTier::Normal
        },
        ..RunConfig::default()
    }
}

/// Ask for the run settings, using the command line values as defaults
fn prompt_settings(args: &CliArgs) -> anyhow::Result<RunConfig> {
    let min_length = CustomType::<usize>::new("Minimum length:")
        .with_default(args.min_length)
        .with_help_message("3-16 characters")
        .prompt()?;
    let max_length = CustomType::<usize>::new("Maximum length:")
        .with_default(args.max_length.max(min_length))
        .with_help_message("3-16 characters, not below the minimum")
        .prompt()?;

    let cursor = Algorithm::ALL
        .iter()
        .position(|a| *a == args.algorithm)
        .unwrap_or(0);
    let algorithm = Select::new("Algorithm:", Algorithm::ALL.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?;

    let prefix = Text::new("Prefix:")
        .with_default(&args.prefix)
        .with_help_message("Up to 3 letters, leave empty for none")
        .prompt()?;
    let insert_separator = Confirm::new("Sprinkle in underscores?")
        .with_default(args.underscore)
        .prompt()?;
    let count = CustomType::<usize>::new("How many free names?")
        .with_default(args.count)
        .with_help_message("1-10000")
        .prompt()?;
    let turbo = Confirm::new("Turbo mode (60 checks in flight)?")
        .with_default(args.turbo)
        .prompt()?;

    Ok(settings_from_args(&CliArgs {
        min_length,
        max_length,
        algorithm,
        prefix,
        underscore: insert_separator,
        count,
        turbo,
        ..args.clone()
    }))
}

fn progress_bar(target: u64) -> ProgressBar {
    let progress = ProgressBar::new(target);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

fn update_progress(progress: &ProgressBar, snapshot: &StatsSnapshot) {
    progress.set_position(snapshot.found);
    let cooling = if snapshot.cooling_down { " · cooling down" } else { "" };
    progress.set_message(format!(
        "{} tried · {:.0}/s · {} in flight{}",
        snapshot.attempts, snapshot.attempts_per_second, snapshot.in_flight, cooling
    ));
}

fn length_range(generation: &GenerationConfig) -> String {
    if generation.min_length == generation.max_length {
        generation.min_length.to_string()
    } else {
        format!("{}-{}", generation.min_length, generation.max_length)
    }
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("📈 Summary:");
    eprintln!("   ✅ Found: {} / {}", summary.found_count, summary.target_count);
    eprintln!("   📊 Names checked: {}", summary.attempt_count);
    eprintln!("   ⚡ Rate: {:.1} checks/s", summary.attempts_per_second);
    if summary.rate_limited > 0 {
        eprintln!(
            "   ⏱️  Rate limited: {} ({} cooldown(s))",
            summary.rate_limited, summary.cooldowns
        );
    }
    eprintln!("   ⏱️  Total time: {:.2}s", summary.elapsed.as_secs_f32());

    if summary.stopped_by_user {
        eprintln!("🛑 Stopped early");
    } else if summary.completed() {
        eprintln!("🎉 Found every name you asked for!");
    }
}
