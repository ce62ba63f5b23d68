//! agentspans - reconstruct sub-agent spans from Claude Code session logs
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/agentspans/ (~/.local/state/agentspans/)
//! - Config: $XDG_CONFIG_HOME/agentspans/config.toml (~/.config/agentspans/config.toml)

use agentspans_core::{
    aggregate_waves, discover_streams, reconstruct_file, AgentSpan, BatchReconstructor,
    BatchResult, Config, SawSession,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "agentspans")]
#[command(about = "Reconstruct sub-agent spans from Claude Code session logs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconstruct the spans of a single session log
    Spans {
        /// Path to a session JSONL file
        file: PathBuf,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Group SAW-tagged spans of every session into waves
    Waves {
        /// Claude Code root (defaults to config or ~/.claude)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum number of session logs open at once
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Reconstruct every session and summarize per stream
    Scan {
        /// Claude Code root (defaults to config or ~/.claude)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Maximum number of session logs open at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print per-line warnings
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown output format '{}' (expected text or json)", other),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        agentspans_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("agentspans starting");

    match args.command {
        Command::Spans { file, format } => run_spans(&file, OutputFormat::parse(&format)?),
        Command::Waves { root, format, jobs } => {
            let format = OutputFormat::parse(&format)?;
            let result = run_batch(&config, root, jobs, false)?;
            print_batch_errors(&result);
            print_waves(&aggregate_waves(&result.spans), format)
        }
        Command::Scan {
            root,
            jobs,
            verbose,
        } => {
            let result = run_batch(&config, root, jobs, true)?;
            print_scan(&result, verbose);
            Ok(())
        }
    }
}

fn run_spans(file: &Path, format: OutputFormat) -> Result<()> {
    let report = reconstruct_file(file)
        .with_context(|| format!("failed to read session log {}", file.display()))?;

    for warning in &report.warnings {
        tracing::warn!(path = %file.display(), "{}", warning);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.spans)?);
        }
        OutputFormat::Text => {
            println!(
                "Session {}: {} span(s), {} line(s) skipped",
                report.session_id,
                report.spans.len(),
                report.lines_skipped
            );
            for span in &report.spans {
                println!("  {}", format_span(span));
            }
        }
    }

    Ok(())
}

/// Discover and reconstruct every session under the Claude root.
fn run_batch(
    config: &Config,
    root: Option<PathBuf>,
    jobs: Option<usize>,
    show_progress: bool,
) -> Result<BatchResult> {
    let root = root.unwrap_or_else(|| config.claude_root());
    let sources = discover_streams(&root)
        .with_context(|| format!("failed to discover session logs under {}", root.display()))?;

    let jobs = jobs.unwrap_or(config.scan.max_open_streams);
    let batch = BatchReconstructor::new(jobs).context("failed to start workers")?;

    if !show_progress {
        return Ok(batch.reconstruct_all(&sources));
    }

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let result = batch.reconstruct_all_with_progress(&sources, |done, _total, path| {
        pb.set_position(done as u64);
        pb.set_message(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("...")
                .to_string(),
        );
    });

    pb.finish_and_clear();
    Ok(result)
}

fn format_span(span: &AgentSpan) -> String {
    let status = if span.is_complete() || span.killed {
        span.status().as_str()
    } else {
        "incomplete"
    };
    let started = span
        .started_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{} {:<10} {:<18} {:>8} {}{}",
        started,
        status,
        span.agent_type,
        format_duration(span.duration_ms),
        span.description,
        if span.background { " (background)" } else { "" }
    )
}

fn format_duration(duration_ms: Option<i64>) -> String {
    match duration_ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{}ms", ms),
        Some(ms) if ms < 60_000 => format!("{:.1}s", ms as f64 / 1000.0),
        Some(ms) => format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000),
    }
}

fn print_waves(sessions: &[SawSession], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No SAW-tagged agent runs found.");
        return Ok(());
    }

    for session in sessions {
        println!(
            "Session {} ({}) - {} agent(s)",
            session.session_id,
            session.project_id.as_deref().unwrap_or("unknown project"),
            session.total_agents
        );
        for wave in &session.waves {
            println!(
                "  Wave {} - {} agent(s), {}",
                wave.wave,
                wave.agents.len(),
                format_duration(wave.duration_ms)
            );
            for run in &wave.agents {
                println!(
                    "    {:<12} {:<10} {:>8} {}",
                    run.agent,
                    run.status.as_str(),
                    format_duration(run.duration_ms),
                    run.agent_type
                );
            }
        }
    }

    Ok(())
}

fn print_batch_errors(result: &BatchResult) {
    for (path, error) in &result.errors {
        eprintln!("warning: skipped {}: {}", path.display(), error);
    }
}

fn print_scan(result: &BatchResult, verbose: bool) {
    println!("Scanned {} session log(s):", result.streams.len());
    for stream in &result.streams {
        println!(
            "  {:<40} {:>4} span(s) {:>6} line(s) {:>3} skipped",
            stream.session_id, stream.spans, stream.lines_read, stream.lines_skipped
        );
    }

    let killed = result.spans.iter().filter(|s| s.killed).count();
    let incomplete = result.spans.iter().filter(|s| !s.is_complete()).count();
    println!(
        "\nTotal: {} span(s), {} killed, {} incomplete",
        result.spans.len(),
        killed,
        incomplete
    );

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for (path, error) in &result.errors {
            println!("  {}: {}", path.display(), error);
        }
    }

    if verbose && !result.warnings.is_empty() {
        println!("\nWarnings ({}):", result.warnings.len());
        for warning in &result.warnings {
            println!("  {}", warning);
        }
    }

    tracing::info!(
        streams = result.streams.len(),
        spans = result.spans.len(),
        errors = result.errors.len(),
        "agentspans scan complete"
    );
}
