//! Ken - kenning walker
//!
//! CLI entry point for waking agents and inspecting kennings.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use kenwake::cli::{Cli, Command, OutputFormat};
use kenwake::config::Config;
use kenwake::kenning::Kenning;
use kenwake::llm::create_client;
use kenwake::reflection::ReflectionStore;
use kenwake::wake::WakeSession;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ken")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("ken.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Wake {
            ken,
            task,
            kens_dir,
            reflections_dir,
            quiet,
        } => cmd_wake(config, &ken, &task, kens_dir, reflections_dir, quiet).await,
        Command::Frames { ken, kens_dir, format } => cmd_frames(config, &ken, kens_dir, format),
    }
}

/// Load a ken's kenning, honoring a `--kens-dir` override
fn load_kenning(config: &mut Config, ken: &str, kens_dir: Option<PathBuf>) -> Result<Kenning> {
    if let Some(dir) = kens_dir {
        config.wake.kens_dir = dir;
    }

    let path = config.wake.kenning_path(ken);
    debug!(?path, "load_kenning: called");
    if !path.exists() {
        bail!("Kenning not found: {}", path.display());
    }

    Kenning::load(&path)
}

/// Walk the frames, deliver the task, save the reflection
async fn cmd_wake(
    mut config: Config,
    ken: &str,
    task: &str,
    kens_dir: Option<PathBuf>,
    reflections_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    debug!(%ken, %task, quiet, "cmd_wake: called");
    let narrate = !quiet;

    let kenning = load_kenning(&mut config, ken, kens_dir)?;

    if narrate {
        println!("{} {}", "Waking agent with kenning:".bold(), ken.cyan());
        println!("  Task: {}", task);
        println!("  Model: {}", config.llm.model);
        println!("\nLoaded {} frames", kenning.frames.len());
    }

    if kenning.is_empty() {
        bail!("No frames found in kenning");
    }

    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let session = WakeSession::from_config(llm.clone(), &config.wake).with_narration(narrate);
    let outcome = session.run(&kenning, task).await?;

    let base_dir = reflections_dir.unwrap_or_else(|| config.wake.reflections_dir.clone());
    let path = ReflectionStore::new(base_dir).save(ken, task, &outcome.reflection)?;

    println!(
        "\n{} Session complete. Reflection saved to: {}",
        "✓".green(),
        path.display().to_string().cyan()
    );

    if narrate {
        let usage = outcome.transcript.usage();
        println!(
            "  {}",
            format!(
                "{} turns, {} input / {} output tokens, ~${:.4}",
                outcome.transcript.len(),
                usage.input_tokens,
                usage.output_tokens,
                usage.cost_usd(llm.model())
            )
            .dimmed()
        );
    }

    info!(%ken, path = %path.display(), "cmd_wake: done");
    Ok(())
}

/// Print a kenning's frames without contacting the model
fn cmd_frames(mut config: Config, ken: &str, kens_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    debug!(%ken, ?format, "cmd_frames: called");
    let kenning = load_kenning(&mut config, ken, kens_dir)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&kenning)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Kenning:".bold(), kenning.identifier.cyan());
            if kenning.is_empty() {
                println!("  {}", "(no frames)".dimmed());
            }
            for frame in &kenning.frames {
                let lines = frame.prompt.lines().count();
                println!(
                    "  {:>3}  {}  {}",
                    frame.number.to_string().yellow(),
                    frame.title,
                    format!("({} lines)", lines).dimmed()
                );
            }
        }
    }

    Ok(())
}
