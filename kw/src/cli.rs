//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Ken - walk an agent through a kenning before it works
#[derive(Debug, Parser)]
#[command(
    name = "ken",
    about = "Wake an agent through a kenning, deliver a task, and save its reflection",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk an agent through a kenning, then give it a task
    Wake {
        /// Kenning path under the kens directory (e.g. core/foo)
        #[arg(value_name = "KEN")]
        ken: String,

        /// Task to deliver after the frames
        #[arg(short, long)]
        task: String,

        /// Directory holding kennings [default: from config]
        #[arg(long, value_name = "DIR")]
        kens_dir: Option<PathBuf>,

        /// Directory the reflections/ tree is written under [default: from config]
        #[arg(long, value_name = "DIR")]
        reflections_dir: Option<PathBuf>,

        /// Don't narrate the session
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show how a kenning splits into frames
    Frames {
        /// Kenning path under the kens directory (e.g. core/foo)
        #[arg(value_name = "KEN")]
        ken: String,

        /// Directory holding kennings [default: from config]
        #[arg(long, value_name = "DIR")]
        kens_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for the frames command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
