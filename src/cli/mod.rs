use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `tapestry` - run agent plans and deferred prompts.
#[derive(Parser, Debug)]
#[command(name = "tapestry")]
#[command(version)]
#[command(about = "Concurrent agent plans and deferred prompts.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.tapestry/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate a plan file, then print its execution order
    Validate {
        /// Path to a plan JSON file
        plan: PathBuf,
    },

    /// Execute a plan file against the configured agents
    Run {
        /// Path to a plan JSON file
        plan: PathBuf,

        /// User message that starts the conversation
        #[arg(short, long)]
        message: String,
    },

    /// Schedule a prompt and print its answers until Ctrl-C
    Schedule {
        /// Prompt to run when the task fires
        #[arg(short, long)]
        message: String,

        /// Delay before firing, formatted as [D.]HH:MM:SS
        #[arg(long)]
        after: String,

        /// Fire again after every delay
        #[arg(long)]
        recurring: bool,
    },
}
