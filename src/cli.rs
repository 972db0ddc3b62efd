use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labelforge")]
#[command(author, version, about = "Batch annotation actions over frame ranges")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered actions and their parameters
    Actions,

    /// Run a chain of actions over a frame range of a session
    Run {
        /// Session dump (JSON) to operate on
        #[arg(short, long, required = true)]
        session: PathBuf,

        /// Action to run, as NAME or NAME:key=value,key=value (repeatable)
        #[arg(short, long = "action", value_name = "SPEC")]
        actions: Vec<String>,

        /// First frame, inclusive
        #[arg(long)]
        from: u32,

        /// Last frame, inclusive
        #[arg(long)]
        to: u32,

        /// Filter expressions (JSON object or array) selecting the shapes to handle
        #[arg(long)]
        filter: Option<PathBuf>,

        /// Write the resulting session here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
