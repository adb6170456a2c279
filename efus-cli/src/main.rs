//! # efus CLI
//!
//! Command-line interface for checking and running efus markup files.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "efus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = efus_core::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and report syntax errors
    Check {
        /// Source file
        file: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the instruction tree of a file
    Tree {
        /// Source file
        file: PathBuf,
    },

    /// Evaluate a file against the demo widgets and print the component tree
    Run {
        /// Source file
        file: PathBuf,

        /// Skip rendering, only build the tree
        #[arg(long)]
        no_render: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Check { file, json } => commands::check_file(&file, json),
        Commands::Tree { file } => commands::print_tree(&file),
        Commands::Run { file, no_render } => commands::run_file(&cli.config, &file, !no_render),
    }
}
