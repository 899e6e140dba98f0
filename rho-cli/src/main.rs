//! # rho CLI
//!
//! Command-line interface for the rho static site generator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rho")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "rho.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the output directory
    Build {
        /// Remove the output directory and build cache first
        #[arg(long)]
        clean: bool,

        /// Ignore and do not update the build cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Build, then rebuild incrementally on file changes
    Watch {
        /// Ignore and do not update the build cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Watch and serve the output directory over HTTP
    Serve {
        /// Server port (defaults to server.port from the config)
        #[arg(long)]
        port: Option<u16>,

        /// Ignore and do not update the build cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate every content file without writing output
    Check,

    /// Create a draft post skeleton
    New {
        /// Post slug (also used as the directory and file name)
        slug: String,

        /// Post title (defaults to the slug)
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
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
        Commands::Build { clean, no_cache } => commands::build_site(&cli.config, clean, no_cache),
        Commands::Watch { no_cache } => commands::watch_site(&cli.config, no_cache).await,
        Commands::Serve { port, no_cache } => {
            commands::serve_site(&cli.config, port, no_cache).await
        }
        Commands::Check => commands::check_site(&cli.config),
        Commands::New { slug, title } => {
            commands::new_post(&cli.config, &slug, title.as_deref()).map(|_| ())
        }
    }
}
