mod check_cmd;
mod config;
mod generate_cmd;
mod serve_cmd;
mod show_cmd;

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use sous_core::generate::HeuristicGenerator;
use sous_core::recalc::LocalAdvisor;
use sous_store::MemoryStore;

use config::ServeConfig;
use serve_cmd::AppState;

#[derive(Parser)]
#[command(name = "sous", about = "Cooking session planner and live execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sous config file with server defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides SOUS_BIND env var)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides SOUS_PORT env var)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate a timeline from a meal JSON file
    Generate {
        /// Path to the meal JSON file
        file: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
    /// Validate a timeline JSON file and list its conflicts
    Check {
        /// Path to the timeline JSON file
        file: String,
    },
    /// Show a timeline's now/next/later view
    Show {
        /// Path to the timeline JSON file
        file: String,
        /// Pretend serve is this many minutes away instead of using the
        /// real clock
        #[arg(long)]
        minutes_to_serve: Option<i64>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execute the `sous init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  server.bind = {}", cfg.server.bind);
    println!("  server.port = {}", cfg.server.port);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Serve { bind, port } => {
            let resolved = ServeConfig::resolve(bind.as_deref(), port)?;
            let state = AppState::new(
                Arc::new(MemoryStore::new()),
                Arc::new(HeuristicGenerator::new()),
                Arc::new(LocalAdvisor::new()),
            );
            serve_cmd::run_serve(state, &resolved.bind, resolved.port).await?;
        }
        Commands::Generate { file, output } => {
            generate_cmd::run_generate(&file, output.as_deref()).await?;
        }
        Commands::Check { file } => {
            check_cmd::run_check(&file)?;
        }
        Commands::Show {
            file,
            minutes_to_serve,
        } => {
            show_cmd::run_show(&file, minutes_to_serve)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
