//! folio-timeline - timeline data loader and diagnostics
//!
//! One-shot commands print JSON to stdout; `serve` runs the diagnostics
//! HTTP interface.
//!
//! Configuration priority: command line > environment > TOML file > defaults.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_common::config::{load_config, resolve_base_url};
use folio_timeline::{build_router, AppState, TimelineLoader};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "folio-timeline", version, about = "Timeline data loader and diagnostics")]
struct Cli {
    /// Timeline asset root, e.g. http://localhost:8080/timeline
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file (defaults to FOLIO_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Serve bundled data when the timeline host fails
    #[arg(long, global = true)]
    fallback: bool,

    /// Print loader stats to stderr after the command
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// HEAD the timeline index and report reachability
    Health,
    /// Load projects.json
    Index,
    /// Load one project descriptor
    Project { year: i32, slug: String },
    /// Load every project of one year
    Year { year: i32 },
    /// Load every project in the index
    All,
    /// Load a year's meta.json (or its default)
    Meta { year: i32 },
    /// Probe sequentially numbered images for a project
    Images { year: i32, slug: String },
    /// Run the diagnostics HTTP server
    Serve {
        #[arg(long, default_value = "127.0.0.1:5740")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    init_tracing(&toml_config.logging.level, cli.verbose);

    info!(
        "Starting folio-timeline v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut settings = toml_config.loader.clone();
    settings.base_url = resolve_base_url(cli.base_url.as_deref(), &toml_config);
    info!(base_url = %settings.base_url, "Timeline base URL");

    let loader = TimelineLoader::new(settings)?;
    let state = if cli.fallback {
        AppState::with_bundled_fallback(loader.clone())?
    } else {
        let remote = folio_timeline::RemoteSource::new(loader.clone());
        AppState::new(loader.clone(), std::sync::Arc::new(remote))
    };
    let outcome = run(cli.command, &loader, &state).await;

    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&loader.get_cache_stats().await)?);
    }

    outcome
}

async fn run(command: Command, loader: &TimelineLoader, state: &AppState) -> Result<()> {
    let source = &state.source;

    match command {
        Command::Health => {
            let report = loader.health_check().await;
            print_json(&report)?;
            if !report.is_healthy() {
                bail!("Timeline host is unhealthy");
            }
        }
        Command::Index => print_json(&source.index().await?)?,
        Command::Project { year, slug } => print_json(&source.project(year, &slug).await?)?,
        Command::Year { year } => print_json(&source.year_projects(year).await?)?,
        Command::All => print_json(&source.all_projects().await?)?,
        Command::Meta { year } => print_json(&loader.get_year_config(year).await)?,
        Command::Images { year, slug } => print_json(&loader.auto_detect_images(year, &slug).await)?,
        Command::Serve { bind } => {
            let app = build_router(state.clone());
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("Listening on http://{}", bind);
            info!("Health check: http://{}/health", bind);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// -v forces debug; otherwise RUST_LOG wins over the configured level
fn log_filter(configured_level: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

fn init_tracing(configured_level: &str, verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(configured_level, verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
