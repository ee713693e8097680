//! Insights CLI - data preparation for the holoviz-insights dashboards
//!
//! Fetches, enriches and reshapes GitHub issue and release data.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use insights_core::{Config, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ConvertArgs, ProcessArgs, ReleasesArgs, SummaryArgs, UpdateIssuesArgs};

/// holoviz-insights: GitHub issue and release metrics
#[derive(Parser, Debug)]
#[command(name = "insights")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// GitHub REST API base URL (overrides config and env)
    #[arg(long, global = true, env = "INSIGHTS_API_URL")]
    api_url: Option<String>,

    /// Data directory (overrides config and env)
    #[arg(long, global = true, env = "INSIGHTS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Enrich an issue-metrics JSON file from GitHub
    #[command(visible_alias = "update")]
    UpdateIssues(UpdateIssuesArgs),

    /// Convert issue-metrics JSON to Parquet
    Convert(ConvertArgs),

    /// Fetch and classify releases into CSV
    Releases(ReleasesArgs),

    /// Refresh every configured repository
    Process(ProcessArgs),

    /// Print headline metrics for an enriched dataset
    Summary(SummaryArgs),

    /// Show current configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.api_url.clone(), cli.data_dir.clone())?;

    if cli.verbose {
        tracing::debug!(
            api_url = %config.github.api_url,
            data_dir = %config.data.dir.display(),
            repos = config.repos.len(),
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("insights {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::UpdateIssues(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Convert(args)) => {
            args.execute()?;
        }
        Some(Commands::Releases(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Process(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Summary(args)) => {
            args.execute()?;
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("holoviz-insights - GitHub issue and release metrics");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("Insights Configuration");
    println!("======================");
    println!();
    println!("GitHub:");
    println!("  api_url: {}", config.github.api_url);
    println!("  per_page: {}", config.github.per_page);
    println!("  user_agent: {}", config.github.user_agent);
    println!();
    println!("Retry:");
    println!("  max_attempts: {}", config.retry.max_attempts);
    println!("  backoff: {}", humanize(config.retry.backoff));
    println!(
        "  rate_limit_fallback: {}",
        humanize(config.retry.rate_limit_fallback)
    );
    println!(
        "  max_rate_limit_waits: {}",
        config.retry.max_rate_limit_waits
    );
    println!("  throttle: {}", humanize(config.retry.throttle));
    println!();
    println!("Data directory: {}", config.data.dir.display());
    println!();
    println!("Repositories:");
    for repo in &config.repos {
        println!(
            "  {} ({}): {}",
            repo.name,
            repo.repo,
            repo.maintainer_set().to_sorted_vec().join(", ")
        );
    }
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    let token = match Secrets::resolve_github_token() {
        Ok(Some(_)) => "configured".to_string(),
        Ok(None) => "not found".to_string(),
        Err(e) => format!("unreadable ({})", e),
    };
    println!("GitHub token: {}", token);
}

fn humanize(d: std::time::Duration) -> String {
    humantime::format_duration(d).to_string()
}
