//! Rank Tracker CLI
//!
//! Local execution entry point. For the HTTP API, use `rank-tracker-server`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rank_tracker::{
    config::{Services, load_config, load_seed},
    error::Result,
    models::Config,
    pipeline::{SyncOutcome, SyncReport},
    storage::CredentialStore,
    utils::{self, log as report},
};

/// Rank Tracker - Search Console keyword rank sync
#[derive(Parser, Debug)]
#[command(
    name = "rank-tracker",
    version,
    about = "Syncs Search Console keyword rankings into a local store"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the OAuth consent URL
    AuthUrl,

    /// Exchange an authorization code and store the credential
    Login {
        /// Code from the OAuth redirect
        #[arg(long)]
        code: String,
    },

    /// Show whether a credential is stored
    Status,

    /// Sync N months back from the last finalized day
    Backfill {
        /// Site URL (default: first site of the account)
        #[arg(long)]
        site: Option<String>,

        /// Months to backfill (default from config)
        #[arg(long)]
        months: Option<u32>,
    },

    /// Sync the most recently finalized day
    Incremental {
        /// Site URL (default: first site of the account)
        #[arg(long)]
        site: Option<String>,
    },

    /// Import keywords from a seed file
    Seed {
        /// Path to the seed TOML file
        file: PathBuf,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::NoKeywords { site_url, range } => {
            log::warn!(
                "No keywords registered. Add keywords first (site {}, {}).",
                site_url,
                range
            );
        }
        SyncOutcome::Completed(SyncReport {
            site_url,
            range,
            reconcile,
            ..
        }) => {
            log::info!(
                "{}: {} rows, {} matched, {} upserted ({})",
                site_url,
                reconcile.total_rows,
                reconcile.matched,
                reconcile.written,
                range
            );
        }
    }
}

fn validate(config: &Config) {
    report::header("Configuration");
    let client_id = if config.gsc.client_id.is_empty() {
        "not set"
    } else {
        "set"
    };
    report::summary(
        "Configuration OK",
        &[
            ("database", config.database.path.clone()),
            ("credentials", config.credentials.path.clone()),
            ("page size", config.gsc.page_size.to_string()),
            ("backfill", format!("{} months", config.sync.backfill_months)),
            ("client id", client_id.to_string()),
        ],
    );
}

/// Run a command that needs the wired services.
async fn run(command: Command, services: Services) -> Result<()> {
    let today = utils::utc_today();

    match command {
        Command::AuthUrl => {
            let url = services.oauth.authorize_url()?;
            println!("{url}");
        }

        Command::Login { code } => {
            let credential = services.oauth.exchange_code(&code).await?;
            services.credentials.save(credential).await?;
            log::info!("Authenticated. Credential stored.");
        }

        Command::Status => {
            if services.credentials.is_authenticated().await {
                log::info!(
                    "Authenticated (credential at {})",
                    services.credentials.path().display()
                );
            } else {
                log::warn!("Not authenticated. Run 'auth-url' then 'login --code <code>'.");
            }
        }

        Command::Backfill { site, months } => {
            let outcome = services
                .sync
                .backfill(site.as_deref(), months, today)
                .await?;
            print_outcome(&outcome);
        }

        Command::Incremental { site } => {
            let outcome = services.sync.incremental(site.as_deref(), today).await?;
            print_outcome(&outcome);
        }

        Command::Seed { file } => {
            let seed = load_seed(&file)?;
            let summary = services.storage.import_seed(&seed)?;
            report::summary(
                "Seed imported",
                &[
                    ("categories", summary.categories.to_string()),
                    ("products", summary.products.to_string()),
                    ("keywords", summary.keywords.to_string()),
                ],
            );
        }

        // Handled in `main` before any service is opened.
        Command::Validate => unreachable!("validate does not open services"),
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Rank tracker starting...");

    let config = load_config(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Validate => validate(&config),
        command => run(command, Services::from_config(config).await?).await?,
    }

    log::info!("Done!");

    Ok(())
}
