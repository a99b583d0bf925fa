//! carto-sql CLI
//!
//! Runs statements against a CARTO account and bulk-loads GeoJSON files.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use carto_sql::{features_from_geojson, BulkOptions, Client, ClientConfig, ExecOptions, Execution};
use carto_sql_core::TimeZone;

/// Client for CARTO's SQL API.
#[derive(Parser)]
#[command(name = "carto-sql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file with `username`/`base_url` and `api_key`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account name; the API root becomes https://<user>.carto.com/api/v2.
    #[arg(short, long, env = "CARTO_USER")]
    user: Option<String>,

    /// API key.
    #[arg(short = 'k', long, env = "CARTO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API root, overriding --user.
    #[arg(long, env = "CARTO_BASE_URL")]
    base_url: Option<String>,

    /// Timezone for timestamps: `local`, `Z` or an offset like `+02:00`.
    #[arg(long)]
    timezone: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL statement and print the rows as JSON lines.
    Query {
        /// The statement.
        sql: String,

        /// Submit as a batch job and wait for it.
        #[arg(long)]
        batch: bool,

        /// Statement the batch job runs on success.
        #[arg(long, requires = "batch")]
        on_success: Option<String>,

        /// Statement the batch job runs on failure.
        #[arg(long, requires = "batch")]
        on_error: Option<String>,
    },

    /// Load a GeoJSON Feature or FeatureCollection into a table.
    Import {
        /// GeoJSON file.
        file: PathBuf,

        /// Target table.
        #[arg(short, long)]
        table: String,

        /// Create the table from the first feature.
        #[arg(long)]
        create: bool,

        /// Rows per insert.
        #[arg(long, default_value_t = 50)]
        batch_size: usize,

        /// Inserts allowed in flight at once.
        #[arg(long, default_value_t = 10)]
        max_in_progress: usize,
    },
}

fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let file = match &cli.config {
        Some(path) => Some(ClientConfig::from_json_file(path)?),
        None => None,
    };

    let endpoint = match (&cli.base_url, &cli.user) {
        (Some(base_url), _) => Some(base_url.clone()),
        (None, Some(user)) => Some(ClientConfig::for_user(user, "").base_url),
        (None, None) => None,
    };

    let mut config = match (endpoint, file) {
        (Some(endpoint), file) => {
            let api_key = cli
                .api_key
                .clone()
                .or_else(|| file.as_ref().map(|f| f.api_key.clone()));
            let Some(api_key) = api_key else {
                bail!("an API key is required (--api-key or CARTO_API_KEY)");
            };
            let config = ClientConfig::new(endpoint, api_key);
            match file {
                Some(file) => config
                    .with_timezone(file.timezone)
                    .with_poll_interval(file.poll_interval),
                None => config,
            }
        }
        (None, Some(file)) => file,
        (None, None) => bail!("no endpoint configured: pass --config, --user or --base-url"),
    };

    if let Some(key) = &cli.api_key {
        config.api_key.clone_from(key);
    }
    if let Some(tz) = &cli.timezone {
        config.timezone = tz
            .parse::<TimeZone>()
            .with_context(|| format!("invalid --timezone {tz}"))?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = Client::new(client_config(&cli)?)?;

    match cli.command {
        Commands::Query {
            sql,
            batch,
            on_success,
            on_error,
        } => {
            let options = ExecOptions {
                batch,
                on_success,
                on_error,
            };
            match client.execute_sql(&sql, &options).await? {
                Execution::Rows(rows) => {
                    for row in &rows {
                        println!("{}", serde_json::to_string(row)?);
                    }
                    info!("{} rows", rows.len());
                }
                Execution::Job(summary) => {
                    info!("Job {} done after {} polls.", summary.job_id, summary.polls);
                }
            }
        }

        Commands::Import {
            file,
            table,
            create,
            batch_size,
            max_in_progress,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let geojson: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let features = features_from_geojson(geojson)?;
            info!("Importing {} features into {table}...", features.len());

            let options = BulkOptions::new()
                .batch_size(batch_size)
                .max_in_progress(max_in_progress)
                .create(create);
            let summary = client
                .bulk_insert(&table, futures::stream::iter(features), options)
                .await?;
            info!(
                "Inserted {} rows in {} chunks{}.",
                summary.rows,
                summary.chunks,
                if summary.table_created {
                    " (table created)"
                } else {
                    ""
                }
            );
        }
    }

    Ok(())
}
