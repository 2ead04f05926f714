//! MeteoPulse ETL - weather and covid data pipeline

use anyhow::Result;
use clap::Parser;
use pulse_common::logging::{init_logging, LogConfig, LogLevel};
use pulse_etl::audit::ErrorManager;
use pulse_etl::extract::{CovidExtractor, RawStore, RetryingClient, WeatherExtractor};
use pulse_etl::{db, transform, CountryDirectory, EtlConfig};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pulse-etl")]
#[command(author, version, about = "Weather and covid ETL pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Countries to process (defaults to all known countries)
    #[arg(short, long, global = true)]
    country: Vec<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Fetch raw data from the upstream APIs and split it into daily files
    Extract,

    /// Validate extracted daily files and load them into the fact tables
    Transform,

    /// Extract then transform in one pass
    Run,

    /// Extract the configured historical range with concurrent workers
    Backfill,
}

struct Pipeline {
    pool: SqlitePool,
    config: Arc<EtlConfig>,
    directory: Arc<CountryDirectory>,
    errors: Arc<ErrorManager>,
    weather: WeatherExtractor,
    covid: CovidExtractor,
}

impl Pipeline {
    async fn bootstrap() -> Result<Self> {
        let config = Arc::new(EtlConfig::from_env()?);
        let directory = Arc::new(CountryDirectory::default());

        let pool = db::connect(&db::DbConfig::new(&config.database_url)).await?;
        db::init_schema(&pool, &directory).await?;
        let counters = Arc::new(db::IdCounters::seed(&pool).await?);

        let errors = Arc::new(ErrorManager::new(Some(pool.clone())));
        let client = RetryingClient::new(pool.clone(), Arc::clone(&counters), &config)?;
        let store = RawStore::new(&config.data_dir, pool.clone(), Arc::clone(&counters));

        let weather = WeatherExtractor::new(
            client.clone(),
            store.clone(),
            Arc::clone(&directory),
            Arc::clone(&config),
            Arc::clone(&errors),
        );
        let covid = CovidExtractor::new(client, store, Arc::clone(&config), Arc::clone(&errors));

        Ok(Self {
            pool,
            config,
            directory,
            errors,
            weather,
            covid,
        })
    }

    fn countries(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.directory.names().into_iter().map(String::from).collect()
        } else {
            requested.to_vec()
        }
    }

    async fn extract(&self, countries: &[String], concurrent: bool) -> bool {
        if self.config.rapidapi_key.is_empty() {
            warn!("RAPIDAPI_KEY is not set; weather calls will fail and be recorded");
        }
        let weather_ok = if concurrent {
            self.weather.extract_all_concurrent(countries).await
        } else {
            self.weather.extract_all(countries).await
        };
        let covid_ok = if concurrent {
            self.covid.extract_all_concurrent(countries).await
        } else {
            self.covid.extract_all(countries).await
        };
        weather_ok && covid_ok
    }

    async fn transform(&self, countries: &[String]) -> transform::TransformTotals {
        transform::transform_all(&self.pool, &self.config, &self.errors, countries).await
    }

    async fn finish(&self) {
        let summary = self.errors.summary();
        if summary.total > 0 {
            warn!(
                total = summary.total,
                errors = summary.error,
                critical = summary.critical,
                "Run completed with recorded errors"
            );
        }
        self.pool.close().await;
    }
}

/// Logging configuration: `LOG_*` environment variables first, then the
/// CLI `--verbose` flag raises the level on top of whatever they chose.
fn logging_config(verbose: bool) -> Result<LogConfig> {
    let mut config = LogConfig::from_env()?;
    if config.log_file_prefix == LogConfig::default().log_file_prefix {
        config.log_file_prefix = "pulse-etl".to_string();
    }
    if verbose {
        config.level = LogLevel::Debug;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = logging_config(cli.verbose)?;
    init_logging(&log_config)?;

    let pipeline = Pipeline::bootstrap().await?;
    let countries = pipeline.countries(&cli.country);

    match cli.command {
        Command::Extract => {
            info!(?countries, "Starting extraction");
            if !pipeline.extract(&countries, false).await {
                warn!("Extraction completed with failures");
            }
        },
        Command::Transform => {
            info!(?countries, "Starting transformation");
            let totals = pipeline.transform(&countries).await;
            info!(covid = totals.covid, weather = totals.weather, "Records processed");
        },
        Command::Run => {
            info!(?countries, "Starting full pipeline run");
            if !pipeline.extract(&countries, false).await {
                warn!("Extraction completed with failures");
            }
            let totals = pipeline.transform(&countries).await;
            info!(covid = totals.covid, weather = totals.weather, "Records processed");
        },
        Command::Backfill => {
            info!(?countries, "Starting historical backfill");
            if !pipeline.extract(&countries, true).await {
                warn!("Backfill completed with failures");
            }
        },
    }

    pipeline.finish().await;
    info!("Done");
    Ok(())
}
