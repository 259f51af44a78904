use anyhow::Result;
use clap::{Parser, Subcommand};
use oracle_core::classify::Classifier;
use oracle_core::config::Config;
use oracle_core::insights::to_insights;
use oracle_core::snapshot::Snapshot;
use oracle_fetch::{Aggregator, SnapshotCache};
use publish::DataPaths;
use schemars::schema_for;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eye-oracle")]
#[command(about = "Eye Oracle open-data aggregator and publisher", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "oracle.toml", env = "EYE_ORACLE_CONFIG")]
    config: PathBuf,

    /// Output directory for the public JSON stores (overrides config)
    #[arg(long, env = "EYE_ORACLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one aggregation pass and write the insights export
    Fetch {
        /// Also record fetched datasets in the SQLite archive
        #[arg(long)]
        archive: bool,
        /// Directory for the insights export (overrides the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Regenerate the posts and alerts stores from the verified issues
    Publish {
        /// YAML file replacing the bundled verified issues
        #[arg(long)]
        issues: Option<PathBuf>,
    },
    /// Full daily batch: fetch, archive, insights, communities, posts, report
    Report {
        #[arg(long)]
        issues: Option<PathBuf>,
    },
    /// Keep serving snapshots through the cache, rewriting insights on refresh
    Watch {
        /// Seconds between cache reads
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
    /// List the effective connector table
    Sources,
    /// Export JSON Schemas for the published record types
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "eye_oracle={0},oracle_core={0},oracle_fetch={0},publish={0}",
                cli.log_level
            ))
        }))
        .init();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.general.data_dir = dir;
    }

    match cli.command {
        Commands::Fetch { archive, out } => {
            if let Some(out) = out {
                config.general.data_dir = out;
            }
            fetch(&config, archive).await
        }
        Commands::Publish { issues } => publish_cmd(&config, issues).await,
        Commands::Report { issues } => report(&config, issues).await,
        Commands::Watch { interval_secs } => {
            watch(&config, Duration::from_secs(interval_secs.max(1))).await
        }
        Commands::Sources => {
            list_sources(&config);
            Ok(())
        }
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
    }
}

fn classifier(config: &Config) -> Result<Classifier> {
    match &config.general.categories {
        Some(path) => Classifier::load(path),
        None => Ok(Classifier::default()),
    }
}

fn data_paths(config: &Config) -> Result<DataPaths> {
    let paths = DataPaths::new(&config.general.data_dir);
    paths.ensure()?;
    Ok(paths)
}

fn log_errors(snapshot: &Snapshot) {
    for error in &snapshot.errors {
        warn!("{error}");
    }
}

fn archive_snapshot(config: &Config, snapshot: &Snapshot) -> Result<usize> {
    let mut conn = oracle_core::archive::open(&config.general.archive_db)?;
    let new_count = oracle_core::archive::archive_all(&mut conn, snapshot.datasets())?;
    let total = oracle_core::archive::dataset_count(&conn)?;
    info!(new = new_count, total, "archived datasets");
    Ok(new_count)
}

/// Store and archive I/O is synchronous; keep it off the runtime threads.
async fn blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await?
}

async fn fetch(config: &Config, archive: bool) -> Result<()> {
    let classifier = classifier(config)?;
    let paths = data_paths(config)?;
    let snapshot = Aggregator::from_config(config)?.run().await;
    log_errors(&snapshot);

    let config = config.clone();
    let insights_path = paths.insights.clone();
    let (snapshot, count) = blocking(move || {
        if archive {
            archive_snapshot(&config, &snapshot)?;
        }
        let insights = to_insights(&snapshot, &classifier);
        let count = insights.len();
        publish::report::write_insights(&paths, &snapshot, insights, &oracle_core::now_iso())?;
        Ok((snapshot, count))
    })
    .await?;

    println!(
        "{}/{} connectors succeeded, {} insights written to {}",
        snapshot.success_count,
        snapshot.connector_count,
        count,
        insights_path.display()
    );
    Ok(())
}

async fn publish_cmd(config: &Config, issues_path: Option<PathBuf>) -> Result<()> {
    let paths = data_paths(config)?;
    let summary = blocking(move || {
        let issues = publish::issues::load_or_bundled(issues_path.as_deref())?;
        publish::posts::publish_issues(&paths, &issues, &oracle_core::now_iso())
    })
    .await?;
    println!(
        "Published {} posts ({} in store) and {} alerts ({} in store)",
        summary.posts_written, summary.posts_total, summary.alerts_written, summary.alerts_total
    );
    Ok(())
}

async fn report(config: &Config, issues_path: Option<PathBuf>) -> Result<()> {
    let classifier = classifier(config)?;
    let paths = data_paths(config)?;
    let issues = publish::issues::load_or_bundled(issues_path.as_deref())?;

    let snapshot = Aggregator::from_config(config)?.run().await;
    log_errors(&snapshot);

    let config = config.clone();
    let root = paths.root.clone();
    let error_count = snapshot.errors.len();
    let (daily, insight_count, communities, new_datasets) = blocking(move || {
        let new_datasets = archive_snapshot(&config, &snapshot)?;

        let now = time::OffsetDateTime::now_utc();
        let generated_at = oracle_core::format_iso(now);
        let insights = to_insights(&snapshot, &classifier);

        let communities = publish::communities::write_communities(
            &paths,
            &insights,
            classifier.fallback(),
            &generated_at,
        )?;
        publish::posts::publish_issues(&paths, &issues, &generated_at)?;
        let daily = publish::report::build_daily_report(&issues, &insights, new_datasets, now);
        publish::report::write_daily_report(&paths, &daily)?;
        let insight_count = insights.len();
        publish::report::write_insights(&paths, &snapshot, insights, &generated_at)?;
        Ok((daily, insight_count, communities, new_datasets))
    })
    .await?;

    println!("{}", daily.headline);
    println!(
        "{insight_count} insights, {communities} communities, {new_datasets} new datasets, {error_count} connector errors"
    );
    println!("Wrote stores to {}", root.display());
    Ok(())
}

async fn watch(config: &Config, interval: Duration) -> Result<()> {
    let classifier = classifier(config)?;
    let paths = data_paths(config)?;
    let cache = SnapshotCache::new(Aggregator::from_config(config)?, config.general.cache_ttl());
    info!(
        interval_secs = interval.as_secs(),
        ttl_secs = cache.ttl().as_secs(),
        "watching"
    );

    let mut last: Option<Arc<Snapshot>> = None;
    loop {
        let snapshot = cache.get().await;
        let is_new = last
            .as_ref()
            .is_none_or(|previous| !Arc::ptr_eq(previous, &snapshot));
        if is_new {
            log_errors(&snapshot);
            let (snapshot_ref, classifier, paths) =
                (Arc::clone(&snapshot), classifier.clone(), paths.clone());
            blocking(move || {
                let insights = to_insights(&snapshot_ref, &classifier);
                publish::report::write_insights(
                    &paths,
                    &snapshot_ref,
                    insights,
                    &oracle_core::now_iso(),
                )
            })
            .await?;
            last = Some(snapshot);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

fn list_sources(config: &Config) {
    for source in config.effective_sources() {
        let place = match (&source.city, &source.province) {
            (Some(city), Some(province)) => format!("{city}, {province}"),
            (None, Some(province)) => province.clone(),
            _ => "-".to_string(),
        };
        println!(
            "{:<12} {:<6} {:<22} {:<48} {}",
            source.jurisdiction.to_string(),
            format!("{:?}", source.kind).to_lowercase(),
            place,
            source.name,
            source.url
        );
    }
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let schemas = [
        ("DatasetRecord", schema_for!(oracle_core::schema::DatasetRecord)),
        ("BillRecord", schema_for!(oracle_core::schema::BillRecord)),
        ("NewsItem", schema_for!(oracle_core::schema::NewsItem)),
        ("Insight", schema_for!(oracle_core::schema::Insight)),
        ("VerifiedIssue", schema_for!(oracle_core::schema::VerifiedIssue)),
        ("ConnectorReport", schema_for!(oracle_core::snapshot::ConnectorReport)),
        ("Snapshot", schema_for!(oracle_core::snapshot::Snapshot)),
    ];
    for (name, schema) in schemas {
        let json = serde_json::to_string_pretty(&schema)?;
        fs::write(out_dir.join(format!("{name}.schema.json")), json)?;
    }

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
