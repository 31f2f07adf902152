//! namer-lookup - reconcile lookup responses with a file in the failed directory
//!
//! Reads raw lookup-source bodies from disk, scores every candidate against
//! the target file and prints the ordered result entries.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use namer_common::human_time::{format_duration_delta, format_duration_opt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use namer_lookup::duration::{DurationCache, SqliteDurationCache};
use namer_lookup::{DurationResolver, PerceptualHash, ResponseAggregator, ResultEntry, Seconds, SourceResponse};

/// Command-line arguments for namer-lookup
#[derive(Parser, Debug)]
#[command(name = "namer-lookup")]
#[command(about = "Score lookup-source candidates against a file in the failed directory")]
#[command(version)]
struct Args {
    /// Configuration file (falls back to NAMER_CONFIG, then ~/.config/namer/namer.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target file name, relative to the failed directory
    #[arg(short, long)]
    file: String,

    /// Perceptual hash of the target file, hex encoded
    #[arg(long)]
    phash: Option<String>,

    /// Duration used when the perceptual hash was computed, in seconds
    #[arg(long, requires = "phash")]
    phash_duration: Option<u64>,

    /// Print a human-readable summary instead of JSON
    #[arg(long)]
    summary: bool,

    /// Lookup responses as SOURCE=PATH, processed in the given order
    #[arg(required = true, value_parser = parse_source_arg)]
    responses: Vec<(String, PathBuf)>,
}

fn parse_source_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.rsplit_once('=') {
        Some((source, path)) if !source.is_empty() && !path.is_empty() => {
            Ok((source.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected SOURCE=PATH, got '{}'", arg)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed before the config is read so config loading can log; the
    // filter is narrowed to the configured level afterwards unless RUST_LOG is set
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = namer_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    if !from_env {
        filter_handle
            .reload(EnvFilter::new(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!("Failed directory: {}", config.failed_dir.display());

    let cache: Option<Arc<dyn DurationCache>> = match &config.database_path {
        Some(db_path) => {
            info!("Database: {}", db_path.display());
            let pool = namer_lookup::db::init_database_pool(db_path)
                .await
                .context("Failed to open duration cache")?;
            Some(Arc::new(SqliteDurationCache::new(pool)))
        }
        None => None,
    };

    let resolver = DurationResolver::from_config(&config, cache);
    let aggregator = ResponseAggregator::from_config(&config, resolver)
        .context("Invalid name_parser pattern")?;

    let fingerprint = match &args.phash {
        Some(hex) => {
            let hash = PerceptualHash::parse_hex(hex)
                .ok_or_else(|| anyhow!("Invalid perceptual hash: {}", hex))?;
            Some(PerceptualHash::new(hash, args.phash_duration.map(Seconds::new)))
        }
        None => None,
    };

    let mut responses = Vec::with_capacity(args.responses.len());
    for (source_id, path) in &args.responses {
        let body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read response {}", path.display()))?;
        responses.push(SourceResponse::new(source_id.as_str(), body));
    }

    let entries = aggregator
        .aggregate_with_fingerprint(&responses, &args.file, fingerprint.as_ref())
        .await;

    if args.summary {
        print_summary(&args.file, &entries);
    } else {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    Ok(())
}

fn print_summary(target: &str, entries: &[ResultEntry]) {
    let file_duration = entries.first().and_then(|e| e.file_duration).map(Seconds::get);
    println!("{} ({})", target, format_duration_opt(file_duration));

    if entries.is_empty() {
        println!("  no candidates");
        return;
    }

    for entry in entries {
        let scene = &entry.looked_up;
        let found = scene.duration.map(Seconds::get);
        let delta = format_duration_delta(file_duration, found)
            .map(|d| format!(" [{}]", d))
            .unwrap_or_default();
        let name = entry
            .match_result
            .name_match()
            .map(|n| format!("{:.1}", n))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {} {:<40} {:>8}{} name={} site={:?} date={:?}",
            if entry.match_result.is_match() { "*" } else { " " },
            scene.name,
            format_duration_opt(found),
            delta,
            name,
            entry.match_result.site_match(),
            entry.match_result.date_match(),
        );
    }
}
