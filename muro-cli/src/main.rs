use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use muro_engine::{
    BatchConfig, BatchDownloader, BatchItem, CacheConfig, CacheManager, CatalogClient,
    CatalogConfig, DownloaderConfig, ImageDownloader, ProgressCallback, create_client,
};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod error;

use cli::{CliArgs, Command};
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let cache = Arc::new(
        CacheManager::new(CacheConfig {
            cache_dir: args.cache_dir.clone(),
            ttl: Duration::from_secs(args.ttl_days * 24 * 3600),
        })
        .await?,
    );

    match args.command {
        Command::Fetch {
            catalog_url,
            limit,
            delay_ms,
            timeout,
            no_progress,
        } => {
            let download_config = DownloaderConfig::builder()
                .with_timeout(Duration::from_secs(timeout))
                .build();
            let client = create_client(&download_config)?;

            let catalog = CatalogClient::new(client, CatalogConfig::new(catalog_url));
            let mut items = catalog.fetch().await?;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            if items.is_empty() {
                info!("Catalog is empty, nothing to cache");
                return Ok(());
            }
            info!(count = items.len(), "Caching catalog images");

            let downloader = Arc::new(ImageDownloader::with_config(
                cache.clone(),
                download_config,
            )?);
            let batch = BatchDownloader::with_config(
                downloader,
                BatchConfig {
                    inter_item_delay: Duration::from_millis(delay_ms),
                },
            );

            let bar = ProgressBar::new(items.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} {msg}")
                    .map_err(|e| AppError::Initialization(e.to_string()))?
                    .progress_chars("=> "),
            );
            if no_progress {
                bar.finish_and_clear();
            }

            let on_progress: Option<ProgressCallback> = if no_progress {
                None
            } else {
                let bar = bar.clone();
                Some(Arc::new(move |p| {
                    bar.set_position(p.completed as u64);
                }))
            };

            let batch_items = items
                .into_iter()
                .map(|item| BatchItem::new(item.id, item.original))
                .collect();
            let results = batch.run(batch_items, on_progress).await;
            bar.finish_and_clear();

            let cached = results.iter().filter(|r| r.cached).count();
            let failed = results.len() - cached;
            info!(cached, failed, "Batch complete");
            for result in results.iter().filter(|r| !r.cached) {
                warn!(id = %result.id, url = %result.image_url, error = %result.error.as_deref().unwrap_or("unknown"), "Item failed");
            }
            if cached == 0 && failed > 0 {
                return Err(AppError::InvalidInput(
                    "every catalog item failed to cache".to_string(),
                ));
            }
        }

        Command::Get { url, timeout } => {
            let download_config = DownloaderConfig::builder()
                .with_timeout(Duration::from_secs(timeout))
                .build();
            let downloader = ImageDownloader::with_config(cache, download_config)?;
            let path = downloader.download(&url).await?;
            println!("{}", path.display());
        }

        Command::Resolve { url } => match cache.resolve(&url).await {
            Some(path) => println!("{}", path.display()),
            None => {
                return Err(AppError::InvalidInput(format!("not cached: {url}")));
            }
        },

        Command::Stats => {
            let stats = cache.stats().await?;
            println!("entries: {}", stats.total_entries);
            println!("bytes:   {}", stats.total_bytes);
        }

        Command::Purge => {
            let removed = cache.purge_expired().await?;
            info!(removed, "Purged expired entries");
        }

        Command::Clear => {
            cache.clear_all().await?;
            info!("Cache cleared");
        }
    }

    Ok(())
}
