use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "muro", version, about = "Wallpaper image cache CLI")]
pub struct CliArgs {
    /// Cache directory (defaults to a directory under the system temp dir)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Cache TTL in days
    #[arg(long, global = true, default_value_t = 7)]
    pub ttl_days: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the catalog and cache every image in it
    Fetch {
        /// Catalog endpoint returning a JSON array of records
        #[arg(long)]
        catalog_url: String,

        /// Cache at most this many items
        #[arg(long)]
        limit: Option<usize>,

        /// Delay between downloads, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,

        /// Per-download timeout, in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Download a single image into the cache
    Get {
        /// Source image URL
        url: String,

        /// Per-download timeout, in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Print the cached local path for a URL, if fresh
    Resolve {
        /// Source image URL
        url: String,
    },

    /// Print cache statistics
    Stats,

    /// Remove expired entries
    Purge,

    /// Delete every cached file
    Clear,
}
