//! gamma-export CLI
//!
//! Reads a gamma table from disk and exports its live documents to a file or
//! a bulk endpoint.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use gamma_export::config::{ExportConfig, ExportOptions, SinkConfig, SourceConfig};
use gamma_export::vectors::default_opener;

#[derive(Parser)]
#[command(name = "gamma-export")]
#[command(version)]
#[command(about = "Export gamma vector tables to a file or a bulk endpoint", long_about = None)]
struct Cli {
    /// Configuration file path (replaces the source/sink flags)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gamma data directory
    #[arg(short = 'f', long, default_value = "./")]
    filepath: PathBuf,

    /// Table name (directory under the data directory)
    #[arg(short = 't', long, default_value = "1")]
    table_name: String,

    /// Router URL of the target space
    #[arg(short = 'u', long, conflicts_with = "savepath")]
    url: Option<String>,

    /// Local output file
    #[arg(short = 's', long)]
    savepath: Option<PathBuf>,

    /// The store was built with 64-bit string offsets (TABLE_STR_INT64)
    #[arg(long)]
    int64: bool,

    /// Send one request per document instead of bulk batches
    #[arg(long, requires = "url")]
    single: bool,

    /// Documents per bulk request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of batcher workers
    #[arg(long)]
    batchers: Option<usize>,

    /// Maximum concurrent bulk requests
    #[arg(long)]
    uploaders: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    config.validate()?;
    check_paths(&config)?;

    info!("Starting export...");
    let stats = match gamma_export::run(&config, Arc::from(default_opener())).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("export aborted: {e}");
            return Err(e.into());
        }
    };

    println!("\n✅ Export Complete!");
    println!("   Documents:  {}", stats.documents);
    println!("   Superseded: {}", stats.superseded);
    println!("   Exported:   {}", stats.exported);
    println!("   Failed:     {}", stats.failed);
    println!("   Duration:   {:.2}s", stats.duration_secs);
    println!("   Throughput: {:.0} docs/sec", stats.throughput());

    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<ExportConfig> {
    let mut config = if let Some(path) = &cli.config {
        info!("Loading configuration from {:?}", path);
        ExportConfig::from_file(path)?
    } else {
        let sink = match (&cli.url, &cli.savepath) {
            (Some(url), _) if cli.single => SinkConfig::Document { url: url.clone() },
            (Some(url), _) => SinkConfig::Bulk { url: url.clone() },
            (None, Some(path)) => SinkConfig::File { path: path.clone() },
            (None, None) => anyhow::bail!("one of --url or --savepath is required"),
        };
        ExportConfig {
            source: SourceConfig {
                path: cli.filepath.clone(),
                table: cli.table_name.clone(),
                wide_ids: cli.int64,
            },
            sink,
            options: ExportOptions::default(),
        }
    };

    if let Some(bs) = cli.batch_size {
        config.options.batch_size = bs;
    }
    if let Some(n) = cli.batchers {
        config.options.batchers = n;
    }
    if let Some(n) = cli.uploaders {
        config.options.uploaders = n;
    }
    Ok(config)
}

fn check_paths(config: &ExportConfig) -> anyhow::Result<()> {
    let root = &config.source.path;
    if !root.exists() {
        anyhow::bail!("filepath[{}] does not exist!", root.display());
    }
    if !root.join(&config.source.table).exists() {
        anyhow::bail!("table[{}] does not exist!", config.source.table);
    }
    if let SinkConfig::File { path } = &config.sink {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            if !Path::new(parent).exists() {
                anyhow::bail!("directory[{}] does not exist!", parent.display());
            }
        }
    }
    Ok(())
}
