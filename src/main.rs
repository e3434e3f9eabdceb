use clap::{Parser, Subcommand};
use guided_image::dispenser::Dispenser;
use guided_image::imaging::RustProcessor;
use guided_image::logging::TracingLogger;
use guided_image::storage::DiskStorage;
use guided_image::{config, report};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "guided-image")]
#[command(about = "Derivative image cache administration")]
#[command(long_about = "\
Derivative image cache administration

The cache holds on-demand derivatives (resized images and thumbnails) of
source images, generated by the embedding application and stored under
deterministic paths:

  <cache_root>/
  ├── resized/
  │   └── 100-200-_-1_0_my-image    # width-height-_-aspect_upscale_name
  └── thumbs/
      └── 64-64-_-crop_my-image     # width-height-_-method_name

Settings are read from config.toml in the --config directory; every key is
optional. Run 'guided-image gen-config' for a documented stock config.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete every cached derivative (resized images and thumbnails)
    ClearCache,
    /// Show cache entry counts and sizes
    Status {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ClearCache => {
            let config = config::load_config(&cli.config)?;
            let cache = DiskStorage::new(&config.cache_root)?;
            let uploads = DiskStorage::new(&config.uploads_root)?;
            let processor = RustProcessor::new();
            let logger = TracingLogger;
            let dispenser = Dispenser::new(&cache, &uploads, &processor, &logger, &config)?;

            if dispenser.empty_cache() {
                println!("Cache cleared: {}", config.cache_root);
            } else {
                return Err(format!("cache could not be fully cleared: {}", config.cache_root).into());
            }
        }
        Command::Status { json } => {
            let config = config::load_config(&cli.config)?;
            let report = report::survey(
                Path::new(&config.cache_root),
                &config.cache.resized_dir,
                &config.cache.thumbs_dir,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report::print_report(&report);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
