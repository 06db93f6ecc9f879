use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use dewatermark::ai::GeminiEditService;
use dewatermark::batch::BatchDriver;
use dewatermark::prompt::{AutoAccept, ConsolePrompter, Prompter};
use dewatermark::{config, exif};

#[derive(Parser, Debug)]
#[command(
    name = "dewatermark",
    version,
    about = "Remove watermarks from the JPEGs in ./input with Gemini, reviewing each result"
)]
struct Cli {
    /// Path to config file (default: dewatermark.json in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long)]
    init: bool,

    /// Accept the first generated image for every file without asking
    #[arg(long)]
    auto_accept: bool,

    /// Print per-file results as JSON when done
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    // Handle --init
    if cli.init {
        let path = cli.config.clone().unwrap_or_else(config::Config::config_path);
        config::Config::default().save(Some(&path))?;
        println!("Default config written to {}", path.display());
        return Ok(());
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.auto_accept {
        config.output.auto_accept = true;
    }

    let api_key = config::Config::api_key_from_env()?;
    let service = GeminiEditService::new(api_key, config.edit.model.clone())
        .with_endpoint(config.edit.endpoint.as_str());

    let mut prompter: Box<dyn Prompter> = if config.output.auto_accept {
        log::info!("Auto-accept: every first result is kept");
        Box::new(AutoAccept)
    } else {
        Box::new(ConsolePrompter::stdio())
    };

    // Started once; closed by the driver on success and failure alike, or on drop when unwinding.
    let mut copier = exif::open_copier(&config.metadata);
    log::info!("Model: {}, metadata: {}", config.edit.model, copier.name());

    let reports = BatchDriver::new(&config, &service, copier.as_mut(), prompter.as_mut())
        .run_and_close()
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}
