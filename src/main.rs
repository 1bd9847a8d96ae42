use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lora_decoder::config::Config;

#[derive(Parser)]
#[command(name = "lora-decoder")]
#[command(about = "Decode a LoRaWAN MAC frame (hex or Base64) into an annotated report")]
#[command(version)]
struct Cli {
    /// Frame bytes, hex- or Base64-encoded
    frame: String,

    /// Application session key (32 hex characters)
    #[arg(short, long)]
    app_key: Option<String>,

    /// Network session key (32 hex characters)
    #[arg(short, long)]
    nwk_key: Option<String>,

    /// Path to configuration file with default keys
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    // CLI keys win over configured defaults
    let app_key = cli.app_key.or(config.keys.app_s_key);
    let nwk_key = cli.nwk_key.or(config.keys.nwk_s_key);

    let report = lora_decoder::decode(&cli.frame, app_key.as_deref(), nwk_key.as_deref())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for property in &report.properties {
            println!("{} = {}", property.name, property.description);
        }
        println!();
        println!("{}", report.decoded);
    }

    Ok(())
}
