use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use receiptor_lib::{
    extract_fields, load_config, save_config, validate_for_mission, CampaignConfig,
    ExtractedReceiptData, ReceiptImage, ReceiptProcessor,
};

/// Read shopping receipts and check them against campaign missions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Campaign configuration (JSON). Built-in defaults when omitted.
    #[arg(short, long, global = true, env = "RECEIPTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize a receipt photo and extract date, time and amount
    Scan {
        image: PathBuf,
        /// Also validate against this mission id
        #[arg(short, long)]
        mission: Option<u8>,
        /// Skip upscaling, sharpening and contrast
        #[arg(long)]
        no_preprocess: bool,
    },
    /// Extract fields from an existing transcript ("-" reads stdin)
    Text {
        file: PathBuf,
        #[arg(short, long)]
        mission: Option<u8>,
    },
    /// Write the default configuration to PATH
    InitConfig { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Command::InitConfig { path } => {
            save_config(&path, &CampaignConfig::default())
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "default configuration written");
            Ok(())
        }
        Command::Scan {
            image,
            mission,
            no_preprocess,
        } => {
            let mut config = config_from(cli.config.as_deref())?;
            if no_preprocess {
                config.preprocess.enabled = false;
            }
            let receipt = ReceiptImage::from_path(&image)
                .with_context(|| format!("reading {}", image.display()))?;
            if let Err(message) = config.upload.check(&receipt.media_type, receipt.byte_size()) {
                bail!("{}: {message}", image.display());
            }

            let processor = ReceiptProcessor::from_config(&config)?;
            tracing::info!(engine = processor.recognizer_name(), image = %image.display(), "scanning");
            let extracted = processor.process(&receipt);
            report(&config, mission, &extracted)
        }
        Command::Text { file, mission } => {
            let config = config_from(cli.config.as_deref())?;
            let text = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading transcript from stdin")?;
                buf
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?
            };
            let extracted = extract_fields(&text, &config.amount);
            report(&config, mission, &extracted)
        }
    }
}

fn config_from(path: Option<&Path>) -> anyhow::Result<CampaignConfig> {
    let config = match path {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => CampaignConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn report(
    config: &CampaignConfig,
    mission: Option<u8>,
    extracted: &ExtractedReceiptData,
) -> anyhow::Result<()> {
    let verdict = mission
        .map(|id| validate_for_mission(config, id, extracted))
        .transpose()?;
    let out = json!({ "extracted": extracted, "verdict": verdict });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
