use anyhow::{bail, Context, Result};
use base64ct::{Base64, Encoding};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "incident-classifier-cli")]
#[command(about = "Incident image classifier CLI", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        env = "INCIDENT_CLASSIFIER_ENDPOINT",
        default_value = "http://localhost:8080"
    )]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and print the suggested report
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Send the bare base64 payload instead of a data URL
        #[arg(long)]
        raw: bool,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    match cli.command {
        Commands::Analyze { file, raw } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            if bytes.is_empty() {
                bail!("{} is empty", file.display());
            }

            let encoded = Base64::encode_string(&bytes);
            let image = if raw {
                encoded
            } else {
                format!("data:{};base64,{}", mime_type_for(&file), encoded)
            };

            let response = client
                .post(format!("{}/analyze-image", endpoint))
                .json(&json!({ "image": image }))
                .send()
                .await
                .context("failed to reach the classifier")?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);

            if !status.is_success() {
                bail!("classifier answered {}", status);
            }
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", endpoint))
                .send()
                .await
                .context("failed to reach the classifier")?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// Media type from the file extension, JPEG when unknown
fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
