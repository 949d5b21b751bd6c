//! Courier command-line client.

mod transfer_client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use transfer_client::{TransferClient, UploadMode, UploadRequest, local_file_name};

#[derive(Parser)]
#[command(name = "courier")]
#[command(version, about = "Courier artifact transfer client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its download URL
    Upload {
        /// File to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Server base URL
        #[arg(long, env = "COURIER_SERVER")]
        server: String,
        /// Mount segment the transfer endpoints are served under
        #[arg(long, env = "COURIER_MOUNT", default_value = "transfer")]
        mount: String,
        /// Owner of the artifact
        #[arg(long)]
        user_id: String,
        /// Optional folder nested under the owner
        #[arg(long)]
        application_folder: Option<String>,
        /// Artifact name (defaults to the file's name)
        #[arg(long)]
        name: Option<String>,
        /// Send as multipart/form-data instead of a raw body
        #[arg(long, default_value_t = false)]
        multipart: bool,
        /// Print the server's plain-text response
        #[arg(long, default_value_t = false)]
        text: bool,
    },
    /// Download an artifact by URL
    Download {
        /// Artifact URL as printed by `upload`
        url: String,
        /// Output path (defaults to the artifact name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check whether an artifact is still available
    Exists {
        /// Artifact URL as printed by `upload`
        url: String,
    },
}

fn artifact_name(file: &Path, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .context("cannot derive artifact name from path; pass --name"),
    }
}

/// Last path segment of `url`, used when the server sends no file name.
fn url_file_name(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next()?;
    let decoded = percent_encoding::percent_decode_str(segment)
        .decode_utf8()
        .ok()?;
    local_file_name(&decoded)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Upload {
            file,
            server,
            mount,
            user_id,
            application_folder,
            name,
            multipart,
            text,
        } => {
            let contents = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let request = UploadRequest {
                file_name: artifact_name(&file, name)?,
                user_id,
                application_folder,
                contents,
                mode: if multipart {
                    UploadMode::Multipart
                } else {
                    UploadMode::Raw
                },
            };
            tracing::debug!(file = %file.display(), size = request.contents.len(), "uploading");

            let client = TransferClient::new(&server, &mount)?;
            if text {
                print!("{}", client.upload_text(request).await?);
            } else {
                let response = client.upload(request).await?;
                for file in response.files {
                    println!("{}", file.url);
                }
            }
            Ok(())
        }
        Commands::Download { url, output } => {
            let client = TransferClient::new(&url, "")?;
            let download = client.download(&url).await?;
            tracing::debug!(
                content_type = ?download.content_type,
                size = download.contents.len(),
                "downloaded"
            );
            let output = match output {
                Some(path) => path,
                None => PathBuf::from(
                    download
                        .file_name
                        .clone()
                        .or_else(|| url_file_name(&url))
                        .context("cannot derive output name from URL; pass --output")?,
                ),
            };
            tokio::fs::write(&output, &download.contents)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Saved {} bytes to {}",
                download.contents.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Exists { url } => {
            let client = TransferClient::new(&url, "")?;
            if client.exists(&url).await? {
                println!("present");
                Ok(())
            } else {
                anyhow::bail!("artifact not found: {url}")
            }
        }
    }
}
