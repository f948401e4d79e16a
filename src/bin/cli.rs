use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "datadock", about = "Datadock command-line client", version)]
struct Cli {
    /// API endpoint
    #[arg(long, default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all uploaded datasets
    List,
    /// Upload a CSV file as a new dataset
    Upload {
        csv_file: PathBuf,
        /// Dataset name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Get dataset metadata, stats, or derived files
    Get {
        dataset_id: String,
        /// Print summary statistics
        #[arg(long)]
        stats: bool,
        /// Download the spreadsheet export to PATH
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
        /// Download the histogram plot document to PATH
        #[arg(long, value_name = "PATH")]
        plot: Option<PathBuf>,
    },
    /// Delete a dataset
    Delete { dataset_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.endpoint.trim_end_matches('/').to_string();

    match cli.command {
        Command::List => {
            let response = check(client.get(format!("{base}/datasets")).send().await?).await?;
            println!("{}", response.text().await?);
        }
        Command::Upload { csv_file, name } => {
            let data = std::fs::read(&csv_file)
                .with_context(|| format!("reading {}", csv_file.display()))?;
            let name = name.or_else(|| {
                csv_file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            });
            let mut request = client.post(format!("{base}/datasets")).body(data);
            if let Some(name) = &name {
                request = request.query(&[("name", name.as_str())]);
            }
            let response = check(request.send().await?).await?;
            println!("{}", response.text().await?);
        }
        Command::Get {
            dataset_id,
            stats,
            export,
            plot,
        } => {
            if let Some(path) = export {
                download(&client, format!("{base}/datasets/{dataset_id}/export"), &path).await?;
            } else if let Some(path) = plot {
                download(&client, format!("{base}/datasets/{dataset_id}/plot"), &path).await?;
            } else if stats {
                let response =
                    check(client.get(format!("{base}/datasets/{dataset_id}/stats")).send().await?)
                        .await?;
                println!("{}", response.text().await?);
            } else {
                let response =
                    check(client.get(format!("{base}/datasets/{dataset_id}")).send().await?)
                        .await?;
                println!("{}", response.text().await?);
            }
        }
        Command::Delete { dataset_id } => {
            check(client.delete(format!("{base}/datasets/{dataset_id}")).send().await?).await?;
            println!("deleted {dataset_id}");
        }
    }

    Ok(())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("request failed with {status}: {body}");
    }
}

async fn download(client: &reqwest::Client, url: String, path: &Path) -> Result<()> {
    let response = check(client.get(url).send().await?).await?;
    let bytes = response.bytes().await?;
    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
