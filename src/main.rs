//! drive_download CLI - Choose Drive files one by one and download them.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use drive_download::{
    Config, CredentialStore, DownloadOptions, DriveClient, DriveError, FileDownloader, Selector,
};

/// Google Drive file downloader.
#[derive(Parser)]
#[command(name = "drive_download")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of files to retrieve.
    #[arg(short = 'f', long = "file-count", default_value_t = 10, allow_negative_numbers = true)]
    file_count: i32,

    /// Directory to download files to (defaults to the current directory).
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,
}

impl Cli {
    fn download_options(self) -> Result<DownloadOptions> {
        let target_dir = match self.dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        Ok(DownloadOptions {
            target_dir,
            file_count: self.file_count,
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let options = cli.download_options()?;
    let config = Config::from_env();
    info!(?options, "starting");

    let store = CredentialStore::new(config.auth);
    let credential = store.obtain().await.with_context(|| {
        format!(
            "Failed to obtain credentials (token file {:?})",
            store.config().token_path
        )
    })?;

    let client = Arc::new(DriveClient::with_base_url(
        credential.access_token,
        config.api_base,
    ));

    let downloader = FileDownloader::new(client.clone());
    let summary = Selector::stdio()
        .session(client.as_ref(), &downloader, &options)
        .await?;

    info!(
        prompted = summary.prompted,
        downloaded = summary.downloaded.len(),
        skipped = summary.skipped,
        failed = summary.failures.len(),
        quit = summary.quit,
        "session finished"
    );
    Ok(summary.exit_code())
}

/// Log to stderr so prompts on stdout stay readable. `RUST_LOG` overrides
/// the default level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("drive_download=warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for the first `DriveError` in the chain, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DriveError>())
        .map(DriveError::exit_code)
        .unwrap_or(1)
}
