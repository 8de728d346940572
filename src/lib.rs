//! drive_download - Pick and download files from Google Drive interactively.
//!
//! This library provides functionality to:
//! - Obtain and persist OAuth2 credentials for the Drive API
//! - List a single page of files from the user's Drive
//! - Export files to PDF, MP4 or MP3 and save them locally
//! - Ask the user, file by file, which ones to download
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use drive_download::{Config, CredentialStore, DownloadOptions, DriveClient, FileDownloader, Selector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let credential = CredentialStore::new(config.auth).obtain().await?;
//!     let client = Arc::new(DriveClient::with_base_url(credential.access_token, config.api_base));
//!
//!     let options = DownloadOptions { target_dir: ".".into(), file_count: 10 };
//!     let downloader = FileDownloader::new(client.clone());
//!     Selector::stdio().session(client.as_ref(), &downloader, &options).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod models;
pub mod selector;

// Re-exports for convenience
pub use auth::{Credential, CredentialStore};
pub use client::{DriveClient, Exporter, Lister};
pub use config::{AuthConfig, Config, DownloadOptions};
pub use download::FileDownloader;
pub use error::{DriveError, ErrorKind, Result};
pub use export::{export_mime_for, is_blacklisted, ExportFormat};
pub use models::FileRecord;
pub use selector::{Decision, SessionSummary, Selector};
