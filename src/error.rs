//! Error types for the drive_download crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while authenticating, listing or downloading.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Client secrets file not found: {}", path.display())]
    MissingClientSecrets { path: PathBuf },

    #[error("Failed to access credentials file {}: {source}", path.display())]
    CredentialsFileError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad failure classes, each with its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login, refresh or credential storage failed. Fatal before listing.
    Auth,
    /// The Drive API rejected a request or could not be reached.
    Remote,
    /// Local disk or console failure.
    Io,
}

impl ErrorKind {
    /// Process exit code reported for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Auth => 2,
            ErrorKind::Remote => 3,
            ErrorKind::Io => 4,
        }
    }
}

impl DriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::AuthenticationError(_)
            | DriveError::MissingClientSecrets { .. }
            | DriveError::CredentialsFileError { .. }
            | DriveError::CredentialsParseError(_)
            | DriveError::TokenRefreshError(_) => ErrorKind::Auth,
            DriveError::HttpError(_) | DriveError::ApiError { .. } => ErrorKind::Remote,
            DriveError::WriteError { .. } | DriveError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
