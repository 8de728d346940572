//! Export a single Drive file and write it into a local directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use tracing::{debug, warn};

use crate::client::Exporter;
use crate::error::{DriveError, Result};
use crate::export::ExportFormat;
use crate::models::FileRecord;

/// Path separators, characters reserved on common filesystems, and control
/// characters.
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("Invalid file name regex")
});

/// Make a Drive file name usable as a single local path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// Local path a record is written to: `<dir>/<sanitized name>.<extension>`.
pub fn destination_path(record: &FileRecord, destination_dir: &Path) -> PathBuf {
    let format = ExportFormat::from_source_mime(&record.mime_type);
    destination_dir.join(format!(
        "{}.{}",
        sanitize_file_name(&record.name),
        format.extension()
    ))
}

/// Path used when `destination_path` already holds another file of this
/// session: `<dir>/<sanitized name> (<id>).<extension>`.
fn disambiguated_path(record: &FileRecord, destination_dir: &Path) -> PathBuf {
    let format = ExportFormat::from_source_mime(&record.mime_type);
    destination_dir.join(format!(
        "{} ({}).{}",
        sanitize_file_name(&record.name),
        sanitize_file_name(&record.id),
        format.extension()
    ))
}

/// Downloads files by exporting them through an [`Exporter`].
pub struct FileDownloader {
    exporter: Arc<dyn Exporter>,
    /// Paths written by this downloader, mapped to the id of their file.
    written: Mutex<HashMap<PathBuf, String>>,
}

impl FileDownloader {
    pub fn new(exporter: Arc<dyn Exporter>) -> Self {
        Self {
            exporter,
            written: Mutex::new(HashMap::new()),
        }
    }

    /// Where `record` would be saved under `destination_dir`.
    ///
    /// A file saved earlier by this downloader under the same name but with
    /// a different id is never replaced; the id is appended instead.
    pub fn target_path(&self, record: &FileRecord, destination_dir: &Path) -> PathBuf {
        let preferred = destination_path(record, destination_dir);
        let written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        match written.get(&preferred) {
            Some(owner) if *owner != record.id => disambiguated_path(record, destination_dir),
            _ => preferred,
        }
    }

    /// Export `record` and save it under `destination_dir`, creating the
    /// directory if needed. A file left by an earlier run is replaced;
    /// saving the same record again overwrites its own file.
    ///
    /// Returns the path that was written.
    pub async fn download(&self, record: &FileRecord, destination_dir: &Path) -> Result<PathBuf> {
        let format = ExportFormat::from_source_mime(&record.mime_type);
        let bytes = self.exporter.export(&record.id, format.mime_type()).await?;

        let final_path = self.target_path(record, destination_dir);
        if final_path != destination_path(record, destination_dir) {
            warn!(
                id = %record.id,
                path = %final_path.display(),
                "name already used by another file, saving under its id"
            );
        }

        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|source| DriveError::WriteError {
                path: destination_dir.to_path_buf(),
                source,
            })?;

        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            warn!(path = %final_path.display(), "replacing existing file");
        }

        // Write next to the destination, then move into place.
        let temp_path = final_path.with_extension(format!("{}.part", format.extension()));
        if let Err(source) = tokio::fs::write(&temp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DriveError::WriteError {
                path: temp_path,
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DriveError::WriteError {
                path: final_path,
                source,
            });
        }

        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(final_path.clone(), record.id.clone());

        debug!(path = %final_path.display(), len = bytes.len(), "saved file");
        Ok(final_path)
    }
}
