//! Interactive per-file download selection.
//!
//! Walks the listed files in order and asks the user about each one:
//! `y` downloads it, `n` skips it, `q` abandons the rest of the list.
//! Anything else is rejected and the same question is asked again.
//! Blacklisted files are passed over without a prompt.

use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::client::Lister;
use crate::config::DownloadOptions;
use crate::download::FileDownloader;
use crate::error::{DriveError, ErrorKind, Result};
use crate::export::is_blacklisted;
use crate::models::FileRecord;

pub const GREETING: &str = "Hello, here are your files. Press 'Q' to quit at any time:";
pub const INVALID_RESPONSE: &str =
    "The response must be either 'Y' or 'y' for yes, 'N' or 'n' for no, or 'Q' or 'q' to quit";

/// The user's answer for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Download,
    Skip,
    Quit,
}

impl Decision {
    /// Parse one line of input, ignoring case and surrounding whitespace.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" => Some(Decision::Download),
            "n" => Some(Decision::Skip),
            "q" => Some(Decision::Quit),
            _ => None,
        }
    }
}

/// Outcome of one selection session.
#[derive(Debug, Default)]
pub struct SessionSummary {
    /// Number of files the user was asked about.
    pub prompted: usize,
    /// Paths written, in order.
    pub downloaded: Vec<PathBuf>,
    pub skipped: usize,
    /// Per-file failures that did not end the session.
    pub failures: Vec<(FileRecord, DriveError)>,
    /// Whether the user quit before the end of the list.
    pub quit: bool,
}

impl SessionSummary {
    /// Exit code for the session: 0, or the code of the first failure.
    pub fn exit_code(&self) -> i32 {
        self.failures
            .first()
            .map(|(_, err)| err.exit_code())
            .unwrap_or(0)
    }
}

/// Prompt loop over a line-oriented input and a text output.
pub struct Selector<R, W> {
    input: R,
    output: W,
}

impl Selector<StdinLock<'static>, Stdout> {
    /// Selector reading from stdin and writing to stdout.
    pub fn stdio() -> Self {
        Selector::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Selector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Ask about one file until a valid answer is given.
    ///
    /// Closed input counts as quitting.
    pub fn prompt(&mut self, number: usize, record: &FileRecord) -> Result<Decision> {
        loop {
            writeln!(
                self.output,
                "[{}] Download the file: {} ({})? ('Y/y' or 'N/n')",
                number, record.name, record.id
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                info!("input closed, quitting");
                return Ok(Decision::Quit);
            }

            match Decision::parse(&line) {
                Some(decision) => return Ok(decision),
                None => writeln!(self.output, "{}", INVALID_RESPONSE)?,
            }
        }
    }

    /// Run the selection over `files`, downloading accepted ones into
    /// `destination_dir`.
    ///
    /// A failed download is reported and the session moves on to the next
    /// file; only authentication and console errors end it early.
    pub async fn run(
        &mut self,
        files: &[FileRecord],
        downloader: &FileDownloader,
        destination_dir: &Path,
    ) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        for record in files {
            if is_blacklisted(&record.mime_type) {
                debug!(id = %record.id, mime_type = %record.mime_type, "skipping blacklisted file");
                continue;
            }

            if summary.prompted == 0 {
                writeln!(self.output, "{}\n", GREETING)?;
            }
            summary.prompted += 1;

            match self.prompt(summary.prompted, record)? {
                Decision::Download => {
                    writeln!(self.output, "Starting download...")?;
                    self.output.flush()?;

                    match downloader.download(record, destination_dir).await {
                        Ok(path) => {
                            writeln!(self.output, "Download finished")?;
                            writeln!(self.output, "Saved to: {}\n", path.display())?;
                            summary.downloaded.push(path);
                        }
                        Err(err) if err.kind() == ErrorKind::Auth => return Err(err),
                        Err(err) => {
                            warn!(id = %record.id, error = %err, "download failed");
                            writeln!(self.output, "Download failed: {}\n", err)?;
                            summary.failures.push((record.clone(), err));
                        }
                    }
                }
                Decision::Skip => {
                    writeln!(self.output, "Not Downloading!\n")?;
                    summary.skipped += 1;
                }
                Decision::Quit => {
                    summary.quit = true;
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// List up to `options.file_count` files and run the selection over
    /// them. Ends with `Exiting...` unless an error cut the session short.
    pub async fn session(
        &mut self,
        lister: &dyn Lister,
        downloader: &FileDownloader,
        options: &DownloadOptions,
    ) -> Result<SessionSummary> {
        let files = lister.list(options.file_count).await?;
        debug!(count = files.len(), "listed files");

        let summary = if files.is_empty() {
            writeln!(self.output, "No files found.")?;
            SessionSummary::default()
        } else {
            self.run(&files, downloader, &options.target_dir).await?
        };

        writeln!(self.output, "Exiting...")?;
        self.output.flush()?;
        Ok(summary)
    }
}
