// # File Candidate Source
//
// Reads a newline-separated candidate list from local disk.
//
// ## Format
//
// One address per line. Blank lines are passed through and skipped by the
// worker pool; `\r\n` line endings are accepted.
//
// ```text
// 104.16.0.1
// 104.16.0.2
//
// 2606:4700::1
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::Error;
use crate::config::SourceConfig;
use crate::traits::candidate_source::{CandidateSource, CandidateSourceFactory, split_candidate_list};

/// File-based candidate source
///
/// # Example
///
/// ```rust,no_run
/// use fastip_core::source::FileCandidateSource;
/// use fastip_core::traits::CandidateSource;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = FileCandidateSource::new("/etc/fastip/candidates.txt");
///     let entries = source.fetch().await?;
///     println!("{} entries", entries.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileCandidateSource {
    path: PathBuf,
}

impl FileCandidateSource {
    /// Create a source reading from `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CandidateSource for FileCandidateSource {
    async fn fetch(&self) -> Result<Vec<String>, Error> {
        let body = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::candidate_source(format!(
                "Failed to read candidate file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let entries = split_candidate_list(&body);
        tracing::debug!(
            "Read {} candidate line(s) from {}",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }

    fn source_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for creating file candidate sources
pub struct FileSourceFactory;

impl CandidateSourceFactory for FileSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn CandidateSource>, Error> {
        match config {
            SourceConfig::File { path } => Ok(Box::new(FileCandidateSource::new(path))),
            _ => Err(Error::config("Invalid config for file candidate source")),
        }
    }
}
