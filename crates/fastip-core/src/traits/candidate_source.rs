// # Candidate Source Trait
//
// Defines where the list of candidate addresses comes from.
//
// ## Implementations
//
// - HTTP list: `fastip-source-http` crate
// - Local file / inline list: `fastip_core::source`
//
// ## Usage
//
// ```rust,ignore
// use fastip_core::CandidateSource;
//
// let source = /* CandidateSource implementation */;
// let raw = source.fetch().await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single candidate address (dotted-quad, IPv6 literal or hostname)
///
/// Candidates are immutable once created. Surrounding whitespace is trimmed
/// on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    /// Create a candidate from a raw list entry
    ///
    /// Returns `None` for empty or whitespace-only entries.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Candidate {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// Split a newline-separated candidate list into raw entries
///
/// Entries are returned as-is apart from a trailing `\r`; blank lines are
/// kept so the worker pool can account for them.
pub fn split_candidate_list(body: &str) -> Vec<String> {
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Trait for candidate list sources
///
/// A source is consulted exactly once per run. Failing to produce the list
/// is a fatal input error.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetch the raw candidate entries
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Raw entries (may include blank lines)
    /// - `Err(Error)`: If the list could not be obtained
    async fn fetch(&self) -> Result<Vec<String>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing candidate sources from configuration
pub trait CandidateSourceFactory: Send + Sync {
    /// Create a CandidateSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn CandidateSource>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank() {
        assert_eq!(Candidate::parse(""), None);
        assert_eq!(Candidate::parse("   \t"), None);
        assert_eq!(Candidate::parse(" 1.1.1.1 ").unwrap().as_str(), "1.1.1.1");
    }

    #[test]
    fn test_split_keeps_blank_lines() {
        let raw = split_candidate_list("1.1.1.1\r\n\n8.8.8.8\n");
        assert_eq!(raw, vec!["1.1.1.1", "", "8.8.8.8", ""]);
    }
}
