// # Static Candidate Source
//
// Serves a fixed list given inline in configuration. Useful for testing,
// pinned address pools, and embedding.

use async_trait::async_trait;

use crate::Error;
use crate::config::SourceConfig;
use crate::traits::candidate_source::{CandidateSource, CandidateSourceFactory};

/// In-memory candidate source
#[derive(Debug, Clone, Default)]
pub struct StaticCandidateSource {
    addresses: Vec<String>,
}

impl StaticCandidateSource {
    /// Create a source serving `addresses`
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[async_trait]
impl CandidateSource for StaticCandidateSource {
    async fn fetch(&self) -> Result<Vec<String>, Error> {
        Ok(self.addresses.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Factory for creating static candidate sources
pub struct StaticSourceFactory;

impl CandidateSourceFactory for StaticSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn CandidateSource>, Error> {
        match config {
            SourceConfig::Static { addresses } => {
                Ok(Box::new(StaticCandidateSource::new(addresses.clone())))
            }
            _ => Err(Error::config("Invalid config for static candidate source")),
        }
    }
}
