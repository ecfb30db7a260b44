//! Plugin-based component registry
//!
//! The registry maps the `type` names used in configuration to factories,
//! so the binary never hard-codes an if-else chain over providers or
//! candidate sources.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fastip_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//! fastip_core::registry::register_builtin(&registry);
//! fastip_provider_cloudflare::register(&registry);
//!
//! let publisher = registry.create_publisher(&config.provider)?;
//! let source = registry.create_candidate_source(&config.source)?;
//! ```

use crate::config::{ProviderConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::source::{FileSourceFactory, StaticSourceFactory};
use crate::traits::{CandidateSource, CandidateSourceFactory, Publisher, PublisherFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based publisher and candidate-source creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered publisher factories
    publishers: RwLock<HashMap<String, Box<dyn PublisherFactory>>>,

    /// Registered candidate source factories
    sources: RwLock<HashMap<String, Box<dyn CandidateSourceFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a publisher factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare")
    /// - `factory`: Factory object for creating publisher instances
    pub fn register_publisher(&self, name: impl Into<String>, factory: Box<dyn PublisherFactory>) {
        let mut publishers = self
            .publishers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        publishers.insert(name.into(), factory);
    }

    /// Register a candidate source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "http", "file")
    /// - `factory`: Factory object for creating source instances
    pub fn register_candidate_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn CandidateSourceFactory>,
    ) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Create a publisher from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Publisher>)`: Created publisher instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_publisher(&self, config: &ProviderConfig) -> Result<Box<dyn Publisher>> {
        let provider_type = config.type_name();
        let publishers = self
            .publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = publishers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create a candidate source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CandidateSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_candidate_source(&self, config: &SourceConfig) -> Result<Box<dyn CandidateSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown candidate source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_publishers(&self) -> Vec<String> {
        let publishers = self
            .publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        publishers.keys().cloned().collect()
    }

    /// List all registered candidate source types
    pub fn list_candidate_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_publisher(&self, name: &str) -> bool {
        let publishers = self
            .publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        publishers.contains_key(name)
    }

    /// Check if a candidate source type is registered
    pub fn has_candidate_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }
}

/// Register the sources that live in this crate ("file" and "static")
pub fn register_builtin(registry: &ComponentRegistry) {
    registry.register_candidate_source("file", Box::new(FileSourceFactory));
    registry.register_candidate_source("static", Box::new(StaticSourceFactory));
}
