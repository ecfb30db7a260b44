// # Publisher Trait
//
// Defines the interface for pointing a DNS record at the winning address.
//
// ## Implementations
//
// - Cloudflare: `fastip-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use fastip_core::Publisher;
//
// let publisher = /* Publisher implementation */;
// publisher.publish(&"1.2.3.4".into(), &record).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::traits::candidate_source::Candidate;

/// The DNS record a publisher writes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTarget {
    /// Zone identifier (provider-specific)
    pub zone_id: String,
    /// Record identifier (provider-specific)
    pub record_id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type ("A" or "AAAA")
    pub record_type: String,
    /// Time-to-live in seconds (1 = provider automatic)
    pub ttl: u32,
}

/// Result of a publish call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PublishResult {
    /// The provider accepted the new content
    Updated {
        /// Address written to the record
        address: Candidate,
    },
    /// Dry-run mode: the request was logged but not sent
    DryRun {
        /// Address that would have been written
        address: Candidate,
    },
}

impl PublishResult {
    pub fn address(&self) -> &Candidate {
        match self {
            PublishResult::Updated { address } | PublishResult::DryRun { address } => address,
        }
    }
}

/// Trait for DNS publisher implementations
///
/// # Idempotency
///
/// A run may publish the same address twice (first success, then final
/// winner). Implementations must treat repeated identical input as safe.
///
/// # Concurrency
///
/// `publish` is called while probes are still in flight. Implementations
/// must be thread-safe and must not spawn background tasks or retry.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Point `record` at `address`
    ///
    /// # Returns
    ///
    /// - `Ok(PublishResult)`: The provider accepted (or dry-run logged) the update
    /// - `Err(Error)`: The update failed; the caller reports it and continues
    async fn publish(
        &self,
        address: &Candidate,
        record: &RecordTarget,
    ) -> Result<PublishResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing publishers from configuration
pub trait PublisherFactory: Send + Sync {
    /// Create a Publisher instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn Publisher>, crate::Error>;
}
