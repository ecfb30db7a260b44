// # Cloudflare DNS Publisher
//
// Points one Cloudflare DNS record at the winning address.
//
// ## Behavior
//
// - One HTTP request per publish call (no retries, no backoff)
// - Global API key authentication via `X-Auth-Email` / `X-Auth-Key`
// - HTTP timeout of 30 seconds
// - Specific error messages for 400, 401/403, 404, 409, 429 and 5xx
// - Dry-run mode logs the request instead of sending it
//
// ## Security
//
// - The API key never appears in logs or Debug output
// - Construction fails (it does not panic) when credentials are empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use fastip_core::config::ProviderConfig;
use fastip_core::registry::ComponentRegistry;
use fastip_core::traits::{Candidate, PublishResult, Publisher, PublisherFactory, RecordTarget};
use fastip_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare DNS publisher
///
/// Stateless and single-shot: every [`Publisher::publish`] call is exactly
/// one PUT against the configured record.
pub struct CloudflarePublisher {
    /// Account email for `X-Auth-Email`
    email: String,

    /// Global API key for `X-Auth-Key`
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: log the PUT instead of sending it
    dry_run: bool,
}

impl std::fmt::Debug for CloudflarePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflarePublisher")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflarePublisher {
    /// Create a new Cloudflare publisher
    ///
    /// # Parameters
    ///
    /// - `email`: Cloudflare account email
    /// - `api_key`: Global API key
    /// - `api_base`: Override for the API base URL (tests, proxies)
    /// - `dry_run`: If true, log the update but do not send it
    pub fn new(
        email: impl Into<String>,
        api_key: impl Into<String>,
        api_base: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let email = email.into();
        let api_key = api_key.into();

        if email.trim().is_empty() {
            return Err(Error::config("Cloudflare account email cannot be empty"));
        }
        if api_key.trim().is_empty() {
            return Err(Error::config("Cloudflare API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = api_base
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            email,
            api_key,
            api_base,
            client,
            dry_run,
        })
    }

    /// Whether this publisher only logs updates
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Record endpoint for `record`
    pub fn record_url(&self, record: &RecordTarget) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, record.zone_id, record.record_id
        )
    }
}

/// Request body for a record update
///
/// The `id` field carries the zone identifier; Cloudflare ignores it on PUT.
pub fn update_payload(address: &Candidate, record: &RecordTarget) -> Value {
    serde_json::json!({
        "id": record.zone_id,
        "type": record.record_type,
        "name": record.name,
        "content": address.as_str(),
        "ttl": record.ttl,
    })
}

/// Map a non-success status to an error
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    let message = match status.as_u16() {
        400 => format!("Bad request (check record type and content): {} - {}", status, body),
        401 | 403 => format!(
            "Authentication failed: Invalid email/API key or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Zone or DNS record not found. Status: {}", status),
        409 => format!(
            "Conflict: Record is being updated by another process. Status: {}",
            status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error (transient): {} - {}", status, body),
        _ => format!("Failed to update record: {} - {}", status, body),
    };
    Error::provider(PROVIDER, message)
}

/// Collect the `errors[].message` strings of an API envelope
fn api_errors(json: &Value) -> String {
    json["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["message"].as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "no error details".to_string())
}

#[async_trait]
impl Publisher for CloudflarePublisher {
    /// Point the record at `address`
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// {
    ///   "id": "<zone_id>",
    ///   "type": "A",
    ///   "name": "www.example.com",
    ///   "content": "1.2.3.4",
    ///   "ttl": 60
    /// }
    /// ```
    async fn publish(&self, address: &Candidate, record: &RecordTarget) -> Result<PublishResult> {
        let url = self.record_url(record);
        let payload = update_payload(address, record);

        tracing::info!(
            "Updating Cloudflare DNS record: {} -> {} ({}) [mode: {}]",
            record.name,
            address,
            record.record_type,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                payload
            );
            return Ok(PublishResult::DryRun {
                address: address.clone(),
            });
        }

        let response = self
            .client
            .put(&url)
            .header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        if json["success"].as_bool() != Some(true) {
            return Err(Error::provider(
                PROVIDER,
                format!("API reported failure: {}", api_errors(&json)),
            ));
        }

        tracing::info!("DNS record updated successfully: {} -> {}", record.name, address);
        Ok(PublishResult::Updated {
            address: address.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare publishers
pub struct CloudflareFactory;

impl PublisherFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn Publisher>> {
        match config {
            ProviderConfig::Cloudflare {
                email,
                api_key,
                api_base,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare publisher running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(CloudflarePublisher::new(
                    email.clone(),
                    api_key.clone(),
                    api_base.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare publisher with a registry
///
/// # Example
///
/// ```rust
/// use fastip_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::new();
/// fastip_provider_cloudflare::register(&registry);
/// assert!(registry.has_publisher("cloudflare"));
/// ```
pub fn register(registry: &ComponentRegistry) {
    registry.register_publisher(PROVIDER, Box::new(CloudflareFactory));
}
