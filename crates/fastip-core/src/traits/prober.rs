// # Prober Trait
//
// Defines a single latency measurement against one candidate address.
//
// ## Implementations
//
// - HTTPS GET with per-probe address override: `fastip-probe-https` crate
//
// ## Scoring
//
// The score is the elapsed time in seconds. Lower is better. Unreachable
// candidates carry `f64::MAX` so they can never win a comparison.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::traits::candidate_source::Candidate;

/// Score carried by every unreachable outcome
pub const UNREACHABLE_SCORE: f64 = f64::MAX;

/// Why a probe did not qualify (diagnostics only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    /// The probe did not finish within the timeout
    Timeout,
    /// The candidate string is not a usable address
    InvalidCandidate(String),
    /// A hostname candidate could not be resolved
    Resolve(String),
    /// Connection, TLS or HTTP transport error
    Transport(String),
    /// The service answered with a non-qualifying status code
    UnexpectedStatus(u16),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "timed out"),
            ProbeFailure::InvalidCandidate(msg) => write!(f, "invalid candidate: {}", msg),
            ProbeFailure::Resolve(msg) => write!(f, "resolve failed: {}", msg),
            ProbeFailure::Transport(msg) => write!(f, "transport error: {}", msg),
            ProbeFailure::UnexpectedStatus(code) => write!(f, "unexpected status {}", code),
        }
    }
}

/// Result of probing one candidate
///
/// Immutable after creation. Use [`ProbeOutcome::reachable`] or
/// [`ProbeOutcome::unreachable`] so that `reachable == false` always implies
/// `latency_score == UNREACHABLE_SCORE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    candidate: Candidate,
    latency_score: f64,
    reachable: bool,
    failure: Option<ProbeFailure>,
}

impl ProbeOutcome {
    /// A qualifying response after `elapsed`
    pub fn reachable(candidate: Candidate, elapsed: Duration) -> Self {
        Self {
            candidate,
            latency_score: elapsed.as_secs_f64(),
            reachable: true,
            failure: None,
        }
    }

    /// A failed probe
    pub fn unreachable(candidate: Candidate, failure: ProbeFailure) -> Self {
        Self {
            candidate,
            latency_score: UNREACHABLE_SCORE,
            reachable: false,
            failure: Some(failure),
        }
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Elapsed seconds, or `UNREACHABLE_SCORE`
    pub fn latency_score(&self) -> f64 {
        self.latency_score
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        self.failure.as_ref()
    }
}

/// Connection parameters shared by every probe of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Hard per-probe timeout
    pub timeout: Duration,
    /// Logical host name used for SNI and the Host header
    pub domain: String,
    /// Port to connect to on the candidate
    pub port: u16,
    /// Diagnostic path requested on the target
    pub path: String,
    /// `https` or `http`
    pub scheme: String,
    /// The only status code that counts as reachable
    pub qualifying_status: u16,
}

impl ProbeSettings {
    /// URL requested by every probe (the host part is the logical domain)
    pub fn target_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.domain, self.port, self.path)
    }
}

/// Trait for prober implementations
///
/// # Contract
///
/// - Exactly one attempt per call, no retries.
/// - Never returns an error: every failure becomes an unreachable outcome.
/// - No shared-state mutation; each probe carries its own address override.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Measure the latency of a single candidate
    async fn probe(&self, candidate: &Candidate, settings: &ProbeSettings) -> ProbeOutcome;

    /// Get the prober name (for logging/debugging)
    fn prober_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_carries_max_score() {
        let outcome = ProbeOutcome::unreachable("1.1.1.1".into(), ProbeFailure::Timeout);
        assert!(!outcome.is_reachable());
        assert_eq!(outcome.latency_score(), UNREACHABLE_SCORE);
        assert_eq!(outcome.failure(), Some(&ProbeFailure::Timeout));
    }

    #[test]
    fn test_reachable_score_is_elapsed_seconds() {
        let outcome = ProbeOutcome::reachable("8.8.8.8".into(), Duration::from_millis(250));
        assert!(outcome.is_reachable());
        assert!((outcome.latency_score() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_target_url() {
        let settings = ProbeSettings {
            timeout: Duration::from_secs(5),
            domain: "www.example.com".to_string(),
            port: 8443,
            path: "/clientarea.php".to_string(),
            scheme: "https".to_string(),
            qualifying_status: 400,
        };
        assert_eq!(
            settings.target_url(),
            "https://www.example.com:8443/clientarea.php"
        );
    }
}
