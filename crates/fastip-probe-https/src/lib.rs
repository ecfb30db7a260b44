// # HTTPS Prober
//
// Measures how fast a candidate address answers a request for the logical
// domain.
//
// ## How a probe works
//
// 1. Resolve the candidate to one IP (literal, or one DNS lookup); the
//    lookup and the request share one timeout budget
// 2. Build a client that sends the logical domain to that IP only
//    (`reqwest::ClientBuilder::resolve`), so SNI, certificate validation
//    and the Host header all use the domain
// 3. `GET {scheme}://{domain}:{port}{path}` with `Connection: close`
// 4. Reachable iff the response status equals the qualifying status;
//    the score is the elapsed time from step 3 to the response head
//
// Every probe owns its client. Nothing about the address override is
// process-global, so concurrent probes cannot interfere.

use async_trait::async_trait;
use fastip_core::config::validate_domain_name;
use fastip_core::traits::{Candidate, ProbeFailure, ProbeOutcome, ProbeSettings, Prober};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Prober that issues one HTTP(S) request per candidate
#[derive(Debug, Clone, Default)]
pub struct HttpsProber;

impl HttpsProber {
    pub fn new() -> Self {
        Self
    }

    /// Turn a candidate into the address the connection is forced to
    ///
    /// Host name lookups give up at `deadline`.
    async fn resolve(
        &self,
        candidate: &Candidate,
        port: u16,
        deadline: Instant,
    ) -> Result<SocketAddr, ProbeFailure> {
        let raw = candidate.as_str();
        let literal = raw.trim_start_matches('[').trim_end_matches(']');

        if let Ok(ip) = literal.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        validate_domain_name(raw).map_err(|_| ProbeFailure::InvalidCandidate(raw.to_string()))?;

        let lookup = tokio::net::lookup_host((raw, port));
        let mut addrs = tokio::time::timeout_at(deadline.into(), lookup)
            .await
            .map_err(|_| ProbeFailure::Timeout)?
            .map_err(|e| ProbeFailure::Resolve(format!("{}: {}", raw, e)))?;

        addrs
            .next()
            .ok_or_else(|| ProbeFailure::Resolve(format!("{}: no addresses", raw)))
    }

    fn build_client(
        &self,
        settings: &ProbeSettings,
        addr: SocketAddr,
        budget: Duration,
    ) -> Result<reqwest::Client, ProbeFailure> {
        reqwest::Client::builder()
            .resolve(&settings.domain, addr)
            .timeout(budget)
            .connect_timeout(budget)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| ProbeFailure::Transport(format!("client setup failed: {}", e)))
    }
}

/// Time left before `deadline`, or `None` once it has passed
fn remaining_budget(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|left| !left.is_zero())
}

/// Classify a request error
fn transport_failure(err: reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else {
        ProbeFailure::Transport(err.to_string())
    }
}

#[async_trait]
impl Prober for HttpsProber {
    async fn probe(&self, candidate: &Candidate, settings: &ProbeSettings) -> ProbeOutcome {
        // One budget covers name resolution and the request
        let deadline = Instant::now() + settings.timeout;

        let addr = match self.resolve(candidate, settings.port, deadline).await {
            Ok(addr) => addr,
            Err(failure) => {
                tracing::debug!("Cannot probe {}: {}", candidate, failure);
                return ProbeOutcome::unreachable(candidate.clone(), failure);
            }
        };

        let Some(budget) = remaining_budget(deadline, Instant::now()) else {
            return ProbeOutcome::unreachable(candidate.clone(), ProbeFailure::Timeout);
        };

        let client = match self.build_client(settings, addr, budget) {
            Ok(client) => client,
            Err(failure) => return ProbeOutcome::unreachable(candidate.clone(), failure),
        };

        let url = settings.target_url();
        tracing::debug!("Probing {} via {} ({})", url, candidate, addr);

        let start = Instant::now();
        let response = client
            .get(&url)
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .await;
        let elapsed = start.elapsed();

        match response {
            Ok(response) if response.status().as_u16() == settings.qualifying_status => {
                tracing::debug!("{} answered in {:?}", candidate, elapsed);
                ProbeOutcome::reachable(candidate.clone(), elapsed)
            }
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::debug!("{} answered with non-qualifying status {}", candidate, status);
                ProbeOutcome::unreachable(candidate.clone(), ProbeFailure::UnexpectedStatus(status))
            }
            Err(e) => {
                let failure = transport_failure(e);
                tracing::debug!("{} failed: {}", candidate, failure);
                ProbeOutcome::unreachable(candidate.clone(), failure)
            }
        }
    }

    fn prober_name(&self) -> &'static str {
        "https"
    }
}
