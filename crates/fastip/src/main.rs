// # fastip
//
// Thin command-line wrapper around `fastip-core`:
// 1. Parse flags and load the configuration file
// 2. Initialize logging and the runtime
// 3. Register providers and candidate sources
// 4. Run one speed test and publish the winner
//
// All probing, aggregation and publishing logic lives in fastip-core.
//
// ## Example
//
// ```bash
// fastip /etc/fastip/config.toml
// fastip config.toml --dry-run --concurrency 32 --json
// ```
//
// ## Exit codes
//
// - 0: Run completed (also when no candidate was reachable)
// - 1: Missing or invalid configuration
// - 2: Candidate list could not be fetched, or another runtime failure

use anyhow::{Context, Result};
use clap::Parser;
use fastip_core::registry::{ComponentRegistry, register_builtin};
use fastip_core::{EngineEvent, FastIpConfig, RunReport, SpeedTestEngine};
use fastip_probe_https::HttpsProber;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Probe candidate addresses and point a DNS record at the fastest one
#[derive(Parser, Debug)]
#[command(name = "fastip", version, about)]
struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log provider updates instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Override the maximum number of probes in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum FastIpExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (candidate list unavailable, unexpected failure)
    RuntimeError = 2,
}

impl From<FastIpExitCode> for ExitCode {
    fn from(code: FastIpExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Load the file, apply flag overrides, validate the result
fn load_config(cli: &Cli) -> fastip_core::Result<FastIpConfig> {
    let mut config = FastIpConfig::from_file(&cli.config)?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.dry_run {
        config.provider.set_dry_run(true);
    }
    if let Some(concurrency) = cli.concurrency {
        config.probe.concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FastIpExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&config.log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FastIpExitCode::ConfigError.into();
    }

    info!("Starting fastip");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FastIpExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(config, cli.json).await {
            Ok(()) => FastIpExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Configuration mistakes found while wiring components exit with 1
fn exit_code_for(err: &anyhow::Error) -> FastIpExitCode {
    match err.downcast_ref::<fastip_core::Error>() {
        Some(fastip_core::Error::Config(_)) => FastIpExitCode::ConfigError,
        _ => FastIpExitCode::RuntimeError,
    }
}

fn build_registry() -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    register_builtin(&registry);

    #[cfg(feature = "cloudflare")]
    {
        debug!("Registering Cloudflare publisher");
        fastip_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        debug!("Registering HTTP candidate source");
        fastip_source_http::register(&registry);
    }

    registry
}

/// Run one speed test
async fn run(config: FastIpConfig, json: bool) -> Result<()> {
    let registry = build_registry();

    let source = registry
        .create_candidate_source(&config.source)
        .context("Failed to create candidate source")?;
    let publisher = registry
        .create_publisher(&config.provider)
        .context("Failed to create publisher")?;

    info!(
        "Source: {}, provider: {}, record: {} ({})",
        source.source_name(),
        publisher.provider_name(),
        config.record.name,
        config.record.record_type
    );

    let (engine, mut events) = SpeedTestEngine::new(
        source,
        Arc::new(HttpsProber::new()),
        Arc::from(publisher),
        config,
    )?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let result = engine.run().await;
    // Closes the event channel so the logger drains and exits
    drop(engine);
    if let Err(e) = event_logger.await {
        warn!("Event logger task failed: {}", e);
    }

    let report = result.context("Speed test aborted")?;
    summarize(&report);

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", rendered);
    }

    Ok(())
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::ProbeCompleted {
            candidate,
            reachable: true,
            latency_secs: Some(latency),
            ..
        } => debug!("probe {}: {:.3}s", candidate, latency),
        EngineEvent::ProbeCompleted {
            candidate,
            failure,
            ..
        } => debug!(
            "probe {}: {}",
            candidate,
            failure.as_deref().unwrap_or("unreachable")
        ),
        EngineEvent::NewBest {
            candidate,
            latency_secs,
        } => debug!("new best {} ({:.3}s)", candidate, latency_secs),
        other => debug!("{:?}", other),
    }
}

fn summarize(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;
    info!(
        "Probed {} candidate(s) in {}ms: {} reachable, {} unreachable, {} skipped",
        report.probed,
        elapsed.num_milliseconds(),
        report.reachable,
        report.unreachable.len(),
        report.skipped
    );

    match &report.winner {
        Some(winner) => info!(
            "Fastest address: {} ({:.3}s)",
            winner.candidate, winner.latency_secs
        ),
        None => warn!("No usable address found; DNS record left unchanged"),
    }

    if report.panicked > 0 {
        warn!("{} probe task(s) panicked", report.panicked);
    }
    if report.publish_failures() > 0 {
        warn!("{} publish attempt(s) failed", report.publish_failures());
    }
}
