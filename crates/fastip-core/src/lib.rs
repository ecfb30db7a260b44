// # fastip-core
//
// Core library for picking the fastest reachable address and publishing it
// to DNS.
//
// ## Architecture Overview
//
// - **CandidateSource**: Trait for producing the candidate address list
// - **Prober**: Trait for a single latency measurement
// - **Publisher**: Trait for updating a DNS record via a provider API
// - **WorkerPool**: Semaphore-gated executor, at most N probes in flight
// - **ResultAggregator**: Lock-guarded best-result reducer with a one-time
//   first-success publish
// - **SpeedTestEngine**: Orchestrates source → pool → aggregator → publish
// - **ComponentRegistry**: Plugin-based registry for publishers and sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from I/O implementations
// 2. **Bounded Concurrency**: Probes never exceed the configured limit
// 3. **Plugin-Based**: Providers and sources are registered by type name
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotent Publishing**: The same address may be published twice per run

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod registry;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use aggregator::{Finalization, Observation, ResultAggregator, Winner};
pub use config::{FastIpConfig, ProbeConfig, ProviderConfig, RecordConfig, SourceConfig};
pub use engine::{EngineEvent, PublishReport, PublishStage, RunReport, SpeedTestEngine};
pub use error::{Error, Result};
pub use pool::{PoolReport, Slot, WorkerPool};
pub use registry::ComponentRegistry;
pub use source::{FileCandidateSource, StaticCandidateSource};
pub use traits::{
    Candidate, CandidateSource, ProbeFailure, ProbeOutcome, ProbeSettings, Prober,
    PublishResult, Publisher, RecordTarget,
};
