//! Core traits for fastip
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CandidateSource`]: Produce the candidate address list
//! - [`Prober`]: Measure one candidate
//! - [`Publisher`]: Update the DNS record with the winner

pub mod candidate_source;
pub mod prober;
pub mod publisher;

pub use candidate_source::{Candidate, CandidateSource, CandidateSourceFactory, split_candidate_list};
pub use prober::{ProbeFailure, ProbeOutcome, ProbeSettings, Prober, UNREACHABLE_SCORE};
pub use publisher::{PublishResult, Publisher, PublisherFactory, RecordTarget};
