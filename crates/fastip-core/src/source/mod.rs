//! Built-in candidate sources
//!
//! - [`FileCandidateSource`]: newline-separated list on local disk
//! - [`StaticCandidateSource`]: inline list from configuration

pub mod file;
pub mod static_list;

pub use file::{FileCandidateSource, FileSourceFactory};
pub use static_list::{StaticCandidateSource, StaticSourceFactory};
