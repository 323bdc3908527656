//! # newsdigest-cli
//!
//! The `newsdigest` binary: load configuration and credentials, run one
//! curation, store the dated result. Exposed as a library so the pipeline
//! can be driven from tests with a scripted transport.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod logging;
pub mod pipeline;

pub use pipeline::{run_once, RunOptions};
