//! # newsdigest core library
//!
//! Data model, curation rules, configuration and storage for the daily
//! news digest pipeline.
//!
//! A digest is a [`CuratedResult`]: an ordered, non-empty list of
//! [`CuratedItem`]s plus a short introduction. The generation client in
//! `newsdigest-llm` produces one from a model answer via
//! [`curation::finalize`]; a [`persistence::DigestSink`] stores it.
//!
//! ## Guarantees of a finalized digest
//!
//! - `0 < items.len() <= max_items`
//! - every item has a non-empty title and source
//! - items keep the order the model gave them

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod curation;
pub mod error;
pub mod persistence;
pub mod types;

pub use config::{Credentials, DigestConfig};
pub use error::DigestError;
pub use types::{CuratedItem, CuratedResult, DigestRecord};
