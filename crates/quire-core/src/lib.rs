//! Core types and trait definitions for the Quire catalog.
//!
//! This crate has no database dependencies. It defines the
//! three-level content hierarchy (series, volume, chapter), the typed error
//! kinds every backend reports, the publishing state machine, the content
//! metrics calculator, and the write/read/identity traits that backends and
//! collaborators implement.

// Native `async fn` in traits; the returned futures are declared `Send`
// explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod association;
pub mod content;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod pagination;
pub mod publishing;
pub mod query;
pub mod request;
pub mod store;

pub use error::{EntityKind, Error, ErrorKind, Result, parse_id};
