//! SQLite backend for the Quire catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on dedicated threads
//! without blocking the async runtime. [`SqliteStore`] is the transactional
//! write side; [`SqliteReader`] is the read side (listings and the aggregated
//! detail view) and runs on a separate connection.

mod association;
mod encode;
mod filter;
mod guard;
mod reader;
mod schema;
mod store;
mod update;

pub mod error;

pub use error::{Error, Result};
pub use reader::SqliteReader;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
