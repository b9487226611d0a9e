//! SQLite backend for the streak tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Claims run in `BEGIN IMMEDIATE`
//! transactions, which take SQLite's write lock before the first read.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, SqliteTx};
