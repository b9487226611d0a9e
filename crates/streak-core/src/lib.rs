//! Core types and trait definitions for the streak tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! evaluator is a pure function; everything that touches storage goes through
//! the [`store::StreakStore`] trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod claim;
pub mod clock;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod interaction;
pub mod reward;
pub mod store;
pub mod user;

pub use error::{Error, Result};
