//! Backend for shotlens - turns batches of game screenshots into an analysis
//!
//! Screenshots are described by a vision model, the descriptions are combined
//! and handed to a reasoning model, and its answer is returned over HTTP.
//! The same server also hosts the static front end.

pub mod ai;
pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod prompts;
pub mod server;

pub use error::{Error, ErrorKind, Result};
