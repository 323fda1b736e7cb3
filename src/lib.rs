//! Local job, client and time tracking store for independent tradespeople.
//!
//! Data lives in named JSON collections inside a key-value store; see
//! [`storage`] for the persistence rules and [`repos::Store`] for the
//! access surface.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod placeholders;
pub mod repos;
pub mod seed;
pub mod stats;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
pub use repos::Store;
