//! Core domain + application logic for fambot.
//!
//! This crate is intentionally transport-agnostic. Telegram and the external
//! HTTP APIs (weather, currency, completion, translation, news) live behind
//! ports (traits) implemented in adapter crates.

pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod delivery;
pub mod digest;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod outbound;
pub mod ports;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
