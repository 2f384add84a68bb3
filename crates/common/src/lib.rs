//! Shared types for the storefront session client
//!
//! `Secret` wraps bearer tokens so they never reach logs, and `Error` covers
//! configuration loading for every crate that reads a TOML file.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
