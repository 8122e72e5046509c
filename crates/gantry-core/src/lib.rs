//! Core library for Gantry
//!
//! Ties together configuration loading, the team resolver, and the
//! instrumented call boundary that the external API caller consumes.

pub mod boundary;
pub mod config;
pub mod error;
pub mod resolver;

pub use boundary::instrument_call;
pub use config::Config;
pub use error::{ConfigError, GantryError, Result};
pub use resolver::{ResolvedTeam, TeamResolver};
