//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the media engine crates:
//! - Logging and tracing setup
//! - Engine configuration (injected host capabilities)
//!
//! ## Overview
//!
//! Nothing in the engine reaches for a global logger or a global settings
//! object. Host capabilities are gathered once into an
//! [`EngineConfig`](config::EngineConfig) and handed to every engine
//! instance; diagnostics flow through `tracing`, which this crate wires to
//! stdout and, optionally, to a host [`LoggerSink`](bridge_traits::LoggerSink).

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
