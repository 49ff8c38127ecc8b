#![allow(clippy::doc_markdown)] // Allow technical terms like YAML, TLS in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Temporal Config
//!
//! Connection configuration for Temporal workflow service clients, resolved
//! once at process startup and immutable afterwards.
//!
//! ## Overview
//!
//! This crate holds the two values an application needs to reach an external
//! Temporal workflow server: the service address and a textual transport
//! security flag. Both live under the `temporal` namespace of a YAML
//! configuration file and are bound during bootstrap, before any traffic is
//! served. A connection builder elsewhere in the application consumes the
//! bound values; opening connections and negotiating TLS are out of scope
//! here.
//!
//! ## Configuration Keys
//!
//! | key | effect |
//! |---|---|
//! | `temporal.service.url` | workflow server address (host:port or URI) |
//! | `temporal.service.secure` | transport security flag, kept as raw text |
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration model, loader, and error types
//! - [`logging`] - Console logging setup for configuration lifecycle events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use temporal_config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! temporal_config::logging::init_tracing();
//!
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! // Hand the bound values to a connection builder
//! let url = manager.config().service_url();
//! let secure = manager.config().service_secure();
//! println!("Temporal server at {url} (secure: {secure})");
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration File
//!
//! `config/temporal-config.yaml`, with optional per-environment overrides
//! merged over the base values:
//!
//! ```yaml
//! temporal:
//!   service:
//!     url: "localhost:7233"
//!     secure: "false"
//!
//! production:
//!   temporal:
//!     service:
//!       url: "temporal.internal:443"
//!       secure: "true"
//! ```

pub mod config;
pub mod logging;

pub use config::{
    ConfigManager, ConfigResult, ConfigurationError, ServerConnectionConfig, TemporalConfig,
};
