//! # Temporal Connection Configuration
//!
//! Configuration management for the connection to an external Temporal
//! workflow server. Values live under the top-level `temporal` key of a
//! YAML configuration file and are resolved exactly once, before the
//! application serves any traffic.
//!
//! ## Architecture
//!
//! - **Single Source of Truth**: all values come from `temporal-config.yaml`
//! - **Environment Awareness**: supports development/test/production overrides
//! - **Explicit Validation**: required keys fail fast instead of being
//!   silently replaced by fallback addresses
//! - **Immutable After Load**: no setters, no reload path
//!
//! ## Usage
//!
//! ```rust,no_run
//! use temporal_config::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! // Access configuration values
//! let url = manager.config().service_url();
//! let secure = manager.config().service_secure();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure for the `temporal` namespace
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemporalConfig {
    /// Workflow server connection settings
    #[serde(default)]
    pub service: ServerConnectionConfig,
}

/// Connection settings for the external Temporal workflow server
///
/// Both fields are bound once during startup and never reassigned. The
/// `secure` flag stays raw text; the connection builder consuming this
/// config decides what the literal means for transport security.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConnectionConfig {
    /// Network address of the workflow server (`temporal.service.url`),
    /// host:port or URI
    #[serde(default)]
    pub url: String,

    /// Transport security flag (`temporal.service.secure`)
    #[serde(default)]
    pub secure: String,
}

impl ServerConnectionConfig {
    /// Bind both connection values at construction; there are no setters
    pub fn new(url: impl Into<String>, secure: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secure: secure.into(),
        }
    }
}

impl TemporalConfig {
    /// Get the bound workflow server address
    ///
    /// Returns the empty string when binding has not happened yet. Reading
    /// the value before bootstrap completes is a usage error in the
    /// surrounding system, not in this config.
    pub fn service_url(&self) -> &str {
        &self.service.url
    }

    /// Get the bound transport security flag, unmodified
    pub fn service_secure(&self) -> &str {
        &self.service.secure
    }

    /// Validate configuration for required fields
    ///
    /// Called by the loader after binding so a missing key refuses startup
    /// instead of handing downstream consumers an empty address.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.service.url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "service.url",
                "temporal service configuration",
            ));
        }

        if self.service.secure.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "service.secure",
                "temporal service configuration",
            ));
        }

        Ok(())
    }
}
