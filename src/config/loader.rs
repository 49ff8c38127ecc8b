//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, override merging, and one-time global
//! initialization of the Temporal connection settings.

use super::error::{ConfigResult, ConfigurationError};
use super::TemporalConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// Candidate file names inside the configuration directory
const CONFIG_FILE_NAMES: &[&str] = &["temporal-config.yaml", "temporal-config.yml"];

/// Well-known environment override sections
const ENVIRONMENT_SECTIONS: &[&str] = &["development", "test", "production"];

/// Upper bound for a configuration file; anything larger is rejected
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Loads the Temporal connection configuration once and holds it,
/// immutable, for the life of the process
#[derive(Debug)]
pub struct ConfigManager {
    config: TemporalConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;

        // Validate the loaded configuration
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&config)
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        crate::log_config!(info, "Configuration loaded successfully",
            environment: environment,
            service_url: config.service.url.clone(),
            service_secure: config.service.secure.clone()
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        env::var("TEMPORAL_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// Get default configuration directory
    fn default_config_directory() -> PathBuf {
        let possible_dirs = vec![
            PathBuf::from("config"),
            PathBuf::from("../config"),
            PathBuf::from("../../config"),
        ];

        for dir in possible_dirs {
            for name in CONFIG_FILE_NAMES {
                if dir.join(name).exists() {
                    debug!("Found config directory: {}", dir.display());
                    return dir;
                }
            }
        }

        // Fallback to ./config
        PathBuf::from("config")
    }

    /// Find the configuration file
    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    /// Safely read a configuration file with a size limit
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({} bytes > {} byte limit)",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file".to_string(),
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    /// Load and merge configuration with environment-specific overrides
    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<TemporalConfig> {
        let config_file = Self::find_config_file(config_directory)?;

        let yaml_content = Self::read_config_file_safely(&config_file)?;

        // Parse YAML as a generic value for manipulation
        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        // Apply environment-specific overrides
        if let Some(env_overrides) = yaml_data
            .get(&YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!(
                "Applying environment-specific overrides for: {}",
                environment
            );
            Self::merge_yaml_values(&mut yaml_data, env_overrides)?;
        }

        // Remove environment sections to avoid confusion
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(&YamlValue::String((*section).to_string()));
            }
        }

        // The connection settings live under the top-level `temporal` key
        let temporal_section = match yaml_data {
            YamlValue::Mapping(ref mut map) => map
                .remove(&YamlValue::String("temporal".to_string()))
                .ok_or_else(|| {
                    ConfigurationError::missing_required_field(
                        "temporal",
                        config_file.display().to_string(),
                    )
                })?,
            _ => {
                return Err(ConfigurationError::invalid_yaml(
                    config_file.display().to_string(),
                    "configuration root must be a mapping",
                ))
            }
        };

        // Convert to our config struct
        let mut config: TemporalConfig = serde_yaml::from_value(temporal_section).map_err(|e| {
            ConfigurationError::invalid_yaml(
                config_file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;

        Self::expand_environment_variables(&mut config);

        Ok(config)
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) -> ConfigResult<()> {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        // Recursively merge nested objects
                        Self::merge_yaml_values(existing_value, value)?;
                    } else {
                        // Add new key-value pair
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                // For non-mapping values, override completely
                *base_ref = override_val;
            }
        }
        Ok(())
    }

    /// Expand environment variables in configuration values
    fn expand_environment_variables(config: &mut TemporalConfig) {
        Self::expand_value(&mut config.service.url, "service.url");
        Self::expand_value(&mut config.service.secure, "service.secure");
    }

    /// Expand a single `${VAR}` value from the process environment
    ///
    /// An unset variable keeps the literal value so the failure shows up in
    /// validation or downstream connection errors with the reference intact.
    fn expand_value(value: &mut String, field: &str) {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = value[2..value.len() - 1].to_string();
            match env::var(&var_name) {
                Ok(env_value) => {
                    debug!("Expanding environment variable {} in {}", var_name, field);
                    *value = env_value;
                }
                Err(_) => {
                    warn!(
                        "Environment variable {} referenced by {} not found, keeping original value",
                        var_name, field
                    );
                }
            }
        }
    }
}

/// Global configuration singleton for easy access throughout the application
static GLOBAL_CONFIG: OnceLock<Arc<ConfigManager>> = OnceLock::new();
static CONFIG_LOCK: Mutex<()> = Mutex::new(());

impl ConfigManager {
    /// Get or initialize the global configuration instance
    ///
    /// On load failure the global handle holds an unbound config: readers
    /// see empty values rather than a fabricated server address.
    pub fn global() -> Arc<ConfigManager> {
        GLOBAL_CONFIG
            .get_or_init(|| {
                let _lock = CONFIG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                ConfigManager::load().unwrap_or_else(|e| {
                    warn!("Configuration loading failed, global config stays unbound: {e}");
                    Arc::new(ConfigManager::unbound())
                })
            })
            .clone()
    }

    /// Initialize global configuration with a specific directory
    ///
    /// The first initialization wins; later calls return the value already
    /// held by the global handle.
    pub fn initialize_global(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let _lock = CONFIG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let config_manager = ConfigManager::load_from_directory(config_dir)?;

        // This will only succeed once, but that's what we want for a singleton
        let _ = GLOBAL_CONFIG.set(config_manager.clone());

        Ok(GLOBAL_CONFIG.get().cloned().unwrap_or(config_manager))
    }

    /// A manager whose config was never bound; all reads surface empty values
    fn unbound() -> ConfigManager {
        ConfigManager {
            config: TemporalConfig::default(),
            environment: Self::detect_environment(),
            config_directory: PathBuf::from("config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_yaml() -> &'static str {
        r#"
# Test configuration
temporal:
  service:
    url: "localhost:7233"
    secure: "false"

# Environment-specific overrides
test:
  temporal:
    service:
      url: "localhost:7233"

production:
  temporal:
    service:
      url: "temporal.internal:443"
      secure: "true"
"#
    }

    fn setup_test_config_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().to_path_buf();
        let config_file = config_dir.join("temporal-config.yaml");

        fs::write(&config_file, create_test_config_yaml()).unwrap();

        (temp_dir, config_dir)
    }

    #[test]
    fn test_environment_detection() {
        env::set_var("TEMPORAL_ENV", "Production");
        let environment = ConfigManager::detect_environment();
        assert_eq!(environment, "production");
        env::remove_var("TEMPORAL_ENV");
    }

    #[test]
    fn test_load_base_configuration() {
        let (_temp_dir, config_dir) = setup_test_config_dir();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(config_dir.clone()), "development")
                .unwrap();

        assert_eq!(manager.config().service_url(), "localhost:7233");
        assert_eq!(manager.config().service_secure(), "false");
        assert_eq!(manager.environment(), "development");
        assert_eq!(manager.config_directory(), config_dir.as_path());
    }

    #[test]
    fn test_environment_overrides_replace_base_values() {
        let (_temp_dir, config_dir) = setup_test_config_dir();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(config_dir), "production").unwrap();

        assert_eq!(manager.config().service_url(), "temporal.internal:443");
        assert_eq!(manager.config().service_secure(), "true");
    }

    #[test]
    fn test_override_section_only_touches_named_keys() {
        let (_temp_dir, config_dir) = setup_test_config_dir();

        // The test section overrides url only; secure comes from the base
        let manager =
            ConfigManager::load_from_directory_with_env(Some(config_dir), "test").unwrap();

        assert_eq!(manager.config().service_url(), "localhost:7233");
        assert_eq!(manager.config().service_secure(), "false");
    }

    #[test]
    fn test_missing_config_file_reports_searched_paths() {
        let temp_dir = TempDir::new().unwrap();

        let error = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        let error_string = error.to_string();
        assert!(error_string.contains("Configuration file not found"));
        assert!(error_string.contains("temporal-config.yaml"));
        assert!(error_string.contains("temporal-config.yml"));
    }

    #[test]
    fn test_missing_temporal_section_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("temporal-config.yaml");
        fs::write(&config_file, "other:\n  key: value\n").unwrap();

        let error = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        assert!(error
            .to_string()
            .contains("Missing required configuration field 'temporal'"));
    }

    #[test]
    fn test_missing_service_url_refuses_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("temporal-config.yaml");
        fs::write(
            &config_file,
            "temporal:\n  service:\n    secure: \"false\"\n",
        )
        .unwrap();

        let error = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        assert!(error.to_string().contains("service.url"));
    }

    #[test]
    fn test_invalid_yaml_reports_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("temporal-config.yaml");
        fs::write(&config_file, "temporal: [unclosed\n").unwrap();

        let error = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        let error_string = error.to_string();
        assert!(error_string.contains("Invalid YAML"));
        assert!(error_string.contains("temporal-config.yaml"));
    }

    #[test]
    fn test_environment_variable_expansion() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("temporal-config.yaml");
        fs::write(
            &config_file,
            "temporal:\n  service:\n    url: \"${TEMPORAL_LOADER_TEST_URL}\"\n    secure: \"true\"\n",
        )
        .unwrap();

        env::set_var("TEMPORAL_LOADER_TEST_URL", "temporal.example.com:7233");
        let manager = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap();
        env::remove_var("TEMPORAL_LOADER_TEST_URL");

        assert_eq!(manager.config().service_url(), "temporal.example.com:7233");
    }

    #[test]
    fn test_unset_environment_variable_keeps_literal() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("temporal-config.yaml");
        fs::write(
            &config_file,
            "temporal:\n  service:\n    url: \"${TEMPORAL_LOADER_TEST_UNSET}\"\n    secure: \"false\"\n",
        )
        .unwrap();

        let manager = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap();

        assert_eq!(
            manager.config().service_url(),
            "${TEMPORAL_LOADER_TEST_UNSET}"
        );
    }

    #[test]
    fn test_loading_twice_is_idempotent() {
        let (_temp_dir, config_dir) = setup_test_config_dir();

        let first =
            ConfigManager::load_from_directory_with_env(Some(config_dir.clone()), "production")
                .unwrap();
        let second =
            ConfigManager::load_from_directory_with_env(Some(config_dir), "production").unwrap();

        assert_eq!(first.config().service_url(), second.config().service_url());
        assert_eq!(
            first.config().service_secure(),
            second.config().service_secure()
        );
        assert_eq!(first.environment(), second.environment());
    }

    #[test]
    fn test_merge_yaml_values_deep_merge() {
        let mut base: YamlValue = serde_yaml::from_str(
            r#"
temporal:
  service:
    url: "localhost:7233"
    secure: "false"
"#,
        )
        .unwrap();

        let overrides: YamlValue = serde_yaml::from_str(
            r#"
temporal:
  service:
    secure: "true"
"#,
        )
        .unwrap();

        ConfigManager::merge_yaml_values(&mut base, overrides).unwrap();

        let service = &base["temporal"]["service"];
        assert_eq!(service["url"].as_str(), Some("localhost:7233"));
        assert_eq!(service["secure"].as_str(), Some("true"));
    }

    #[test]
    fn test_directory_instead_of_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("temporal-config.yaml")).unwrap();

        let error = ConfigManager::load_from_directory_with_env(
            Some(temp_dir.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        assert!(error.to_string().contains("regular file"));
    }
}
