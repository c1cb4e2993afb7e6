//! Engine configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via LAUNDRY_CONFIG or --config)
//! 3. Environment variables

use crate::identity::TokenIdentityProvider;
use laundry_storage::cache::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Read cache configuration.
    pub cache: CacheConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Load simulation configuration.
    pub simulation: SimulationConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LAUNDRY_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Like `load`, but reads the YAML file at `path` when one is given.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.cache.apply_env_overrides();
        self.auth.apply_env_overrides();
        self.simulation.apply_env_overrides();
        self.metrics.apply_env_overrides();
    }

    /// Loads secrets from external file if configured.
    pub fn load_secrets(&mut self) -> Result<(), ConfigError> {
        self.auth.load_secrets()
    }

    /// Checks every section for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.simulation.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Read cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached machine records.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(capacity) = std::env::var("LAUNDRY_CACHE_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.capacity = n;
            }
        }
    }

    /// Rejects a zero capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// List of valid token hashes (SHA-256 hex strings).
    #[serde(default)]
    pub token_hashes: Vec<String>,
    /// Optional path to external secrets file containing token hashes (one per line).
    #[serde(default)]
    pub secrets_file: Option<PathBuf>,
}

impl AuthConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(hash) = std::env::var("LAUNDRY_AUTH_TOKEN_HASH") {
            if !hash.is_empty() {
                self.token_hashes.push(hash);
            }
        }

        if let Ok(path) = std::env::var("LAUNDRY_AUTH_SECRETS_FILE") {
            self.secrets_file = Some(PathBuf::from(path));
        }
    }

    /// Loads token hashes from the secrets file if configured.
    pub fn load_secrets(&mut self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.secrets_file {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(path.clone(), e))?;
            for line in content.lines() {
                let line = line.trim();
                // Skip empty lines and comments
                if !line.is_empty() && !line.starts_with('#') {
                    self.token_hashes.push(line.to_string());
                }
            }
        }
        Ok(())
    }

    /// Adds the hash of a plaintext token.
    pub fn allow_token(&mut self, token: &str) {
        self.token_hashes
            .push(TokenIdentityProvider::hash_token(token));
    }
}

/// Load simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of independent runs.
    pub iterations: u32,
    /// Requests per run.
    pub runs: u32,
    /// Machines seeded per run.
    pub machines: u32,
    /// Distinct locations the machines are spread over.
    pub locations: u32,
    /// Probability that a start faults.
    pub hardware_failure_rate: f64,
    /// RNG seed for the request mix and hardware faults.
    pub seed: u64,
    /// Bearer token the simulated clients present.
    pub token: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 4,
            runs: 10_000,
            machines: 100,
            locations: 5,
            hardware_failure_rate: 0.05,
            seed: 12345,
            token: "sim-token".to_string(),
        }
    }
}

impl SimulationConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LAUNDRY_SIM_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.iterations = n;
            }
        }

        if let Ok(v) = std::env::var("LAUNDRY_SIM_RUNS") {
            if let Ok(n) = v.parse() {
                self.runs = n;
            }
        }

        if let Ok(v) = std::env::var("LAUNDRY_SIM_MACHINES") {
            if let Ok(n) = v.parse() {
                self.machines = n;
            }
        }

        if let Ok(v) = std::env::var("LAUNDRY_SIM_LOCATIONS") {
            if let Ok(n) = v.parse() {
                self.locations = n;
            }
        }

        if let Ok(v) = std::env::var("LAUNDRY_SIM_FAILURE_RATE") {
            if let Ok(rate) = v.parse() {
                self.hardware_failure_rate = rate;
            }
        }

        if let Ok(v) = std::env::var("LAUNDRY_SIM_SEED") {
            if let Ok(seed) = v.parse() {
                self.seed = seed;
            }
        }

        if let Ok(token) = std::env::var("LAUNDRY_SIM_TOKEN") {
            self.token = token;
        }
    }

    /// Rejects a failure rate outside `[0, 1]` and empty machine or location counts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.hardware_failure_rate) {
            return Err(ConfigError::ValidationError(format!(
                "simulation.hardware_failure_rate must be within [0, 1], got {}",
                self.hardware_failure_rate
            )));
        }
        if self.machines == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.machines must be greater than 0".to_string(),
            ));
        }
        if self.locations == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.locations must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Print the Prometheus exposition after a simulation.
    #[serde(default)]
    pub enabled: bool,
}

impl MetricsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("LAUNDRY_METRICS_ENABLED") {
            self.enabled = enabled == "1" || enabled.to_lowercase() == "true";
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, 64);
        assert!(config.auth.token_hashes.is_empty());
        assert_eq!(config.simulation.iterations, 4);
        assert_eq!(config.simulation.runs, 10_000);
        assert_eq!(config.simulation.machines, 100);
        assert_eq!(config.simulation.locations, 5);
        assert_eq!(config.simulation.hardware_failure_rate, 0.05);
        assert!(!config.metrics.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = Config::default();
        config.cache.capacity = 16;
        config.simulation.seed = 7;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.cache.capacity, 16);
        assert_eq!(parsed.simulation.seed, 7);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("simulation:\n  runs: 50\n").unwrap();
        assert_eq!(parsed.simulation.runs, 50);
        assert_eq!(parsed.simulation.machines, 100);
        assert_eq!(parsed.cache.capacity, 64);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laundry.yaml");

        let mut config = Config::default();
        config.auth.allow_token("secret");
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(
            loaded.auth.token_hashes,
            vec![TokenIdentityProvider::hash_token("secret")]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/laundry.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache: [not, a, map]").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_load_secrets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# operators").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  abc123  ").unwrap();
        writeln!(file, "def456").unwrap();

        let mut config = Config::default();
        config.auth.secrets_file = Some(file.path().to_path_buf());
        config.load_secrets().unwrap();
        assert_eq!(config.auth.token_hashes, vec!["abc123", "def456"]);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.simulation.hardware_failure_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.locations = 0;
        assert!(config.validate().is_err());
    }
}
