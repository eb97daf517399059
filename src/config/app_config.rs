use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable that overrides every configured data path
pub const DATA_PATH_ENV: &str = "KEYGATE_DATA_PATH";

/// File name used when only a data directory is known
pub const DEFAULT_DATA_FILE: &str = "keygate-data.json";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub password: PasswordConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Record store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Full path of the record file
    pub data_path: Option<PathBuf>,
    /// Directory to keep the record file in when no full path is given
    pub data_dir: Option<PathBuf>,
    /// Persist after every request that consumed quota
    pub save_on_use: bool,
}

/// Argon2id cost for newly hashed passwords
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            data_dir: None,
            save_on_use: true,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local`, an optional explicit file,
    /// then `APP__`-prefixed environment variables
    pub fn load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl StoreConfig {
    /// Where the record file lives
    ///
    /// Precedence: `KEYGATE_DATA_PATH`, `data_path`, `data_dir` joined with
    /// the default file name, the default file name in the working directory.
    pub fn resolve_data_path(&self) -> PathBuf {
        self.resolve_with_override(std::env::var(DATA_PATH_ENV).ok())
    }

    fn resolve_with_override(&self, env_override: Option<String>) -> PathBuf {
        if let Some(path) = env_override.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }

        if let Some(path) = self.data_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return path.clone();
        }

        if let Some(dir) = self.data_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            return dir.join(DEFAULT_DATA_FILE);
        }

        PathBuf::from(".").join(DEFAULT_DATA_FILE)
    }
}
