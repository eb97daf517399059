//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, LogFormat, LoggingConfig, PasswordConfig, ServerConfig, StoreConfig, DATA_PATH_ENV,
    DEFAULT_DATA_FILE,
};
