// Configuration module entry point
// Loads the process-wide configuration; immutable for the process lifetime.

mod types;

use std::net::SocketAddr;

pub use types::{
    ApiConfig, Config, CorsPolicy, LoggingConfig, PerformanceConfig, ServerConfig,
};

impl Config {
    /// Load configuration from the default `config.toml`.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a file path (without extension), layered with
    /// `APIROUTE`-prefixed environment overrides. The file is the primary
    /// channel; the environment only overrides individual keys (for example
    /// `APIROUTE_SERVER__PORT`, `APIROUTE_API__TIMEOUT_MILLIS`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("APIROUTE").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4173)?
            .set_default("server.static_dir", "dist/public")?
            .set_default("server.index_file", "index.html")?
            .set_default("api.dir", "server/api")?
            .set_default("api.prefix", "/api")?
            .set_default("api.body_limit", 1_000_000)?
            .set_default("api.timeout_millis", 30_000)?
            .set_default("api.cors", false)?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// API prefix normalized to `/prefix` form with no trailing slash.
    pub fn api_prefix(&self) -> String {
        let trimmed = self.api.prefix.trim_matches('/');
        format!("/{trimmed}")
    }
}
