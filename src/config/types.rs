// Configuration types module
// Defines all configuration-related data structures

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration (production runtime)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Directory the paired frontend bundle is served from.
    pub static_dir: String,
    /// Index document `/` and any non-existent path fall back to.
    pub index_file: String,
}

/// API router configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Handler script root.
    pub dir: String,
    /// URL prefix API routes live under.
    pub prefix: String,
    /// Request body limit in bytes.
    pub body_limit: u64,
    /// Per-request timeout in milliseconds.
    pub timeout_millis: u64,
    pub cors: CorsPolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    #[serde(default)]
    pub access_log_file: Option<String>,
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

/// CORS policy: disabled, wildcard, or a single explicit origin.
///
/// Accepts `cors = false`, `cors = true`, or `cors = { origin = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    Disabled,
    Any,
    Origin(String),
}

impl CorsPolicy {
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Value for the allow-origin header, if CORS is enabled.
    pub fn allow_origin(&self) -> Option<&str> {
        match self {
            Self::Disabled => None,
            Self::Any => Some("*"),
            Self::Origin(origin) => Some(origin.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for CorsPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Table { origin: String },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(Self::Disabled),
            Raw::Flag(true) => Ok(Self::Any),
            Raw::Table { origin } => {
                if origin.is_empty() {
                    return Err(D::Error::custom("cors.origin must not be empty"));
                }
                Ok(Self::Origin(origin))
            }
        }
    }
}

impl Serialize for CorsPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Any => serializer.serialize_bool(true),
            Self::Origin(origin) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("origin", origin)?;
                map.end()
            }
        }
    }
}
