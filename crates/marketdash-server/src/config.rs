use marketdash_auth::config::AuthConfig;
use marketdash_cache::DEFAULT_MAX_ENTRIES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{net::SocketAddr, time::Duration};

use crate::market::CacheTier;

/// Errors raised while loading or validating [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[source] config::ConfigError),

    #[error("config deserialize error: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("config render error: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Admin authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Market data cache
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
    /// Upstream market data sources keyed by the name used in
    /// `/api/market/{source}`
    #[serde(default = "default_upstreams")]
    pub upstreams: BTreeMap<String, UpstreamConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            housekeeping: HousekeepingConfig::default(),
            upstreams: default_upstreams(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Server validations
        if self.server.port == 0 {
            return Err(invalid("server.port must be > 0"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes must be > 0"));
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| invalid(format!("auth config error: {e}")))?;
        // Cache validation
        if self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries must be > 0"));
        }
        if self.cache.stale_retention.is_zero() {
            return Err(invalid("cache.stale_retention must be > 0"));
        }
        for tier in CacheTier::ALL {
            if self.cache.ttl_for(tier).is_zero() {
                return Err(invalid(format!("cache.{}_ttl must be > 0", tier.as_str())));
            }
        }
        if self.housekeeping.interval.is_zero() {
            return Err(invalid("housekeeping.interval must be > 0"));
        }
        // Upstream validation
        for (name, upstream) in &self.upstreams {
            if upstream.url.trim().is_empty() {
                return Err(invalid(format!("upstreams.{name}.url must not be empty")));
            }
            if upstream.timeout.is_zero() {
                return Err(invalid(format!("upstreams.{name}.timeout must be > 0")));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Render the effective configuration as TOML. The admin secret is never
    /// included.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Market data cache configuration.
///
/// ```toml
/// [cache]
/// max_entries = 1024
/// stale_retention = "24h"
/// short_ttl = "1m"
/// medium_ttl = "3m"
/// long_ttl = "5m"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Stale entries older than this are dropped by housekeeping
    #[serde(with = "humantime_serde")]
    pub stale_retention: Duration,
    #[serde(with = "humantime_serde")]
    pub short_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub medium_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub long_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            stale_retention: Duration::from_secs(24 * 3600),
            short_ttl: CacheTier::Short.default_ttl(),
            medium_ttl: CacheTier::Medium.default_ttl(),
            long_ttl: CacheTier::Long.default_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Short => self.short_ttl,
            CacheTier::Medium => self.medium_ttl,
            CacheTier::Long => self.long_ttl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// A single upstream JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    #[serde(default)]
    pub tier: CacheTier,
    #[serde(default = "default_upstream_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(10)
}

impl UpstreamConfig {
    pub fn new(url: impl Into<String>, tier: CacheTier) -> Self {
        Self {
            url: url.into(),
            tier,
            timeout: default_upstream_timeout(),
        }
    }
}

fn default_upstreams() -> BTreeMap<String, UpstreamConfig> {
    [
        (
            "prices",
            "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin,ethereum,solana&vs_currencies=usd&include_24hr_change=true",
            CacheTier::Short,
        ),
        (
            "dex-volume",
            "https://api.llama.fi/overview/dexs?excludeTotalDataChart=true&excludeTotalDataChartBreakdown=true",
            CacheTier::Medium,
        ),
        (
            "memecoins",
            "https://api.dexscreener.com/token-boosts/top/v1",
            CacheTier::Medium,
        ),
        ("tvl", "https://api.llama.fi/v2/chains", CacheTier::Long),
        (
            "sentiment",
            "https://api.alternative.me/fng/?limit=1",
            CacheTier::Long,
        ),
    ]
    .into_iter()
    .map(|(name, url, tier)| (name.to_string(), UpstreamConfig::new(url, tier)))
    .collect()
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    /// Default config file looked up when no path is given.
    pub const DEFAULT_CONFIG_PATH: &str = "marketdash.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf).format(FileFormat::Toml));
        }
        // Environment variable overrides, e.g., MARKETDASH__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("MARKETDASH")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder.build().map_err(ConfigError::Build)?;
        let merged: AppConfig = cfg.try_deserialize().map_err(ConfigError::Deserialize)?;
        merged.validate()?;
        Ok(merged)
    }
}
