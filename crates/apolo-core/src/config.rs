//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Database configuration
///
/// When `url` is unset the engine runs without a CDR store.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Redis configuration
///
/// When `url` is unset the in-process cache and locker are used.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default)]
    pub url: Option<String>,

    /// TTL for cached items in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Expiry of a held lock key in milliseconds, so a crashed holder cannot wedge others
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_ms: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_lock_ttl() -> u64 {
    30_000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            cache_ttl_secs: default_cache_ttl(),
            lock_ttl_ms: default_lock_ttl(),
        }
    }
}

/// Settings shared by the notification and remote-call handlers
#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Accept invalid TLS certificates on outbound HTTP
    #[serde(default)]
    pub http_skip_tls_verify: bool,

    /// Reply timeout for HTTP posts and RPC calls, in seconds
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_secs: u64,

    /// Connect timeout for RPC clients, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Delivery attempts for HTTP posts
    #[serde(default = "default_poster_attempts")]
    pub poster_attempts: u32,

    /// Directory receiving payloads of failed posts
    #[serde(default = "default_failed_posts_dir")]
    pub failed_posts_dir: String,

    /// Suffix of fallback files holding JSON payloads
    #[serde(default = "default_json_suffix")]
    pub json_file_suffix: String,

    /// How long lock acquisition may wait, in milliseconds (0 waits forever)
    #[serde(default)]
    pub locking_timeout_ms: u64,
}

fn default_reply_timeout() -> u64 {
    2
}

fn default_connect_timeout() -> u64 {
    1
}

fn default_poster_attempts() -> u32 {
    3
}

fn default_failed_posts_dir() -> String {
    "/var/spool/apolo/failed_posts".to_string()
}

fn default_json_suffix() -> String {
    ".json".to_string()
}

impl GeneralConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `None` means wait indefinitely
    pub fn locking_timeout(&self) -> Option<Duration> {
        (self.locking_timeout_ms > 0).then(|| Duration::from_millis(self.locking_timeout_ms))
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            http_skip_tls_verify: false,
            reply_timeout_secs: default_reply_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            poster_attempts: default_poster_attempts(),
            failed_posts_dir: default_failed_posts_dir(),
            json_file_suffix: default_json_suffix(),
            locking_timeout_ms: 0,
        }
    }
}

/// SMTP settings for `*mail_async`
#[derive(Debug, Deserialize, Clone)]
pub struct MailerConfig {
    /// SMTP server as `host:port`
    #[serde(default = "default_mail_server")]
    pub server: String,

    #[serde(default)]
    pub auth_user: String,

    #[serde(default)]
    pub auth_password: String,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Base unit of the linear retry back-off, in seconds
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

fn default_mail_server() -> String {
    "localhost:25".to_string()
}

fn default_from_address() -> String {
    "apolo@localhost".to_string()
}

fn default_retry_interval() -> u64 {
    60
}

impl MailerConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// Host part of `server`
    pub fn host(&self) -> &str {
        self.server
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.server)
    }

    /// Port part of `server`, 25 when absent or unparsable
    pub fn port(&self) -> u16 {
        self.server
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or(25)
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            server: default_mail_server(),
            auth_user: String::new(),
            auth_password: String::new(),
            from_address: default_from_address(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("redis.cache_ttl_secs", 300)?
            .set_default("redis.lock_ttl_ms", 30_000)?
            .set_default("general.http_skip_tls_verify", false)?
            .set_default("general.reply_timeout_secs", 2)?
            .set_default("general.connect_timeout_secs", 1)?
            .set_default("general.poster_attempts", 3)?
            .set_default("general.failed_posts_dir", "/var/spool/apolo/failed_posts")?
            .set_default("general.json_file_suffix", ".json")?
            .set_default("general.locking_timeout_ms", 0)?
            .set_default("mailer.server", "localhost:25")?
            .set_default("mailer.from_address", "apolo@localhost")?
            .set_default("mailer.retry_interval_secs", 60)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with APOLO_ prefix
            .add_source(
                Environment::with_prefix("APOLO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("APOLO").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
