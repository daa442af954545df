//! Configuration Manager

use super::{Config, LogFormat};
use crate::Result;
use anyhow::{bail, Context};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Where configuration is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the given path; built-in defaults apply
    Defaults(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Defaults(path) => {
                write!(f, "built-in defaults ({} not found)", path.display())
            }
        }
    }
}

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration: defaults, then the file if present, then the process environment
    pub fn load(path: &Path) -> Result<Config> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Like [`ConfigManager::load`], reading environment variables through `lookup`
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(lookup)?;
        config
            .validate()
            .with_context(|| "Configuration validation failed")?;
        Ok(config)
    }

    pub fn source(path: &Path) -> ConfigSource {
        if path.exists() {
            ConfigSource::File(path.to_path_buf())
        } else {
            ConfigSource::Defaults(path.to_path_buf())
        }
    }

    fn read_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.logging.level = normalize_log_level(&config.logging.level);

        Ok(config)
    }
}

impl Config {
    /// Override fields from environment variables, read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            let ip = host
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid HOST: {}", host))?;
            self.server.bind_addr.set_ip(ip);
        }

        if let Some(port) = lookup("APP_PORT") {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid APP_PORT: {}", port))?;
            self.server.bind_addr.set_port(port);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = normalize_log_level(&level);
        }

        if let Some(origins) = lookup("CORS_ALLOW_ORIGINS") {
            self.server.cors_allow_origins = parse_cors_origins(&origins);
        }

        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = Some(url);
        }

        if let Some(key) = lookup("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(key);
        }

        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = Some(key);
        }

        if let Some(schema) = lookup("SUPABASE_SCHEMA") {
            self.supabase.schema = schema;
        }

        if let Some(table) = lookup("SUPABASE_TABLE") {
            self.supabase.table = table;
        }

        if let Some(native) = lookup("METRICS_NATIVE_BACKEND") {
            self.metrics.native_backend = native
                .parse::<bool>()
                .with_context(|| format!("Invalid METRICS_NATIVE_BACKEND: {}", native))?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_supabase_config()
            .with_context(|| "Supabase configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.bind_addr.port() == 0 {
            bail!("bind_addr port must be greater than 0");
        }

        if self.server.shutdown_timeout < Duration::from_secs(1) {
            bail!("shutdown_timeout must be at least 1 second");
        }

        if self.server.shutdown_timeout > Duration::from_secs(300) {
            bail!("shutdown_timeout cannot exceed 5 minutes");
        }

        for origin in &self.server.cors_allow_origins {
            if origin.is_empty() {
                bail!("cors_allow_origins contains an empty origin");
            }
        }

        Ok(())
    }

    fn validate_supabase_config(&self) -> Result<()> {
        if let Some(url) = self.supabase.url.as_deref().filter(|u| !u.is_empty()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("supabase.url must start with http:// or https://");
            }
        }

        if !is_identifier(&self.supabase.schema) {
            bail!("supabase.schema must be a non-empty identifier");
        }

        if !is_identifier(&self.supabase.table) {
            bail!("supabase.table must be a non-empty identifier");
        }

        if self.supabase.request_timeout.is_zero() {
            bail!("supabase.request_timeout must be greater than 0");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "logging.level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments; an unparseable bind address is an error
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        log_level: Option<&str>,
        log_format: Option<LogFormat>,
        no_native_metrics: bool,
    ) -> Result<()> {
        if let Some(bind_str) = bind {
            self.server.bind_addr = bind_str
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {}", bind_str))?;
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
        }

        if let Some(level) = log_level {
            self.logging.level = normalize_log_level(level);
        }

        if let Some(format) = log_format {
            self.logging.format = format;
        }

        if no_native_metrics {
            self.metrics.native_backend = false;
        }

        Ok(())
    }
}

/// Map a user-supplied level onto a tracing level name, defaulting to `info`
pub fn normalize_log_level(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let mapped = match level.as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        "notset" => "trace",
        other if VALID_LOG_LEVELS.contains(&other) => other,
        _ => "info",
    };
    mapped.to_string()
}

/// Split a comma separated origin list; empty or `*` means any origin
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return vec!["*".to_string()];
    }

    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
