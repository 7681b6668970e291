//! Server configuration
//!
//! Defaults, then an optional YAML file, then environment overrides. The
//! binary applies its command-line flags last.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Pending connections the kernel may queue before `accept`
    pub backlog: u32,
    /// Bytes reserved for each socket read
    pub buffer_size: usize,
    /// Upper bound on reading one request, in seconds
    pub read_timeout_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 128,
            buffer_size: 8192,
            read_timeout_secs: 30.0,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.read_timeout_secs).unwrap_or(Duration::from_secs(30))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    pub default_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static"),
            default_file: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Defaults plus environment overrides.
    pub fn load() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    /// Reads a YAML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies `LISTEN` (`host:port`) and `STATIC_ROOT` from `lookup`.
    /// A `LISTEN` value without a valid port is ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("LISTEN") {
            match listen.rsplit_once(':').map(|(h, p)| (h, p.parse::<u16>())) {
                Some((host, Ok(port))) => {
                    self.server.host = host.to_string();
                    self.server.port = port;
                }
                _ => tracing::warn!(value = %listen, "Ignoring invalid LISTEN address"),
            }
        }

        if let Some(root) = lookup("STATIC_ROOT") {
            self.static_files.root = PathBuf::from(root);
        }
    }
}
