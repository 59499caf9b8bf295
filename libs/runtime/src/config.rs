use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::paths::home_dir::resolve_home_dir;

/// Directory under the user's home that holds the database and logs by default.
pub const HOME_SUBDIR: &str = ".students";

/// Prefix for environment overrides, e.g. `APP__SERVER__PORT=9000`.
const ENV_PREFIX: &str = "APP__";

/// Students server configuration.
///
/// Every section has defaults, so an empty YAML file is a valid config.
/// Feature crates read their own section out of `modules` with [`AppConfig::module_config`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// `students` and `api_ingress` sections, kept raw until the owning crate parses them.
    pub modules: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    /// Base for relative database and log paths. Empty means `$HOME/.students`.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    /// Per-request timeout in seconds; 0 keeps the ingress default.
    pub timeout_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "0.0.0.0".to_owned(),
            port: 8080,
            timeout_sec: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct DatabaseConfig {
    /// `sqlite://<path>` or `sqlite::memory:`; relative paths hang off `server.home_dir`.
    pub url: String,
    /// Pool size when the students module runs in shared connection mode.
    pub max_conns: Option<u32>,
    /// SQLite `busy_timeout` pragma; 0 leaves the driver default.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://students.db".to_owned(),
            max_conns: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
            ..Self::default()
        }
    }
}

/// Console output plus an optional rotating JSON log file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error | off
    pub console_level: String,
    /// Log file, relative to `server.home_dir`. Empty disables file output.
    pub file: String,
    pub file_level: String,
    pub max_size_mb: u64,
    /// Rotated files kept next to the live one.
    pub max_backups: usize,
    /// Per-crate thresholds for both outputs, e.g. `{ students: debug, sea_orm: warn }`.
    pub levels: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: "info".to_owned(),
            file: "logs/students.log".to_owned(),
            file_level: "debug".to_owned(),
            max_size_mb: 100,
            max_backups: 3,
            levels: BTreeMap::new(),
        }
    }
}

/// Command line values that take precedence over the file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    /// `-v` count: 1 selects debug, 2 or more trace.
    pub verbose: u8,
    /// Swap the database for a throwaway in-memory one.
    pub mock: bool,
}

impl AppConfig {
    /// Build the configuration from defaults, then the YAML file (if any), then `APP__*`
    /// environment variables. `server.home_dir` comes back absolute and already created.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let mut config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| match path {
                Some(p) => format!("Failed to parse yaml config '{}'", p.display()),
                None => "Failed to build config from environment".to_owned(),
            })?;

        config.server.home_dir = home_dir_of(&config.server)?
            .to_string_lossy()
            .into_owned();
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if cli.mock {
            self.database = DatabaseConfig::in_memory();
        }
        match cli.verbose {
            0 => {}
            1 => self.logging.console_level = "debug".to_owned(),
            _ => self.logging.console_level = "trace".to_owned(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Parse `modules.<name>`; a missing section yields `T::default()`.
    pub fn module_config<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        self.modules.get(name).map_or_else(
            || Ok(T::default()),
            |raw| {
                T::deserialize(raw).with_context(|| format!("invalid config for module '{name}'"))
            },
        )
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }
}

fn home_dir_of(server: &ServerConfig) -> Result<PathBuf> {
    let configured = Some(server.home_dir.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    resolve_home_dir(configured, HOME_SUBDIR, true).context("Failed to resolve server.home_dir")
}
