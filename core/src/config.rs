use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const HOME_ENV: &str = "AOS_HOME";
pub const VERBOSE_ENV: &str = "DEBUG";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:6363";
pub const DEFAULT_PROCESS_NAME: &str = "default";
const DEFAULT_MONITOR_INTERVAL_MS: u64 = 5_000;
const DEFAULT_RESULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_RESULT_TIMEOUT_SECS: u64 = 60;

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub gateway_url: Option<String>,
    pub process_name: Option<String>,
    pub wallet: Option<PathBuf>,
    pub blueprints_dir: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub monitor_interval_ms: Option<u64>,
    pub result_poll_interval_ms: Option<u64>,
    pub result_timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

/// Values supplied on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub gateway_url: Option<String>,
    pub process_name: Option<String>,
    pub wallet: Option<PathBuf>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home: PathBuf,
    pub gateway_url: String,
    pub process_name: String,
    /// Explicit wallet; `None` means the default location.
    pub wallet: Option<PathBuf>,
    pub blueprints_dir: PathBuf,
    pub history_file: PathBuf,
    pub monitor_interval: Duration,
    pub result_poll_interval: Duration,
    pub result_timeout: Duration,
    pub verbose: bool,
}

impl Config {
    pub fn load_with_overrides(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let home = match overrides.home.clone() {
            Some(home) => home,
            None => find_aos_home()?,
        };
        let path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| home.join(CONFIG_FILE));
        let file = load_config_toml(&path)?;
        let verbose_env = std::env::var_os(VERBOSE_ENV).is_some_and(|v| !v.is_empty());
        Ok(Self::from_parts(home, file, overrides, verbose_env))
    }

    pub fn from_parts(
        home: PathBuf,
        file: ConfigToml,
        overrides: ConfigOverrides,
        verbose_env: bool,
    ) -> Self {
        let blueprints_dir = file
            .blueprints_dir
            .unwrap_or_else(|| home.join("blueprints"));
        let history_file = file.history_file.unwrap_or_else(|| home.join("history"));
        Self {
            gateway_url: overrides
                .gateway_url
                .or(file.gateway_url)
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            process_name: overrides
                .process_name
                .or(file.process_name)
                .unwrap_or_else(|| DEFAULT_PROCESS_NAME.to_string()),
            wallet: overrides.wallet.or(file.wallet),
            blueprints_dir,
            history_file,
            monitor_interval: Duration::from_millis(
                file.monitor_interval_ms
                    .unwrap_or(DEFAULT_MONITOR_INTERVAL_MS),
            ),
            result_poll_interval: Duration::from_millis(
                file.result_poll_interval_ms
                    .unwrap_or(DEFAULT_RESULT_POLL_INTERVAL_MS),
            ),
            result_timeout: Duration::from_secs(
                file.result_timeout_secs
                    .unwrap_or(DEFAULT_RESULT_TIMEOUT_SECS),
            ),
            verbose: verbose_env || overrides.verbose.or(file.verbose).unwrap_or(false),
            home,
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join("log")
    }
}

/// `$AOS_HOME`, or `~/.aos`.
pub fn find_aos_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".aos"))
        .ok_or(ConfigError::NoHomeDir)
}

fn load_config_toml(path: &Path) -> Result<ConfigToml, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(ConfigToml::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
