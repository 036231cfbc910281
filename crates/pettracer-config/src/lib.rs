//! Account configuration for petTracer pollers.
//!
//! TOML accounts, credential resolution (env + keyring + plaintext),
//! and translation to `pettracer_core::CoordinatorConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use pettracer_core::{CoordinatorConfig, Credentials};

/// Keyring service name; entries are keyed `<account>/password`.
pub const KEYRING_SERVICE: &str = "pettracer";
/// Prefix for environment overrides, e.g. `PETTRACER_DEFAULTS__POLL_INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "PETTRACER_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account named '{account}' is configured")]
    UnknownAccount { account: String },

    #[error("no credentials configured for account '{account}'")]
    NoCredentials { account: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Account used when none is named explicitly.
    pub default_account: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named petTracer accounts.
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
}

/// Values applied to every account unless it overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            login_timeout_secs: default_login_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}
fn default_login_timeout() -> u64 {
    10
}

/// One petTracer login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    pub username: String,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    pub poll_interval_secs: Option<u64>,

    pub login_timeout_secs: Option<u64>,
}

impl Account {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            password_env: None,
            poll_interval_secs: None,
            login_timeout_secs: None,
        }
    }
}

impl Config {
    /// Pick an account: `name` if given, else `default_account`, else the
    /// only configured account.
    pub fn account<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Account), ConfigError> {
        let Some(name) = name.or(self.default_account.as_deref()) else {
            let mut accounts = self.accounts.iter();
            return match (accounts.next(), accounts.next()) {
                (Some((name, account)), None) => Ok((name.as_str(), account)),
                _ => Err(ConfigError::Validation {
                    field: "default_account".into(),
                    reason: "no account selected".into(),
                }),
            };
        };

        self.accounts
            .get(name)
            .map(|account| (name, account))
            .ok_or_else(|| ConfigError::UnknownAccount {
                account: name.into(),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pettracer", "pettracer").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pettracer");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, with `PETTRACER_*` environment overrides.
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an account password: `password_env` variable, then the
/// system keyring, then plaintext in the config.
pub fn resolve_password(account: &Account, account_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(account, account_name, |var| std::env::var(var).ok())
}

/// [`resolve_password`] with a caller-supplied environment lookup.
pub fn resolve_password_with(
    account: &Account,
    account_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Account's password_env → env var lookup
    if let Some(pw) = account.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(pw));
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{account_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = account.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        account: account_name.into(),
    })
}

/// Username plus resolved password.
pub fn account_credentials(account: &Account, account_name: &str) -> Result<Credentials, ConfigError> {
    if account.username.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "username".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(Credentials {
        username: account.username.clone(),
        password: resolve_password(account, account_name)?,
    })
}

/// Build a `CoordinatorConfig`, falling back to `defaults` for unset fields.
pub fn account_to_coordinator_config(
    account: &Account,
    account_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let poll_interval_secs = account
        .poll_interval_secs
        .unwrap_or(defaults.poll_interval_secs);
    if poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let login_timeout_secs = account
        .login_timeout_secs
        .unwrap_or(defaults.login_timeout_secs);

    Ok(CoordinatorConfig {
        name: account_name.into(),
        poll_interval: Duration::from_secs(poll_interval_secs),
        login_timeout: Duration::from_secs(login_timeout_secs),
    })
}
