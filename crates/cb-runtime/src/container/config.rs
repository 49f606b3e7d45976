//! # Runtime Configuration
//!
//! Defaults for every session, overridable from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CB_CONNECT_TIMEOUT_SECS` | `30` | Extension handshake timeout, `0` disables it |
//! | `CB_DRAFT_DELAY_MS` | `1000` | Quiet period before a draft is saved |
//! | `CB_SANDBOX` | built-in policy | Sandbox attribute for extension frames |
//! | `CB_CMS_VERSION` | crate version | Reported to extensions |
//! | `CB_CMS_BASE_URL` | `http://localhost:8080/cms` | Reported to extensions |
//! | `CB_LOCALE` | `en` | Reported to extensions |
//! | `CB_TIME_ZONE` | `UTC` | Reported to extensions |

use cb_02_sandbox_rpc::{HostEnvironment, PolicyError, SandboxPolicy};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid sandbox attribute: {0}")]
    InvalidSandbox(#[from] PolicyError),

    #[error("draft delay must be greater than zero")]
    ZeroDraftDelay,

    #[error("invalid CMS base URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub rpc: RpcConfig,
    pub drafts: DraftConfig,
    pub host: HostConfig,
}

/// Sandboxed RPC settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    /// Handshake timeout in seconds; `0` waits forever.
    pub connect_timeout_secs: u64,
    /// Custom sandbox attribute; `None` uses the built-in policy.
    pub sandbox: Option<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            sandbox: None,
        }
    }
}

impl RpcConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// The sandbox policy extension frames get.
    ///
    /// # Errors
    ///
    /// `InvalidSandbox` when the custom attribute does not parse.
    pub fn sandbox_policy(&self) -> Result<SandboxPolicy, ConfigError> {
        match &self.sandbox {
            Some(attribute) => Ok(SandboxPolicy::parse(attribute)?),
            None => Ok(SandboxPolicy::default()),
        }
    }
}

/// Draft scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftConfig {
    pub delay_ms: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

impl DraftConfig {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Installation facts reported to extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub cms_version: String,
    pub cms_base_url: String,
    pub locale: String,
    pub time_zone: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cms_version: env!("CARGO_PKG_VERSION").to_string(),
            cms_base_url: "http://localhost:8080/cms".to_string(),
            locale: "en".to_string(),
            time_zone: "UTC".to_string(),
        }
    }
}

impl HostConfig {
    #[must_use]
    pub fn environment(&self) -> HostEnvironment {
        HostEnvironment {
            cms_version: self.cms_version.clone(),
            cms_base_url: self.cms_base_url.clone(),
            locale: self.locale.clone(),
            time_zone: self.time_zone.clone(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment and validate.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = number(&lookup, "CB_CONNECT_TIMEOUT_SECS")? {
            config.rpc.connect_timeout_secs = secs;
        }
        if let Some(delay) = number(&lookup, "CB_DRAFT_DELAY_MS")? {
            config.drafts.delay_ms = delay;
        }
        config.rpc.sandbox = lookup("CB_SANDBOX").filter(|s| !s.trim().is_empty());

        if let Some(version) = lookup("CB_CMS_VERSION") {
            config.host.cms_version = version;
        }
        if let Some(base_url) = lookup("CB_CMS_BASE_URL") {
            config.host.cms_base_url = base_url;
        }
        if let Some(locale) = lookup("CB_LOCALE") {
            config.host.locale = locale;
        }
        if let Some(time_zone) = lookup("CB_TIME_ZONE") {
            config.host.time_zone = time_zone;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// The first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drafts.delay_ms == 0 {
            return Err(ConfigError::ZeroDraftDelay);
        }
        self.rpc.sandbox_policy()?;
        url::Url::parse(&self.host.cms_base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            value: self.host.cms_base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
