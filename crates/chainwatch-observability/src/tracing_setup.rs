//! Tracing / logging initialisation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line (ELK, Loki, CloudWatch).
    Json,
}

/// Log levels, globally and per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-target overrides, e.g. `chainwatch-rpc = "debug"`.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Raise or lower one component's level.
    pub fn component(mut self, name: impl Into<String>, level: impl Into<String>) -> Self {
        self.components.insert(name.into(), level.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Filter directives, e.g. `info,chainwatch_rpc=debug`.
    ///
    /// Crate names are accepted with dashes and mapped to their target form.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push(',');
            directives.push_str(&component.replace('-', "_"));
            directives.push('=');
            directives.push_str(level);
        }
        directives
    }

    pub fn env_filter(&self) -> Result<EnvFilter, LogInitError> {
        let directives = self.directives();
        EnvFilter::try_new(&directives).map_err(|e| LogInitError::InvalidDirective {
            directives,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid log directives '{directives}': {reason}")]
    InvalidDirective { directives: String, reason: String },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialised,
}

/// Install the global subscriber described by `config`.
///
/// Call once at startup. A second call, or a call after another subscriber
/// was installed, returns [`LogInitError::AlreadyInitialised`].
pub fn init_tracing(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
    installed.map_err(|_| LogInitError::AlreadyInitialised)
}
