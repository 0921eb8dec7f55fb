//! Settings the agent needs before it can serve requests.
//!
//! git-lfs does not hand the agent any configuration, so it is looked up the same way
//! git-lfs looks up its own: the repository's git config first, then the committed
//! `.lfsconfig` file. Explicit overrides (command line or environment) win over both.
use std::{
    collections::HashMap,
    io,
    process::{Command, Stdio},
};

use log::{debug, trace};
use thiserror::Error;

/// Namespace URL objects live under.
pub const URL_KEY: &str = "lfs.url";
/// Opaque backend project/credential hint.
pub const PROJECT_KEY: &str = "lfs-agent.project";

const LFSCONFIG_FILE: &str = ".lfsconfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("failed to run git config for '{key}': {source}")]
    Git {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Something that can answer `git config`-style key lookups.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(HashMap::get(self, key).cloned())
    }
}

/// Reads settings through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitConfig {
    program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitConfig {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn lookup(&self, args: &[&str], key: &str) -> Result<Option<String>, ConfigError> {
        trace!("{} config {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .arg("config")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| ConfigError::Git {
                key: key.to_string(),
                source,
            })?;

        // A missing key exits non-zero with empty output; both read as "unset".
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!value.is_empty()).then_some(value))
    }
}

impl ConfigSource for GitConfig {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(value) = self.lookup(&[key], key)? {
            return Ok(Some(value));
        }
        self.lookup(&["--file", LFSCONFIG_FILE, key], key)
    }
}

/// Resolved backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub project: Option<String>,
}

/// Values that take precedence over any [`ConfigSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub url: Option<String>,
    pub project: Option<String>,
}

impl Config {
    pub fn resolve<S: ConfigSource + ?Sized>(
        overrides: &Overrides,
        source: &S,
    ) -> Result<Self, ConfigError> {
        let url = match non_empty(&overrides.url) {
            Some(url) => url,
            None => source.get(URL_KEY)?.ok_or(ConfigError::Missing(URL_KEY))?,
        };
        let project = match non_empty(&overrides.project) {
            Some(project) => Some(project),
            None => source.get(PROJECT_KEY)?,
        };

        debug!("resolved config: url {url}, project {project:?}");
        Ok(Self { url, project })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
