use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration accessor to keep the rest of the application stateless.
pub static CONFIG: Lazy<TantoConfig> = Lazy::new(|| {
    TantoConfig::load_from_env().expect("failed to load tanto configuration from environment")
});

pub const DEFAULT_EXECUTABLE: &str = "tanto";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TantoConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Arguments placed before the renderer command, e.g. for wrapper scripts.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub debug: bool,
}

impl Default for TantoConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            args: Vec::new(),
            backend: None,
            timeout_secs: None,
            debug: false,
        }
    }
}

impl TantoConfig {
    /// Build configuration from well-known environment variables.
    pub fn load_from_env() -> Result<Self> {
        preload_env_files();
        Self::from_lookup(|key| env_var_non_empty(key).ok())
    }

    /// Same as [`TantoConfig::load_from_env`] but reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let executable = lookup("TANTO_EXECUTABLE").unwrap_or_else(default_executable);

        let args = lookup("TANTO_ARGS")
            .map(|value| {
                value
                    .split_whitespace()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let timeout_secs = match lookup("TANTO_TIMEOUT_SECS") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("TANTO_TIMEOUT_SECS is not a number: {}", value))?,
            ),
            None => None,
        };

        let debug = lookup("TANTO_DEBUG")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self {
            executable,
            args,
            backend: lookup("TANTO_BACKEND"),
            timeout_secs,
            debug,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Helper that forces a usable renderer executable.
    pub fn require_executable(&self) -> Result<&str> {
        ensure!(
            !self.executable.trim().is_empty(),
            "TANTO_EXECUTABLE must not be empty: set it to the renderer binary path"
        );
        Ok(&self.executable)
    }
}

fn env_var_non_empty(key: &str) -> Result<String, env::VarError> {
    let value = env::var(key)?;
    if value.trim().is_empty() {
        return Err(env::VarError::NotPresent);
    }
    Ok(value)
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

fn preload_env_files() {
    // .env in the working directory or any parent
    let _ = dotenv();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_env = manifest_dir.join("../../.env");
    if workspace_env.exists() {
        let _ = dotenvy::from_path(workspace_env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = TantoConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, TantoConfig::default());
        assert_eq!(config.require_executable().unwrap(), "tanto");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = TantoConfig::from_lookup(lookup_from(&[
            ("TANTO_EXECUTABLE", "/opt/tanto/bin/tanto"),
            ("TANTO_ARGS", "--flag  value"),
            ("TANTO_BACKEND", "qt"),
            ("TANTO_TIMEOUT_SECS", " 30 "),
            ("TANTO_DEBUG", "true"),
        ]))
        .unwrap();

        assert_eq!(config.executable, "/opt/tanto/bin/tanto");
        assert_eq!(config.args, vec!["--flag", "value"]);
        assert_eq!(config.backend.as_deref(), Some("qt"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.debug);
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let result = TantoConfig::from_lookup(lookup_from(&[("TANTO_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_executable_is_rejected() {
        let config = TantoConfig {
            executable: "  ".into(),
            ..TantoConfig::default()
        };
        assert!(config.require_executable().is_err());
    }
}
