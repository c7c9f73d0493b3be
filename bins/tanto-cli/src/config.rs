use std::path::PathBuf;

use ::config::{Config, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use tanto_core::TantoConfig;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/tanto.yaml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RendererConfig {
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub debug: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub renderer: Option<RendererConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration load failed: {0}")]
    Load(#[from] BuilderError),
}

impl CliConfig {
    /// Layers the file/environment settings over the renderer defaults.
    pub fn apply(&self, mut base: TantoConfig) -> TantoConfig {
        let Some(renderer) = &self.renderer else {
            return base;
        };

        if let Some(executable) = renderer.executable.as_ref().filter(|e| !e.trim().is_empty()) {
            base.executable = executable.clone();
        }
        if let Some(args) = &renderer.args {
            base.args = args.clone();
        }
        if renderer.backend.is_some() {
            base.backend = renderer.backend.clone();
        }
        if renderer.timeout_secs.is_some() {
            base.timeout_secs = renderer.timeout_secs;
        }
        if let Some(debug) = renderer.debug {
            base.debug = debug;
        }

        base
    }

    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.logging.as_ref()?.dir.as_ref()
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref()?.filter.as_deref()
    }
}

pub fn load_cli_config() -> Result<CliConfig, ConfigError> {
    let path =
        std::env::var("TANTO_CLI_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&path).required(false));

    builder = builder.add_source(Environment::with_prefix("TANTO_CLI").separator("__"));

    let config: CliConfig = builder.build()?.try_deserialize()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::FileFormat;

    fn from_yaml(yaml: &str) -> CliConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_config_keeps_base() {
        let base = TantoConfig::default();
        assert_eq!(CliConfig::default().apply(base.clone()), base);
    }

    #[test]
    fn test_yaml_overrides_renderer_settings() {
        let cli = from_yaml(
            r#"
renderer:
  executable: /usr/local/bin/tanto
  backend: qt
  timeout_secs: 15
logging:
  dir: /var/log/tanto
"#,
        );

        let config = cli.apply(TantoConfig::default());
        assert_eq!(config.executable, "/usr/local/bin/tanto");
        assert_eq!(config.backend.as_deref(), Some("qt"));
        assert_eq!(config.timeout_secs, Some(15));
        assert!(!config.debug);
        assert_eq!(cli.log_dir(), Some(&PathBuf::from("/var/log/tanto")));
        assert!(cli.log_filter().is_none());
    }

    #[test]
    fn test_blank_executable_is_ignored() {
        let cli = CliConfig {
            renderer: Some(RendererConfig {
                executable: Some(" ".into()),
                ..RendererConfig::default()
            }),
            logging: None,
        };
        assert_eq!(cli.apply(TantoConfig::default()).executable, "tanto");
    }
}
