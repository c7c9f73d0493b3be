use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;
use tanto_core::error::json_type_name;
use tanto_core::{DialogError, Event, Filter, TantoConfig, Window};
use tracing::{debug, instrument};

use crate::command::{GlobalOptions, MessageIcon, TantoCommand};
use crate::error::{Result, TantoError};
use crate::process::{ProcessRunner, RawOutput, Runner};

/// What a non-dialog mode (message, input, file pickers) printed.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Event(Event),
    Text(String),
    /// The renderer printed nothing, e.g. the user closed the window.
    Closed,
}

impl Reply {
    fn from_output(stdout: &str) -> Result<Self> {
        let events = parse_events(stdout)?;
        if let Some(event) = events.into_iter().last() {
            return Ok(Reply::Event(event));
        }

        let text = stdout.trim();
        if text.is_empty() {
            Ok(Reply::Closed)
        } else {
            Ok(Reply::Text(text.to_string()))
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            Reply::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Reply::Closed)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Event(event) => write!(f, "{}", event),
            Reply::Text(text) => f.write_str(text),
            Reply::Closed => f.write_str("Window closed"),
        }
    }
}

/// A renderer backend as reported by `tanto list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    pub name: String,
    pub version: String,
}

impl FromStr for BackendInfo {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, version) = line
            .split_once(':')
            .ok_or_else(|| format!("not a backend line: {}", line))?;
        Ok(Self {
            name: name.trim().to_string(),
            version: version.trim().to_string(),
        })
    }
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.version)
    }
}

/// Shows dialogs through the external renderer.
#[derive(Debug, Clone)]
pub struct TantoClient<R = ProcessRunner> {
    runner: R,
    options: GlobalOptions,
}

impl TantoClient<ProcessRunner> {
    pub fn from_config(config: &TantoConfig) -> Result<Self> {
        let options = GlobalOptions {
            backend: config.backend.clone(),
            debug: config.debug,
        };
        Ok(Self::with_runner(ProcessRunner::from_config(config)?, options))
    }
}

impl<R: Runner> TantoClient<R> {
    pub fn with_runner(runner: R, options: GlobalOptions) -> Self {
        Self { runner, options }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Shows `window` and returns the event that closed it, if any.
    pub async fn show_dialog(&self, window: &Window) -> Result<Option<Event>> {
        Ok(self.show_dialog_events(window).await?.pop())
    }

    /// Every event the renderer reported, in order; the last one closed the window.
    #[instrument(skip_all, fields(title = %window.title))]
    pub async fn show_dialog_events(&self, window: &Window) -> Result<Vec<Event>> {
        window.validate()?;
        let payload = serde_json::to_vec(window).map_err(TantoError::Encode)?;
        self.exchange(payload).await
    }

    /// Sends an arbitrary dialog document without checking it first.
    pub async fn show_json(&self, dialog: &Value) -> Result<Option<Event>> {
        if !dialog.is_object() {
            return Err(DialogError::NotAnObject(json_type_name(dialog)).into());
        }
        let payload = serde_json::to_vec(dialog).map_err(TantoError::Encode)?;
        Ok(self.exchange(payload).await?.pop())
    }

    /// Lets the renderer load the dialog description from `path` itself.
    pub async fn show_file(&self, path: impl Into<PathBuf>) -> Result<Option<Event>> {
        let output = self.invoke(&TantoCommand::Load(path.into()), None).await?;
        Ok(parse_events(&output.stdout)?.pop())
    }

    pub async fn message(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        icon: Option<MessageIcon>,
    ) -> Result<Reply> {
        self.run(TantoCommand::Message {
            title: title.into(),
            text: text.into(),
            icon,
        })
        .await
    }

    pub async fn confirm(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        icon: Option<MessageIcon>,
    ) -> Result<Reply> {
        self.run(TantoCommand::Confirm {
            title: title.into(),
            text: text.into(),
            icon,
        })
        .await
    }

    pub async fn input(
        &self,
        title: impl Into<String>,
        text: Option<String>,
        value: Option<String>,
    ) -> Result<Reply> {
        self.run(TantoCommand::Input {
            title: title.into(),
            text,
            value,
        })
        .await
    }

    pub async fn password(&self, title: impl Into<String>, text: Option<String>) -> Result<Reply> {
        self.run(TantoCommand::Password {
            title: title.into(),
            text,
        })
        .await
    }

    pub async fn select_dir(&self, title: Option<String>, dir: Option<PathBuf>) -> Result<Reply> {
        self.run(TantoCommand::SelectDir { title, dir }).await
    }

    pub async fn load_file(
        &self,
        title: Option<String>,
        filters: Vec<Filter>,
        dir: Option<PathBuf>,
    ) -> Result<Reply> {
        self.run(TantoCommand::LoadFile { title, filters, dir }).await
    }

    pub async fn save_file(
        &self,
        title: Option<String>,
        filters: Vec<Filter>,
        dir: Option<PathBuf>,
    ) -> Result<Reply> {
        self.run(TantoCommand::SaveFile { title, filters, dir }).await
    }

    /// Runs any mode that does not take a dialog on stdin.
    pub async fn run(&self, command: TantoCommand) -> Result<Reply> {
        let output = self.invoke(&command, None).await?;
        Reply::from_output(&output.stdout)
    }

    pub async fn list_backends(&self) -> Result<Vec<BackendInfo>> {
        let output = self.invoke(&TantoCommand::List, None).await?;

        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match line.parse::<BackendInfo>() {
                Ok(info) => Some(info),
                Err(reason) => {
                    debug!(%reason, "skipping backend list line");
                    None
                }
            })
            .collect())
    }

    async fn exchange(&self, payload: Vec<u8>) -> Result<Vec<Event>> {
        let output = self.invoke(&TantoCommand::Stdin, Some(payload)).await?;
        parse_events(&output.stdout)
    }

    async fn invoke(&self, command: &TantoCommand, input: Option<Vec<u8>>) -> Result<RawOutput> {
        debug!(mode = command.name(), "invoking renderer");
        self.runner.run(command.args(&self.options), input).await
    }
}

fn parse_events(stdout: &str) -> Result<Vec<Event>> {
    stdout
        .lines()
        .filter_map(|line| {
            Event::from_line(line).map(|parsed| {
                parsed.map_err(|source| TantoError::Decode {
                    output: line.trim().to_string(),
                    source,
                })
            })
        })
        .collect()
}
