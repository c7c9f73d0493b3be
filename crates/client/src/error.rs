use std::time::Duration;

use tanto_core::DialogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TantoError {
    #[error("failed to spawn renderer {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer pipe error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize request payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode renderer output {output:?}: {source}")]
    Decode {
        output: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("renderer exited with {}: {message}", exit_code_label(.code))]
    Exit { code: Option<i32>, message: String },
    #[error("renderer did not finish within {0:?}")]
    Timeout(Duration),
    #[error("renderer process does not expose {0}")]
    MissingPipe(&'static str),
    #[error("invalid dialog: {0}")]
    InvalidDialog(#[from] DialogError),
    #[error("invalid configuration: {0}")]
    Config(#[from] anyhow::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

pub type Result<T, E = TantoError> = std::result::Result<T, E>;
