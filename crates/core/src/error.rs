use thiserror::Error;

/// Problems found while building, decoding or checking a dialog description.
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("invalid window type: '{0}'")]
    InvalidWindowType(String),
    #[error("unknown widget type: '{0}'")]
    UnknownWidget(String),
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("cannot stringify type: '{0}'")]
    Stringify(&'static str),
    #[error("invalid font description: '{0}'")]
    InvalidFont(String),
    #[error("invalid list header: {0}")]
    InvalidHeader(String),
    #[error("failed to decode dialog: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Name of a JSON value's type, as used in error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
