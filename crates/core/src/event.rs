use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Clicked,
    Selected,
    Changed,
    DoubleClicked,
    /// Kinds this client does not know about yet are kept verbatim.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Clicked => "clicked",
            EventKind::Selected => "selected",
            EventKind::Changed => "changed",
            EventKind::DoubleClicked => "doubleclicked",
            EventKind::Other(kind) => kind,
        }
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "clicked" => EventKind::Clicked,
            "selected" => EventKind::Selected,
            "changed" => EventKind::Changed,
            "doubleclicked" => EventKind::DoubleClicked,
            _ => EventKind::Other(kind),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index and id of the entry picked in a list or a tab strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selection {
    pub index: i64,
    pub id: String,
}

/// One interaction reported by the renderer on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Event {
    pub fn new(kind: EventKind, from: impl Into<String>) -> Self {
        Self {
            kind,
            from: from.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Parses one stdout line. Blank lines and lines that are not JSON
    /// objects (the renderer's `--debug` dump) yield `None`.
    pub fn from_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        Some(serde_json::from_str(line))
    }

    /// `{index, id}` detail sent when a list row or tab is picked.
    pub fn selection(&self) -> Option<Selection> {
        let detail = self.detail.as_ref()?;
        serde_json::from_value(detail.clone()).ok()
    }

    /// Widget values keyed by id, as sent by windows in model mode.
    pub fn model(&self) -> Option<&Map<String, Value>> {
        self.detail.as_ref()?.as_object()
    }

    /// Whether the renderer closes the window after this event.
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            EventKind::Clicked | EventKind::DoubleClicked => true,
            EventKind::Selected => self.selection().is_none(),
            _ => false,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event '{}' received from '{}'", self.kind, self.from)
    }
}
