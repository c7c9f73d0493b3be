use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{json_type_name, DialogError};
use crate::types::Widget;

/// One entry of a file dialog filter, e.g. `Images` with `*.png;*.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub ext: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(name: impl Into<String>, ext: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ext: ext.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parses `Name|*.a;*.b|Other|*` into alternating name/extension pairs.
/// A trailing name without extensions is dropped.
pub fn parse_filter(filter: &str) -> Vec<Filter> {
    let mut filters = Vec::new();
    let mut name: Option<&str> = None;

    for segment in split_trimmed(filter, '|') {
        match name.take() {
            None => name = Some(segment),
            Some(current) => filters.push(Filter::new(current, split_trimmed(segment, ';'))),
        }
    }

    filters
}

/// Inverse of [`parse_filter`], as passed on the renderer's command line.
pub fn format_filter(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(|filter| format!("{}|{}", filter.name, filter.ext.join(";")))
        .collect::<Vec<_>>()
        .join("|")
}

fn split_trimmed(s: &str, sep: char) -> impl Iterator<Item = &str> {
    s.split(sep).map(str::trim).filter(|part| !part.is_empty())
}

/// Font description in the form `Family 12` or `'Family Name' 12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub family: String,
    pub size: Option<i32>,
}

impl Font {
    pub fn new(family: impl Into<String>, size: Option<i32>) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }
}

impl FromStr for Font {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DialogError::InvalidFont(s.to_string());

        if s.is_empty() {
            return Err(invalid());
        }

        let (family, rest) = match s.strip_prefix('\'') {
            Some(quoted) => {
                let end = quoted.find('\'').ok_or_else(invalid)?;
                (&quoted[..end], &quoted[end + 1..])
            }
            None => s.split_at(s.find(' ').unwrap_or(s.len())),
        };

        let rest = rest.trim_start();
        let size = if rest.is_empty() {
            None
        } else {
            Some(rest.parse::<i32>().map_err(|_| invalid())?)
        };

        Ok(Font::new(family, size))
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.family.is_empty() || self.family.contains(char::is_whitespace) {
            write!(f, "'{}'", self.family)?;
        } else {
            f.write_str(&self.family)?;
        }

        if let Some(size) = self.size {
            write!(f, " {}", size)?;
        }
        Ok(())
    }
}

/// Column of a `list` or `tree` widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderItem {
    pub id: String,
    pub text: String,
}

/// Reads the `header` property; bare strings serve as both id and text.
pub fn parse_header(widget: &Widget) -> Result<Vec<HeaderItem>, DialogError> {
    let entries = match widget.property("header") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(DialogError::InvalidHeader(format!(
                "expected an array, found {}",
                json_type_name(other)
            )))
        }
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(s) => Ok(HeaderItem {
                id: s.clone(),
                text: s.clone(),
            }),
            other => serde_json::from_value(other.clone())
                .map_err(|err| DialogError::InvalidHeader(err.to_string())),
        })
        .collect()
}

/// Renders a primitive JSON value as display text.
pub fn stringify(value: &Value) -> Result<String, DialogError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        other => Err(DialogError::Stringify(json_type_name(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter_pairs() {
        let filters = parse_filter("Images | *.png; *.jpg |All|*");
        assert_eq!(
            filters,
            vec![
                Filter::new("Images", ["*.png", "*.jpg"]),
                Filter::new("All", ["*"]),
            ]
        );
    }

    #[test]
    fn test_parse_filter_drops_dangling_name() {
        assert_eq!(parse_filter("Text|*.txt|Orphan"), vec![Filter::new("Text", ["*.txt"])]);
        assert!(parse_filter("").is_empty());
    }

    #[test]
    fn test_format_filter_is_parseable() {
        let filters = vec![Filter::new("Rust", ["*.rs"]), Filter::new("Docs", ["*.md", "*.txt"])];
        let formatted = format_filter(&filters);
        assert_eq!(formatted, "Rust|*.rs|Docs|*.md;*.txt");
        assert_eq!(parse_filter(&formatted), filters);
    }

    #[test]
    fn test_parse_font_variants() {
        assert_eq!("Sans 12".parse::<Font>().unwrap(), Font::new("Sans", Some(12)));
        assert_eq!("Monospace".parse::<Font>().unwrap(), Font::new("Monospace", None));
        assert_eq!(
            "'DejaVu Sans Mono'   9".parse::<Font>().unwrap(),
            Font::new("DejaVu Sans Mono", Some(9))
        );
    }

    #[test]
    fn test_parse_font_rejects_garbage() {
        assert!("'Unterminated 12".parse::<Font>().is_err());
        assert!("Sans big".parse::<Font>().is_err());
        assert!("Sans 12 ".parse::<Font>().is_err());
        assert!("".parse::<Font>().is_err());
    }

    #[test]
    fn test_font_display_quotes_spaces() {
        let font = Font::new("Noto Serif", Some(11));
        assert_eq!(font.to_string(), "'Noto Serif' 11");
        assert_eq!(font.to_string().parse::<Font>().unwrap(), font);
    }

    #[test]
    fn test_parse_header_mixed_entries() {
        let widget = Widget::list("files", Vec::<String>::new())
            .with_property("header", json!(["Name", {"id": "size", "text": "Size"}]));

        let header = parse_header(&widget).unwrap();
        assert_eq!(header[0], HeaderItem { id: "Name".into(), text: "Name".into() });
        assert_eq!(header[1], HeaderItem { id: "size".into(), text: "Size".into() });
    }

    #[test]
    fn test_parse_header_requires_array() {
        let widget = Widget::list("files", Vec::<String>::new()).with_property("header", "Name");
        assert!(matches!(parse_header(&widget), Err(DialogError::InvalidHeader(_))));
        assert!(parse_header(&Widget::text("none")).unwrap().is_empty());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("plain")).unwrap(), "plain");
        assert_eq!(stringify(&Value::Null).unwrap(), "");
        assert_eq!(stringify(&json!(4.5)).unwrap(), "4.5");
        assert_eq!(stringify(&json!(true)).unwrap(), "true");
        assert!(matches!(stringify(&json!({"a": 1})), Err(DialogError::Stringify("object"))));
    }
}
