use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{json_type_name, DialogError};
use crate::parse::Font;

pub const WINDOW_TYPE: &str = "window";

pub const NUMBER_MIN: i64 = 0;
pub const NUMBER_MAX: i64 = 99;

/// Keys with a dedicated field on [`Widget`]; they never end up in the property bag.
const WIDGET_BUILTINS: &[&str] = &[
    "id", "type", "title", "group", "text", "value", "width", "height", "enabled", "fill",
    "items", "properties",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Space,
    Text,
    Input,
    Number,
    Image,
    Button,
    Check,
    List,
    Tree,
    Tabs,
    Row,
    Column,
    Grid,
    Form,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 14] = [
        WidgetKind::Space,
        WidgetKind::Text,
        WidgetKind::Input,
        WidgetKind::Number,
        WidgetKind::Image,
        WidgetKind::Button,
        WidgetKind::Check,
        WidgetKind::List,
        WidgetKind::Tree,
        WidgetKind::Tabs,
        WidgetKind::Row,
        WidgetKind::Column,
        WidgetKind::Grid,
        WidgetKind::Form,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Space => "space",
            WidgetKind::Text => "text",
            WidgetKind::Input => "input",
            WidgetKind::Number => "number",
            WidgetKind::Image => "image",
            WidgetKind::Button => "button",
            WidgetKind::Check => "check",
            WidgetKind::List => "list",
            WidgetKind::Tree => "tree",
            WidgetKind::Tabs => "tabs",
            WidgetKind::Row => "row",
            WidgetKind::Column => "column",
            WidgetKind::Grid => "grid",
            WidgetKind::Form => "form",
        }
    }

    /// Widgets whose `items` are laid out as children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            WidgetKind::Tabs
                | WidgetKind::Row
                | WidgetKind::Column
                | WidgetKind::Grid
                | WidgetKind::Form
        )
    }

    /// Widgets the renderer reports events for, as long as they carry an id.
    pub fn emits_events(self) -> bool {
        matches!(
            self,
            WidgetKind::Button
                | WidgetKind::Check
                | WidgetKind::Input
                | WidgetKind::Number
                | WidgetKind::List
                | WidgetKind::Tree
        )
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DialogError::UnknownWidget(s.to_string()))
    }
}

/// A child of a container: either a nested widget or a bare string, which
/// the renderer shows as a `text` widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    Widget(Widget),
    Text(String),
}

impl From<Widget> for Item {
    fn from(widget: Widget) -> Self {
        Item::Widget(widget)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Item::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Item::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub value: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: i64,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fill: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(flatten, deserialize_with = "user_properties")]
    properties: BTreeMap<String, Value>,
}

impl Default for Widget {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: String::new(),
            title: String::new(),
            group: String::new(),
            text: String::new(),
            value: 0,
            width: 0,
            height: 0,
            enabled: true,
            fill: false,
            items: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl Widget {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn space() -> Self {
        Self::new(WidgetKind::Space)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(WidgetKind::Text).with_text(text)
    }

    pub fn button(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(WidgetKind::Button).with_id(id).with_text(text)
    }

    pub fn check(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(WidgetKind::Check).with_id(id).with_text(text)
    }

    pub fn input(id: impl Into<String>) -> Self {
        Self::new(WidgetKind::Input).with_id(id)
    }

    /// Number spinner starting at `value`, bounded by [`NUMBER_MIN`] and [`NUMBER_MAX`]
    /// unless `min`/`max` properties say otherwise.
    pub fn number(id: impl Into<String>, value: i64) -> Self {
        Self::new(WidgetKind::Number).with_id(id).with_value(value)
    }

    pub fn image(source: impl Into<String>) -> Self {
        Self::new(WidgetKind::Image).with_text(source)
    }

    pub fn list<I, T>(id: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::List).with_id(id).with_items(items)
    }

    pub fn tree<I, T>(id: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Tree).with_id(id).with_items(items)
    }

    pub fn tabs<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Tabs).with_items(items)
    }

    pub fn row<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Row).with_items(items)
    }

    pub fn column<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Column).with_items(items)
    }

    pub fn grid<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Grid).with_items(items)
    }

    pub fn form<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(WidgetKind::Form).with_items(items)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Caption shown above the widget.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Wraps a layout in a labelled group box.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn with_size(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_item(mut self, item: impl Into<Item>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn with_items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    /// Adds a free-form property. Built-in keys are rejected so they cannot
    /// shadow the widget's own fields on the wire.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Returns `false` when `key` names a built-in field and was ignored.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if WIDGET_BUILTINS.contains(&key.as_str()) {
            return false;
        }
        self.properties.insert(key, value.into());
        true
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn has_group(&self) -> bool {
        !self.group.is_empty()
    }

    /// The id events are reported under: the id, or the text for id-less widgets.
    pub fn id_or_text(&self) -> &str {
        if self.id.is_empty() {
            &self.text
        } else {
            &self.id
        }
    }

    /// `None` for an empty type, which the renderer skips.
    pub fn widget_kind(&self) -> Option<Result<WidgetKind, DialogError>> {
        if self.kind.is_empty() {
            None
        } else {
            Some(self.kind.parse())
        }
    }

    /// Id-less interactive widgets are inert and repeated ids are allowed;
    /// the renderer keeps the last value for a repeated id in model mode.
    fn validate_tree(&self) -> Result<(), DialogError> {
        match self.widget_kind() {
            None => return Ok(()),
            Some(kind) => kind?,
        };

        for item in &self.items {
            if let Item::Widget(child) = item {
                child.validate_tree()?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub font: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub x: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub y: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fixed: bool,
    /// When set, every event carries the values of all identified widgets in `detail`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub model: bool,
    #[serde(default, skip_serializing_if = "Widget::is_blank")]
    pub body: Widget,
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl Window {
    pub fn new() -> Self {
        Self {
            kind: WINDOW_TYPE.to_string(),
            title: String::new(),
            font: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            fixed: false,
            model: false,
            body: Widget::default(),
        }
    }

    /// Decodes a request document. A JSON `null` means "no window".
    pub fn from_json(value: Value) -> Result<Option<Self>, DialogError> {
        if value.is_null() {
            return Ok(None);
        }
        if !value.is_object() {
            return Err(DialogError::NotAnObject(json_type_name(&value)));
        }

        let window: Window = serde_json::from_value(value)?;
        window.validate()?;
        Ok(Some(window))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_position(mut self, x: i64, y: i64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn with_model(mut self, model: bool) -> Self {
        self.model = model;
        self
    }

    pub fn with_font(mut self, font: &Font) -> Self {
        self.font = font.to_string();
        self
    }

    pub fn with_body(mut self, body: Widget) -> Self {
        self.body = body;
        self
    }

    pub fn parsed_font(&self) -> Option<Result<Font, DialogError>> {
        if self.font.is_empty() {
            None
        } else {
            Some(self.font.parse())
        }
    }

    /// Checks what the renderer rejects: the window type, the font and unknown widget kinds.
    pub fn validate(&self) -> Result<(), DialogError> {
        if self.kind != WINDOW_TYPE {
            return Err(DialogError::InvalidWindowType(self.kind.clone()));
        }
        if let Some(font) = self.parsed_font() {
            font?;
        }

        self.body.validate_tree()
    }
}

impl Widget {
    fn is_blank(&self) -> bool {
        *self == Widget::default()
    }
}

/// Drops built-in keys (such as a literal `properties`) that the flattened
/// map would otherwise pick up.
fn user_properties<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut properties = BTreeMap::<String, Value>::deserialize(deserializer)?;
    properties.retain(|key, _| !WIDGET_BUILTINS.contains(&key.as_str()));
    Ok(properties)
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
