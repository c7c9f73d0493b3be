pub mod config;
pub mod error;
pub mod event;
pub mod parse;
pub mod types;

pub use config::{TantoConfig, CONFIG};
pub use error::DialogError;
pub use event::{Event, EventKind, Selection};
pub use parse::{format_filter, parse_filter, parse_header, stringify, Filter, Font, HeaderItem};
pub use types::{Item, Widget, WidgetKind, Window};
