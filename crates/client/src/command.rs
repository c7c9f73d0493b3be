use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tanto_core::{format_filter, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIcon {
    Info,
    Question,
    Warning,
    Error,
}

impl MessageIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageIcon::Info => "info",
            MessageIcon::Question => "question",
            MessageIcon::Warning => "warning",
            MessageIcon::Error => "error",
        }
    }
}

impl fmt::Display for MessageIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageIcon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(MessageIcon::Info),
            "question" => Ok(MessageIcon::Question),
            "warning" => Ok(MessageIcon::Warning),
            "error" => Ok(MessageIcon::Error),
            other => Err(format!("unknown message icon: {}", other)),
        }
    }
}

/// One renderer mode, as selected by its first command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TantoCommand {
    /// Read the dialog description from stdin.
    Stdin,
    /// Let the renderer read the dialog description from a file.
    Load(PathBuf),
    Message {
        title: String,
        text: String,
        icon: Option<MessageIcon>,
    },
    Confirm {
        title: String,
        text: String,
        icon: Option<MessageIcon>,
    },
    Input {
        title: String,
        text: Option<String>,
        value: Option<String>,
    },
    Password {
        title: String,
        text: Option<String>,
    },
    SelectDir {
        title: Option<String>,
        dir: Option<PathBuf>,
    },
    LoadFile {
        title: Option<String>,
        filters: Vec<Filter>,
        dir: Option<PathBuf>,
    },
    SaveFile {
        title: Option<String>,
        filters: Vec<Filter>,
        dir: Option<PathBuf>,
    },
    /// Print the available backends, one `name: version` per line.
    List,
}

/// Flags accepted by every renderer mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub backend: Option<String>,
    pub debug: bool,
}

impl TantoCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TantoCommand::Stdin => "stdin",
            TantoCommand::Load(_) => "load",
            TantoCommand::Message { .. } => "message",
            TantoCommand::Confirm { .. } => "confirm",
            TantoCommand::Input { .. } => "input",
            TantoCommand::Password { .. } => "password",
            TantoCommand::SelectDir { .. } => "selectdir",
            TantoCommand::LoadFile { .. } => "loadfile",
            TantoCommand::SaveFile { .. } => "savefile",
            TantoCommand::List => "list",
        }
    }

    pub fn reads_stdin(&self) -> bool {
        matches!(self, TantoCommand::Stdin)
    }

    pub fn args(&self, options: &GlobalOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.name().into()];

        match self {
            TantoCommand::Stdin | TantoCommand::List => {}
            TantoCommand::Load(path) => args.push(path.into()),
            TantoCommand::Message { title, text, icon }
            | TantoCommand::Confirm { title, text, icon } => {
                args.push(title.into());
                args.push(text.into());
                if let Some(icon) = icon {
                    args.push(icon.as_str().into());
                }
            }
            TantoCommand::Input { title, text, value } => {
                args.push(title.into());
                push_optional(&mut args, [text.as_ref().map(Into::into), value.as_ref().map(Into::into)]);
            }
            TantoCommand::Password { title, text } => {
                args.push(title.into());
                push_optional(&mut args, [text.as_ref().map(Into::into)]);
            }
            TantoCommand::SelectDir { title, dir } => {
                push_optional(&mut args, [title.as_ref().map(Into::into), dir.as_ref().map(Into::into)]);
            }
            TantoCommand::LoadFile { title, filters, dir }
            | TantoCommand::SaveFile { title, filters, dir } => {
                let filter = (!filters.is_empty()).then(|| format_filter(filters).into());
                push_optional(
                    &mut args,
                    [title.as_ref().map(Into::into), filter, dir.as_ref().map(Into::into)],
                );
            }
        }

        if let Some(backend) = options.backend.as_ref().filter(|_| !matches!(self, TantoCommand::List)) {
            args.push("--backend".into());
            args.push(backend.into());
        }
        if options.debug {
            args.push("--debug".into());
        }

        args
    }
}

/// Optional positionals only make sense in order: a later value forces the
/// earlier ones out as empty strings.
fn push_optional<const N: usize>(args: &mut Vec<OsString>, values: [Option<OsString>; N]) {
    let Some(last) = values.iter().rposition(Option::is_some) else {
        return;
    };
    args.extend(
        values
            .into_iter()
            .take(last + 1)
            .map(Option::unwrap_or_default),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_stdin_with_backend_and_debug() {
        let options = GlobalOptions {
            backend: Some("gtk".into()),
            debug: true,
        };
        assert_eq!(
            strings(TantoCommand::Stdin.args(&options)),
            vec!["stdin", "--backend", "gtk", "--debug"]
        );
    }

    #[test]
    fn test_list_ignores_backend() {
        let options = GlobalOptions {
            backend: Some("qt".into()),
            debug: false,
        };
        assert_eq!(strings(TantoCommand::List.args(&options)), vec!["list"]);
    }

    #[test]
    fn test_message_with_icon() {
        let command = TantoCommand::Confirm {
            title: "Delete".into(),
            text: "Really delete?".into(),
            icon: Some(MessageIcon::Question),
        };
        assert_eq!(
            strings(command.args(&GlobalOptions::default())),
            vec!["confirm", "Delete", "Really delete?", "question"]
        );
    }

    #[test]
    fn test_input_value_forces_empty_text() {
        let command = TantoCommand::Input {
            title: "Name".into(),
            text: None,
            value: Some("Ada".into()),
        };
        assert_eq!(
            strings(command.args(&GlobalOptions::default())),
            vec!["input", "Name", "", "Ada"]
        );
    }

    #[test]
    fn test_trailing_missing_positionals_are_omitted() {
        let command = TantoCommand::SelectDir {
            title: Some("Pick".into()),
            dir: None,
        };
        assert_eq!(strings(command.args(&GlobalOptions::default())), vec!["selectdir", "Pick"]);

        let command = TantoCommand::Password {
            title: "Login".into(),
            text: None,
        };
        assert_eq!(strings(command.args(&GlobalOptions::default())), vec!["password", "Login"]);
    }

    #[test]
    fn test_load_file_formats_filters() {
        let command = TantoCommand::LoadFile {
            title: None,
            filters: vec![Filter::new("Images", ["*.png", "*.jpg"])],
            dir: Some(PathBuf::from("/tmp")),
        };
        assert_eq!(
            strings(command.args(&GlobalOptions::default())),
            vec!["loadfile", "", "Images|*.png;*.jpg", "/tmp"]
        );
    }

    #[test]
    fn test_icon_parsing() {
        assert_eq!("warning".parse::<MessageIcon>().unwrap(), MessageIcon::Warning);
        assert!("loud".parse::<MessageIcon>().is_err());
    }
}
