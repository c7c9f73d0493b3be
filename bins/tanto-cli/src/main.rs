mod config;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tanto_client::{MessageIcon, TantoClient, TantoCommand, TantoProcess};
use tanto_core::{parse_filter, Event, TantoConfig, Window, CONFIG};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{load_cli_config, CliConfig};

#[derive(Parser, Debug)]
#[command(name = "tanto-cli", about = "Show tanto dialogs from the command line", version)]
struct Cli {
    #[command(flatten)]
    renderer: RendererArgs,
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RendererArgs {
    /// Renderer executable
    #[arg(long, global = true)]
    executable: Option<String>,
    /// Renderer backend, e.g. gtk or qt
    #[arg(long, short = 'b', global = true)]
    backend: Option<String>,
    /// Ask the renderer to dump its arguments
    #[arg(long, short = 'd', global = true, default_value_t = false)]
    debug: bool,
    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show a dialog read from a JSON/YAML file or stdin
    Show {
        /// Dialog file; `-` or nothing reads JSON from stdin
        file: Option<PathBuf>,
        /// Print every event as it arrives instead of only the last one
        #[arg(long, default_value_t = false)]
        follow: bool,
        /// Print events as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Send the document without checking it first
        #[arg(long, default_value_t = false)]
        unchecked: bool,
    },
    /// Let the renderer load a dialog file itself
    Load {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show a message box
    Message {
        title: String,
        text: String,
        #[arg(long, short = 'i')]
        icon: Option<MessageIcon>,
    },
    /// Ask a yes/no question
    Confirm {
        title: String,
        text: String,
        #[arg(long, short = 'i')]
        icon: Option<MessageIcon>,
    },
    /// Ask for a line of text
    Input {
        title: String,
        #[arg(long, short = 't')]
        text: Option<String>,
        #[arg(long, short = 'v')]
        value: Option<String>,
    },
    /// Ask for a password
    Password {
        title: String,
        #[arg(long, short = 't')]
        text: Option<String>,
    },
    /// Pick a directory
    SelectDir {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Pick a file to open
    LoadFile(FileArgs),
    /// Pick a file to save to
    SaveFile(FileArgs),
    /// List the renderer's backends
    Backends,
}

#[derive(Args, Debug)]
struct FileArgs {
    #[arg(long)]
    title: Option<String>,
    /// Filters such as `Images|*.png;*.jpg|All|*`
    #[arg(long, short = 'f')]
    filter: Option<String>,
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = load_cli_config().context("failed to load tanto-cli configuration")?;
    init_tracing(&cli, &cli_config)?;

    let config = resolve_config(&cli.renderer, &cli_config, CONFIG.clone());
    let client = TantoClient::from_config(&config)?;

    match cli.command {
        Commands::Show {
            file,
            follow,
            json,
            unchecked,
        } => handle_show(&client, file.as_deref(), follow, json, unchecked).await?,
        Commands::Load { file, json } => {
            let event = client.show_file(file).await?;
            print_last_event(event.as_ref(), json)?;
        }
        Commands::Message { title, text, icon } => {
            println!("{}", client.message(title, text, icon).await?);
        }
        Commands::Confirm { title, text, icon } => {
            println!("{}", client.confirm(title, text, icon).await?);
        }
        Commands::Input { title, text, value } => {
            println!("{}", client.input(title, text, value).await?);
        }
        Commands::Password { title, text } => {
            println!("{}", client.password(title, text).await?);
        }
        Commands::SelectDir { title, dir } => {
            println!("{}", client.select_dir(title, dir).await?);
        }
        Commands::LoadFile(args) => {
            let filters = args.filter.as_deref().map(parse_filter).unwrap_or_default();
            println!("{}", client.load_file(args.title, filters, args.dir).await?);
        }
        Commands::SaveFile(args) => {
            let filters = args.filter.as_deref().map(parse_filter).unwrap_or_default();
            println!("{}", client.save_file(args.title, filters, args.dir).await?);
        }
        Commands::Backends => {
            let backends = client.list_backends().await?;
            if backends.is_empty() {
                bail!("the renderer reported no backends");
            }
            for backend in backends {
                println!("{}", backend);
            }
        }
    }

    Ok(())
}

/// Command-line flags win over the config file, which wins over the environment.
fn resolve_config(args: &RendererArgs, cli_config: &CliConfig, base: TantoConfig) -> TantoConfig {
    let mut config = cli_config.apply(base);

    if let Some(executable) = &args.executable {
        config.executable = executable.clone();
    }
    if args.backend.is_some() {
        config.backend = args.backend.clone();
    }
    if args.timeout.is_some() {
        config.timeout_secs = args.timeout;
    }
    config.debug |= args.debug;

    config
}

async fn handle_show(
    client: &TantoClient,
    file: Option<&Path>,
    follow: bool,
    json: bool,
    unchecked: bool,
) -> Result<()> {
    let document = read_dialog(file)?;

    if unchecked {
        let event = client.show_json(&document).await?;
        return print_last_event(event.as_ref(), json);
    }

    let window = Window::from_json(document)
        .context("invalid dialog document")?
        .context("the dialog document is null")?;

    if !follow {
        let event = client.show_dialog(&window).await?;
        return print_last_event(event.as_ref(), json);
    }

    let mut process = TantoProcess::spawn(client.runner(), &TantoCommand::Stdin, client.options()).await?;
    process.send(&window).await?;
    while let Some(event) = process.next_event().await? {
        print_event(&event, json)?;
    }
    process.wait().await?;

    Ok(())
}

fn read_dialog(file: Option<&Path>) -> Result<Value> {
    let (contents, source) = match file.filter(|path| *path != Path::new("-")) {
        Some(path) => (
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            path.display().to_string(),
        ),
        None => {
            let mut contents = String::new();
            std::io::stdin()
                .read_to_string(&mut contents)
                .context("failed to read the dialog from stdin")?;
            (contents, "stdin".to_string())
        }
    };

    parse_dialog(&contents, file)
        .with_context(|| format!("{} is not a valid dialog document", source))
}

fn parse_dialog(contents: &str, file: Option<&Path>) -> Result<Value> {
    let is_yaml = file
        .and_then(Path::extension)
        .is_some_and(|ext| ext == "yaml" || ext == "yml");

    if is_yaml {
        Ok(serde_yaml::from_str(contents)?)
    } else {
        Ok(serde_json::from_str(contents)?)
    }
}

fn print_event(event: &Event, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", event);
    }
    Ok(())
}

fn print_last_event(event: Option<&Event>, json: bool) -> Result<()> {
    match event {
        Some(event) => print_event(event, json),
        None => {
            eprintln!("Window closed without an event");
            Ok(())
        }
    }
}

fn init_tracing(cli: &Cli, cli_config: &CliConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli_config.log_filter().unwrap_or("warn")))
        .context("invalid log filter")?;

    // stdout carries results, so logs never go there
    let log_dir = cli.log_dir.as_ref().or(cli_config.log_dir());
    let installed = match log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("tanto-cli")
                .build(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;

            let subscriber = fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stderr.and(file_appender))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => tracing::subscriber::set_global_default(
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };

    if installed.is_err() {
        // tracing already initialised; ignore.
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_show_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tanto-cli", "show", "dialog.yaml", "--follow", "--backend", "qt", "--timeout", "5",
        ])
        .unwrap();

        assert_eq!(cli.renderer.backend.as_deref(), Some("qt"));
        assert_eq!(cli.renderer.timeout, Some(5));
        assert!(matches!(
            cli.command,
            Commands::Show { ref file, follow: true, json: false, unchecked: false }
                if file.as_deref() == Some(Path::new("dialog.yaml"))
        ));
    }

    #[test]
    fn test_cli_parses_message_icon() {
        let cli = Cli::try_parse_from(["tanto-cli", "confirm", "Quit", "Sure?", "-i", "warning"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Confirm { icon: Some(MessageIcon::Warning), .. }
        ));
        assert!(Cli::try_parse_from(["tanto-cli", "message", "a", "b", "--icon", "loud"]).is_err());
    }

    #[test]
    fn test_flags_override_configuration() {
        let cli = Cli::try_parse_from(["tanto-cli", "--executable", "/opt/tanto", "-d", "backends"]).unwrap();
        let base = TantoConfig {
            backend: Some("gtk".into()),
            ..TantoConfig::default()
        };

        let config = resolve_config(&cli.renderer, &CliConfig::default(), base);
        assert_eq!(config.executable, "/opt/tanto");
        assert_eq!(config.backend.as_deref(), Some("gtk"));
        assert!(config.debug);
    }

    #[test]
    fn test_parse_dialog_by_extension() {
        let yaml = "type: window\nbody:\n  type: column\n  items: [Hello]\n";
        let value = parse_dialog(yaml, Some(Path::new("hello.yml"))).unwrap();
        let window = Window::from_json(value).unwrap().unwrap();
        assert_eq!(window.body.items.len(), 1);

        assert!(parse_dialog(yaml, None).is_err());
        assert!(parse_dialog(r#"{"type": "window"}"#, Some(Path::new("d.json"))).is_ok());
    }
}
