use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tanto_core::{Event, TantoConfig, Window};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::command::{GlobalOptions, TantoCommand};
use crate::error::{Result, TantoError};

/// Everything a successful renderer run printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the renderer once: hands it `input` on stdin and collects its output.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, args: Vec<OsString>, input: Option<Vec<u8>>) -> Result<RawOutput>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: String,
    prefix_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            prefix_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &TantoConfig) -> Result<Self> {
        let executable = config.require_executable()?;
        Ok(Self::new(executable)
            .with_prefix_args(config.args.iter().cloned())
            .with_timeout(config.timeout()))
    }

    /// Arguments placed before the renderer command.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    fn spawn(&self, args: &[OsString], stdin: Stdio, stderr: Stdio) -> Result<Child> {
        let mut command = Command::new(&self.executable);
        command.args(&self.prefix_args);
        command.args(args);
        command.kill_on_drop(true);
        command.stdin(stdin);
        command.stdout(Stdio::piped());
        command.stderr(stderr);

        command.spawn().map_err(|source| TantoError::Spawn {
            executable: self.executable.clone(),
            source,
        })
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    #[instrument(skip_all, fields(executable = %self.executable, mode = ?args.first()))]
    async fn run(&self, args: Vec<OsString>, input: Option<Vec<u8>>) -> Result<RawOutput> {
        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = self.spawn(&args, stdin, Stdio::piped())?;
        let stdin = child.stdin.take();

        let exchange = async move {
            let (written, output) =
                tokio::join!(write_input(stdin, input), child.wait_with_output());
            written?;
            Ok::<_, TantoError>(output?)
        };

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| TantoError::Timeout(limit))??,
            None => exchange.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "renderer wrote to stderr");
        }

        check_status(output.status, &stdout, &stderr)?;
        debug!(bytes = stdout.len(), "renderer finished");
        Ok(RawOutput { stdout, stderr })
    }
}

async fn write_input(stdin: Option<ChildStdin>, input: Option<Vec<u8>>) -> Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };

    match stdin.write_all(&input).await {
        Ok(()) => {}
        // the exit status tells the real story
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            debug!("renderer closed stdin before reading the request");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

fn check_status(status: ExitStatus, stdout: &str, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    let message = [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or_default();
    let message = message.strip_prefix("ERROR: ").unwrap_or(message).to_string();

    warn!(code = ?status.code(), %message, "renderer failed");
    Err(TantoError::Exit {
        code: status.code(),
        message,
    })
}

/// Live renderer process for dialogs whose intermediate events matter.
///
/// Events are read one stdout line at a time as the renderer prints them;
/// stderr is passed through to ours. The runner's timeout is a deadline for
/// the whole session, counted from spawn.
pub struct TantoProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    deadline: Option<(Instant, Duration)>,
    /// Last non-event stdout line; the renderer prints its errors there.
    last_message: Option<String>,
}

impl TantoProcess {
    #[instrument(skip_all, fields(executable = %runner.executable, mode = command.name()))]
    pub async fn spawn(
        runner: &ProcessRunner,
        command: &TantoCommand,
        options: &GlobalOptions,
    ) -> Result<Self> {
        let stdin = if command.reads_stdin() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = runner.spawn(&command.args(options), stdin, Stdio::inherit())?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or(TantoError::MissingPipe("stdout"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            deadline: runner.timeout.map(|limit| (Instant::now() + limit, limit)),
            last_message: None,
        })
    }

    pub async fn send(&mut self, window: &Window) -> Result<()> {
        window.validate()?;
        let payload = serde_json::to_value(window).map_err(TantoError::Encode)?;
        self.send_json(&payload).await
    }

    /// Writes the request and closes stdin; the renderer reads exactly one document.
    pub async fn send_json(&mut self, request: &Value) -> Result<()> {
        let mut stdin = self.stdin.take().ok_or(TantoError::MissingPipe("stdin"))?;
        let mut payload = serde_json::to_string(request).map_err(TantoError::Encode)?;
        payload.push('\n');

        let written = async {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.flush().await?;
            Ok::<_, std::io::Error>(())
        };
        match within(self.deadline, written).await? {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                debug!("renderer closed stdin before reading the request");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// `Ok(None)` once the renderer has closed stdout.
    pub async fn next_event(&mut self) -> Result<Option<Event>> {
        let mut buffer = String::new();

        loop {
            buffer.clear();
            let bytes = within(self.deadline, self.stdout.read_line(&mut buffer)).await??;

            if bytes == 0 {
                debug!("renderer exited or produced no more output");
                return Ok(None);
            }

            match Event::from_line(&buffer) {
                None => self.note_output(&buffer),
                Some(Ok(event)) => return Ok(Some(event)),
                Some(Err(source)) => {
                    return Err(TantoError::Decode {
                        output: buffer.trim_end().to_string(),
                        source,
                    })
                }
            }
        }
    }

    /// Waits for the renderer to exit. Unread output is drained first so an
    /// error printed after the last event still ends up in [`TantoError::Exit`].
    pub async fn wait(mut self) -> Result<()> {
        drop(self.stdin.take());

        let mut rest = String::new();
        within(self.deadline, self.stdout.read_to_string(&mut rest)).await??;
        for line in rest.lines() {
            if Event::from_line(line).is_none() {
                self.note_output(line);
            }
        }

        let status = within(self.deadline, self.child.wait()).await??;
        check_status(status, self.last_message.as_deref().unwrap_or_default(), "")
    }

    fn note_output(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        debug!(line, "skipping non-event output");
        self.last_message = Some(line.to_string());
    }
}

/// Runs `future` until the session deadline, if there is one. The child is
/// killed when the [`TantoProcess`] holding it is dropped.
async fn within<F: Future>(deadline: Option<(Instant, Duration)>, future: F) -> Result<F::Output> {
    match deadline {
        Some((at, limit)) => tokio::time::timeout_at(at, future)
            .await
            .map_err(|_| TantoError::Timeout(limit)),
        None => Ok(future.await),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tanto_core::{EventKind, Widget};

    fn script(body: &str) -> ProcessRunner {
        ProcessRunner::new("sh").with_prefix_args(["-c", body, "tanto"])
    }

    fn strings(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[tokio::test]
    async fn test_run_passes_input_and_collects_stdout() {
        let runner = script(r#"read request; echo "$request" | grep -q '"window"' && echo '{"type":"clicked","from":"b1"}'"#);
        let output = runner
            .run(strings(&["stdin"]), Some(br#"{"type":"window"}"#.to_vec()))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), r#"{"type":"clicked","from":"b1"}"#);
    }

    #[tokio::test]
    async fn test_run_forwards_arguments() {
        let output = script(r#"echo "$@""#)
            .run(strings(&["list", "--debug"]), None)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "list --debug");
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_message() {
        let err = script("echo \"ERROR: Unsupported backend 'foo'\"; exit 1")
            .run(strings(&["stdin"]), None)
            .await
            .unwrap_err();

        match err {
            TantoError::Exit { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "Unsupported backend 'foo'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_is_preferred_for_exit_message() {
        let err = script("echo partial; echo 'boom' >&2; exit 2")
            .run(strings(&["stdin"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TantoError::Exit { code: Some(2), ref message } if message == "boom"));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let err = ProcessRunner::new("/nonexistent/tanto-renderer")
            .run(strings(&["stdin"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TantoError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_renderer() {
        let err = script("sleep 5")
            .with_timeout(Some(Duration::from_millis(200)))
            .run(strings(&["stdin"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TantoError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unread_input_is_not_an_error() {
        let payload = vec![b' '; 1 << 20];
        let output = script("exit 0")
            .run(strings(&["stdin"]), Some(payload))
            .await
            .unwrap();
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_streaming_process_yields_events_in_order() {
        let runner = script(
            r#"read request
echo '{"type":"changed","from":"name","detail":"A"}'
echo 'debug - true'
echo '{"type":"clicked","from":"ok"}'"#,
        );
        let window = Window::new().with_body(Widget::column([
            Widget::input("name"),
            Widget::button("ok", "OK"),
        ]));

        let mut process = TantoProcess::spawn(&runner, &TantoCommand::Stdin, &GlobalOptions::default())
            .await
            .unwrap();
        process.send(&window).await.unwrap();

        let first = process.next_event().await.unwrap().unwrap();
        assert_eq!(first.kind, EventKind::Changed);
        assert!(!first.is_terminal());

        let second = process.next_event().await.unwrap().unwrap();
        assert_eq!(second.from, "ok");
        assert!(second.is_terminal());

        assert!(process.next_event().await.unwrap().is_none());
        process.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_streaming_exit_keeps_renderer_message() {
        let runner = script("echo \"ERROR: Unsupported backend 'foo'\"; exit 1");
        let mut process = TantoProcess::spawn(&runner, &TantoCommand::Stdin, &GlobalOptions::default())
            .await
            .unwrap();

        assert!(process.next_event().await.unwrap().is_none());
        match process.wait().await.unwrap_err() {
            TantoError::Exit { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "Unsupported backend 'foo'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_wait_drains_unread_output() {
        let runner = script("echo '{\"type\":\"clicked\",\"from\":\"ok\"}'; echo 'ERROR: late failure'; exit 3");
        let process = TantoProcess::spawn(&runner, &TantoCommand::Stdin, &GlobalOptions::default())
            .await
            .unwrap();

        let err = process.wait().await.unwrap_err();
        assert!(matches!(err, TantoError::Exit { code: Some(3), ref message } if message == "late failure"));
    }

    #[tokio::test]
    async fn test_streaming_honours_timeout() {
        let runner = script("sleep 3").with_timeout(Some(Duration::from_millis(200)));
        let mut process = TantoProcess::spawn(&runner, &TantoCommand::Stdin, &GlobalOptions::default())
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let err = process.next_event().await.unwrap_err();
        assert!(matches!(err, TantoError::Timeout(limit) if limit == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_streaming_send_twice_fails() {
        let runner = script("cat >/dev/null");
        let mut process = TantoProcess::spawn(&runner, &TantoCommand::Stdin, &GlobalOptions::default())
            .await
            .unwrap();
        process.send_json(&serde_json::json!({"type": "window"})).await.unwrap();
        assert!(matches!(
            process.send_json(&serde_json::json!({"type": "window"})).await,
            Err(TantoError::MissingPipe("stdin"))
        ));
        process.wait().await.unwrap();
    }
}
