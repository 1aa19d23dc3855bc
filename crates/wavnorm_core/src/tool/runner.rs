//! Blocking process runner with an optional deadline.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::types::{ToolError, ToolResult};

/// How often a bounded invocation is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lines of stderr kept in a failure message.
const FAILURE_TAIL_LINES: usize = 12;

/// Captured result of one invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn an abnormal exit into `CommandFailed`.
    pub fn check(self, tool: &str) -> ToolResult<Self> {
        if self.success {
            return Ok(self);
        }
        Err(ToolError::command_failed(
            tool,
            self.exit_code.unwrap_or(-1),
            tail_lines(&self.stderr, FAILURE_TAIL_LINES),
        ))
    }
}

/// Render a command line for logs.
pub fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.contains(char::is_whitespace) || arg.contains('|') || arg.contains(';') {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Run a command to completion, capturing both output streams.
///
/// With a `timeout`, the child is killed once the deadline passes and
/// `ToolError::Timeout` is returned.
pub fn run(tool: &str, mut cmd: Command, timeout: Option<Duration>) -> ToolResult<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("Running {}: {}", tool, describe(&cmd));

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ToolError::missing(tool, cmd.get_program().to_string_lossy())
        } else {
            ToolError::spawn_failed(tool, e)
        }
    })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let waited = match timeout {
        None => match child.wait() {
            Ok(status) => Wait::Exited(status),
            Err(e) => {
                stop(&mut child);
                Wait::Failed(e)
            }
        },
        Some(limit) => wait_bounded(&mut child, Instant::now() + limit),
    };

    match waited {
        Wait::Exited(status) => Ok(CommandOutput {
            exit_code: status.code(),
            success: status.success(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        }),
        Wait::TimedOut => {
            collect(stdout);
            collect(stderr);
            let limit = timeout.unwrap_or_default();
            tracing::warn!("{} killed after {}s", tool, limit.as_secs());
            Err(ToolError::timeout(tool, limit))
        }
        Wait::Failed(e) => {
            collect(stdout);
            collect(stderr);
            tracing::warn!("Lost track of {}, child killed: {}", tool, e);
            Err(ToolError::io(format!("waiting for {}", tool), e))
        }
    }
}

/// A running child that can be polled, killed and reaped.
trait Reapable {
    fn poll(&mut self) -> io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> io::Result<()>;
    fn reap(&mut self) -> io::Result<()>;
}

impl Reapable for Child {
    fn poll(&mut self) -> io::Result<Option<ExitStatus>> {
        self.try_wait()
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn reap(&mut self) -> io::Result<()> {
        self.wait().map(drop)
    }
}

#[derive(Debug)]
enum Wait {
    Exited(ExitStatus),
    TimedOut,
    Failed(io::Error),
}

/// Poll until exit or `deadline`. On timeout or a polling error the
/// child is killed and reaped before returning.
fn wait_bounded<C: Reapable>(child: &mut C, deadline: Instant) -> Wait {
    loop {
        match child.poll() {
            Ok(Some(status)) => return Wait::Exited(status),
            Ok(None) => {}
            Err(e) => {
                stop(child);
                return Wait::Failed(e);
            }
        }
        if Instant::now() >= deadline {
            stop(child);
            return Wait::TimedOut;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn stop<C: Reapable>(child: &mut C) {
    let _ = child.kill();
    let _ = child.reap();
}

/// Read a pipe on its own thread so a chatty child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Last `n` non-blank lines of `text`.
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
