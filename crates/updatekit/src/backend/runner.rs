//! Process execution for backends.
//!
//! Every command is an [`Invocation`]: a program plus a vector of discrete
//! arguments handed straight to `execve` through [`std::process::Command`].
//! Nothing is ever passed through a shell, so a package name containing
//! `;`, `$(...)` or spaces stays one literal argument.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// How often a bounded command is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single program execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments, one element per argv entry
    pub args: Vec<String>,
    /// Run with root privileges (via sudo when not already root)
    pub elevated: bool,
    /// Let the child write directly to the terminal
    pub inherit_output: bool,
}

impl Invocation {
    /// Create an invocation with captured output.
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            elevated: false,
            inherit_output: false,
        }
    }

    /// Require root privileges.
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Stream output to the terminal instead of capturing it.
    pub fn streaming(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// Append more arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Rendering for logs only; never executed.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if self.elevated {
            parts.push("sudo".to_string());
        }
        parts.push(self.program.clone());
        parts.extend(self.args.iter().map(|a| format!("{a:?}")));
        parts.join(" ")
    }
}

/// Output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout (empty when streamed)
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when streamed)
    pub stderr: Vec<u8>,
    /// Whether the command exited successfully
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            success: true,
        }
    }

    /// Failed output with the given stderr.
    pub fn failed(stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Executes invocations.
///
/// Backends only talk to the host through this trait, which lets tests
/// record the exact argv a backend would have run.
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not as
    /// an error; errors mean the program could not be run at all.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Whether `program` can be found on `PATH`.
    fn program_exists(&self, program: &str) -> bool;
}

/// Runs real processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Runner without a time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill captured commands that run longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    fn command(invocation: &Invocation) -> Command {
        if invocation.elevated && !is_root() {
            let mut cmd = Command::new("sudo");
            cmd.arg("--").arg(&invocation.program).args(&invocation.args);
            cmd
        } else {
            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args);
            cmd
        }
    }

    fn run_bounded(&self, mut cmd: Command, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput> {
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&invocation.program, &e))?;

        // Both pipes are drained on helper threads while the child is polled.
        // A descendant may keep a pipe open after the child exits, so the
        // drains are bounded by the same deadline.
        let (tx, rx) = mpsc::channel();
        if let Some(pipe) = child.stdout.take() {
            drain(pipe, Stream::Stdout, tx.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            drain(pipe, Stream::Stderr, tx.clone());
        }
        drop(tx);

        let timed_out = || Error::Timeout {
            program: invocation.program.clone(),
            secs: timeout.as_secs(),
        };

        let deadline = Instant::now() + timeout;
        let Some(status) = wait_until(&mut child, deadline)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out());
        };

        let mut output = CommandOutput {
            success: status.success(),
            ..Default::default()
        };
        loop {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((Stream::Stdout, buf)) => output.stdout = buf,
                Ok((Stream::Stderr, buf)) => output.stderr = buf,
                Err(RecvTimeoutError::Disconnected) => return Ok(output),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "{} exited but its output stayed open past the deadline",
                        invocation.program
                    );
                    return Err(timed_out());
                }
            }
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("Running {}", invocation.display());
        let mut cmd = Self::command(invocation);

        if invocation.inherit_output {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| spawn_error(&invocation.program, &e))?;
            return Ok(CommandOutput {
                success: status.success(),
                ..Default::default()
            });
        }

        if let Some(timeout) = self.timeout {
            return self.run_bounded(cmd, invocation, timeout);
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&invocation.program, &e))?;
        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        })
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

fn spawn_error(program: &str, e: &std::io::Error) -> Error {
    Error::CommandFailed {
        message: format!("failed to execute {program}: {e}"),
        stderr: String::new(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Read `pipe` to EOF on a helper thread and send the bytes to `tx`.
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, buf));
    });
}

/// Poll `child` until it exits or `deadline` passes.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
