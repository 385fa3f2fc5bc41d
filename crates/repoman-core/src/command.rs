use crate::cancel::{CancelReason, CancelToken};
use crate::config::GitSettings;
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// How long output pipes may stay open after the child has exited.
const PIPE_GRACE: Duration = Duration::from_secs(1);

/// Host-key trust rule handed to ssh through `GIT_SSH_COMMAND`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HostKeyPolicy {
    Strict,
    /// Only for a first clone into a fresh path.
    AcceptNew,
}

impl HostKeyPolicy {
    pub fn as_ssh_value(&self) -> &'static str {
        match self {
            HostKeyPolicy::Strict => "yes",
            HostKeyPolicy::AcceptNew => "accept-new",
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("exit status {}{}", exit_code_label(.code), last_line_suffix(.output))]
    Exit { code: Option<i32>, output: String },
    #[error("cancelled")]
    Cancelled { output: String },
    #[error("timed out after {}s", .elapsed.as_secs())]
    TimedOut { elapsed: Duration, output: String },
}

impl RunError {
    pub fn output(&self) -> Option<&str> {
        match self {
            RunError::Spawn { .. } => None,
            RunError::Exit { output, .. }
            | RunError::Cancelled { output }
            | RunError::TimedOut { output, .. } => Some(output.as_str()),
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

fn last_line_suffix(output: &str) -> String {
    match output.lines().rev().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => format!(": {line}"),
        None => String::new(),
    }
}

/// Runs the version-control executable and returns its combined output.
pub trait GitExecutor: Send + Sync {
    fn run(
        &self,
        cancel: &CancelToken,
        policy: HostKeyPolicy,
        args: &[OsString],
    ) -> Result<String, RunError>;
}

/// Builds `-C <path> <args...>`.
pub fn args_in(path: &Path, args: &[&str]) -> Vec<OsString> {
    let mut all = Vec::with_capacity(args.len() + 2);
    all.push(OsString::from("-C"));
    all.push(path.as_os_str().to_os_string());
    all.extend(args.iter().map(OsString::from));
    all
}

pub struct SystemGit {
    program: OsString,
    base_ssh_command: String,
    ssh_connect_timeout: Duration,
    poll_interval: Duration,
}

impl SystemGit {
    /// Layers the hardening options onto any `GIT_SSH_COMMAND` already present
    /// in the environment at construction time.
    pub fn new(settings: &GitSettings) -> Self {
        let base_ssh_command = std::env::var("GIT_SSH_COMMAND")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "ssh".to_string());
        Self::with_ssh_command(settings, base_ssh_command)
    }

    pub fn with_ssh_command(settings: &GitSettings, base_ssh_command: String) -> Self {
        Self {
            program: OsString::from(&settings.program),
            base_ssh_command,
            ssh_connect_timeout: settings.ssh_connect_timeout(),
            poll_interval: settings.poll_interval(),
        }
    }

    pub fn ssh_command(&self, policy: HostKeyPolicy) -> String {
        format!(
            "{} -o StrictHostKeyChecking={} -o BatchMode=yes -o ConnectTimeout={}",
            self.base_ssh_command,
            policy.as_ssh_value(),
            self.ssh_connect_timeout.as_secs().max(1)
        )
    }

    fn command(&self, policy: HostKeyPolicy, args: &[OsString]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_SSH_COMMAND", self.ssh_command(policy))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Waits for the output readers after the child has exited. A descendant
    /// such as an ssh control master can keep the pipes open indefinitely, so
    /// the readers are detached once the token trips or the grace period ends.
    fn await_pipes(&self, done: &Receiver<()>, mut open: usize, cancel: &CancelToken) {
        let grace_end = Instant::now() + PIPE_GRACE;
        while open > 0 {
            match done.recv_timeout(self.poll_interval) {
                Ok(()) => open -= 1,
                Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() || Instant::now() >= grace_end {
                        debug!(open, "output pipes held open after exit, detaching readers");
                        return;
                    }
                }
            }
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl GitExecutor for SystemGit {
    fn run(
        &self,
        cancel: &CancelToken,
        policy: HostKeyPolicy,
        args: &[OsString],
    ) -> Result<String, RunError> {
        let started = Instant::now();
        if let Some(reason) = cancel.reason() {
            return Err(stopped(reason, String::new(), started.elapsed()));
        }

        debug!(args = %display_args(args), policy = policy.as_ssh_value(), "running git");
        let mut child = self
            .command(policy, args)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let sink = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();
        let mut open_pipes = 0;
        if let Some(out) = child.stdout.take() {
            drain(out, Arc::clone(&sink), done_tx.clone());
            open_pipes += 1;
        }
        if let Some(err) = child.stderr.take() {
            drain(err, Arc::clone(&sink), done_tx.clone());
            open_pipes += 1;
        }
        drop(done_tx);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    kill(&mut child);
                    return Err(RunError::Spawn {
                        program: self.program_name(),
                        source,
                    });
                }
            }
            if let Some(reason) = cancel.reason() {
                kill(&mut child);
                // ssh may still hold the pipes open, so readers are left detached
                let output = snapshot(&sink);
                debug!(reason = ?reason, elapsed_ms = started.elapsed().as_millis() as u64, "git interrupted");
                return Err(stopped(reason, output, started.elapsed()));
            }
            thread::sleep(self.poll_interval);
        };

        self.await_pipes(&done_rx, open_pipes, cancel);
        let output = snapshot(&sink);
        trace!(output = %output, "git output");
        if status.success() {
            Ok(output)
        } else {
            debug!(exit_code = ?status.code(), "git failed");
            Err(RunError::Exit {
                code: status.code(),
                output,
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>, done: Sender<()>) {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(read) => {
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.extend_from_slice(&chunk[..read]);
                    }
                }
            }
        }
        let _ = done.send(());
    });
}

fn snapshot(sink: &Mutex<Vec<u8>>) -> String {
    sink.lock()
        .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn stopped(reason: CancelReason, output: String, elapsed: Duration) -> RunError {
    match reason {
        CancelReason::Cancelled => RunError::Cancelled { output },
        CancelReason::DeadlineExceeded => RunError::TimedOut { elapsed, output },
    }
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
