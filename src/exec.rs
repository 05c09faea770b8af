// Service Admin - Helper Execution
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Running external helpers with a bounded wait.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{HelperFailure, Result, ServiceError};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A helper invocation. The child starts from an empty environment and only
/// sees the variables listed in `env`.
#[derive(Debug, Clone)]
pub struct HelperCommand {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
}

/// What a finished helper printed, plus its exit status.
#[derive(Debug)]
pub struct HelperOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl HelperCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Command line for messages.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Run to completion or until `timeout` elapses, returning whatever
    /// exit status the helper produced.
    pub fn run(&self, timeout: Duration) -> Result<HelperOutput> {
        let command = self.display();
        debug!("Running helper: {}", command);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ServiceError::HelperSpawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("Helper timed out after {:?}: {}", timeout, command);
                    stop(&mut child, &command);
                    return Err(ServiceError::HelperExecutionFailed {
                        command,
                        failure: HelperFailure::Timeout(timeout),
                        stderr: String::new(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    stop(&mut child, &command);
                    return Err(ServiceError::HelperWait { command, source });
                }
            }
        };

        // A grandchild may inherit the pipes and keep them open, so output
        // is only collected until the deadline.
        let stdout = collect(stdout, deadline, &command);
        let stderr = collect(stderr, deadline, &command);

        Ok(HelperOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Like [`run`](Self::run), but a nonzero exit is an error.
    pub fn run_checked(&self, timeout: Duration) -> Result<HelperOutput> {
        let output = self.run(timeout)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(self.failure(output))
    }

    /// Error describing an unsuccessful run.
    pub fn failure(&self, output: HelperOutput) -> ServiceError {
        let failure = match output.status.code() {
            Some(code) => HelperFailure::ExitCode(code),
            None => HelperFailure::Signal,
        };
        warn!("Helper {}: {}", failure, self.display());
        ServiceError::HelperExecutionFailed {
            command: self.display(),
            failure,
            stderr: output.stderr,
        }
    }
}

/// Kill a helper that overran. A kill refused by the kernel (a setuid child
/// such as pkexec) leaves it running; waiting on it would block.
fn stop(child: &mut Child, command: &str) {
    match child.kill() {
        Ok(()) => {
            let _ = child.wait();
        }
        Err(e) => warn!("Could not kill helper {}: {}", command, e),
    }
}

/// Forward everything read from `pipe` in chunks; the channel disconnects at EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant, command: &str) -> String {
    let Some(rx) = reader else {
        return String::new();
    };

    let mut out = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => out.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("Output of {} still open at deadline, returning what arrived", command);
                break;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
