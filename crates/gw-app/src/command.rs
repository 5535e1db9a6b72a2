//! External command capability (the groundwater-flow solver).
//!
//! The pipeline only sees [`CommandRunner`]; tests substitute a scripted
//! runner so no real process is spawned.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Case-insensitive markers of a failed solver run in captured output.
pub const DIAGNOSTIC_KEYWORDS: [&str; 8] = [
    "error",
    "infinity",
    "overflow",
    "exception",
    "divide by zero",
    "segmentation fault",
    "sigsegv",
    "can't find",
];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_s: Option<f64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout_s: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner {
    fn run(&self, cmd: &CommandSpec) -> AppResult<CommandOutput>;
}

/// Runs commands with `std::process`, optionally bounded by a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, cmd: &CommandSpec) -> AppResult<CommandOutput> {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(program = %cmd.program, args = ?cmd.args, "Starting external command");
        let mut child = command.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AppError::ExecutableNotFound {
                    program: cmd.program.clone(),
                }
            } else {
                AppError::Spawn {
                    program: cmd.program.clone(),
                    source,
                }
            }
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(limit) = cmd.timeout_s
                && started.elapsed().as_secs_f64() > limit
            {
                let _ = child.kill();
                let _ = child.wait();
                tracing::error!(program = %cmd.program, timeout_s = limit, "External command timed out");
                return Err(AppError::Timeout {
                    program: cmd.program.clone(),
                    timeout_s: limit,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = CommandOutput {
            exit_code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };
        tracing::debug!(
            program = %cmd.program,
            exit_code = ?output.exit_code,
            elapsed_s = started.elapsed().as_secs_f64(),
            "External command finished"
        );
        Ok(output)
    }
}

/// Reject a run whose exit status, stderr or stdout signals a failure.
pub fn check_command_output(cmd: &CommandSpec, output: &CommandOutput) -> AppResult<()> {
    let program = cmd.program.clone();
    if output.exit_code != Some(0) {
        tracing::error!(%program, code = ?output.exit_code, stdout = %output.stdout, "External command failed");
        return Err(AppError::NonZeroExit {
            program,
            code: output.exit_code,
            stdout: output.stdout.clone(),
        });
    }
    let lowered = output.stdout.to_lowercase();
    if let Some(keyword) = DIAGNOSTIC_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        tracing::error!(%program, keyword, stdout = %output.stdout, "Diagnostic keyword in command output");
        return Err(AppError::DiagnosticKeyword {
            program,
            keyword: keyword.to_string(),
            stdout: output.stdout.clone(),
        });
    }
    if !output.stderr.trim().is_empty() {
        tracing::error!(%program, stderr = %output.stderr, "External command wrote to stderr");
        return Err(AppError::Stderr {
            program,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(())
}
