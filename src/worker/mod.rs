//! Worker process plumbing.
//!
//! Config::from_lookup -> Config { root, interpreter }
//! Worker trait: execute(subject, payload) -> payload
//! ProcessWorker: `<interpreter...> <root>/mm.py <subject>` over piped stdio.
//!
use anyhow::{Context, Result, bail};
use shell_words::split as shell_split;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::cmd::subject::Subject;
use crate::{log_debug, log_trace, log_warn};

/// Required: directory holding the worker script.
pub const ROOT_ENV: &str = "MM_ROOT";
/// Optional: interpreter command line used to run the worker script.
pub const INTERPRETER_ENV: &str = "MM_PYTHON";
pub const DEFAULT_INTERPRETER: &str = "python";
pub const SCRIPT_NAME: &str = "mm.py";

/// Interpreter program plus any leading arguments (e.g. `python3 -u`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            program: DEFAULT_INTERPRETER.to_string(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Split an interpreter command line with shell-style rules.
///
/// - "python3"           -> program "python3"
/// - "python3 -u"        -> program "python3", args ["-u"]
/// - "'/opt/py 3/python'" -> program "/opt/py 3/python"
pub fn parse_interpreter(raw: &str) -> Result<Interpreter> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Interpreter command is empty");
    }
    let parts =
        shell_split(trimmed).context("Failed to parse interpreter command (shell splitting)")?;
    let Some((program, args)) = parts.split_first() else {
        bail!("No tokens produced when parsing interpreter command");
    };
    if program.is_empty() {
        bail!("Empty program name in interpreter command");
    }
    Ok(Interpreter {
        program: program.clone(),
        args: args.to_vec(),
    })
}

/// Resolved worker configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub interpreter: Interpreter,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// `Ok(None)` means `MM_ROOT` is unset or blank; the caller reports that
    /// to the user. A malformed `MM_PYTHON` is an error.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(root) = lookup(ROOT_ENV).filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let interpreter = match lookup(INTERPRETER_ENV) {
            Some(raw) => parse_interpreter(&raw)
                .with_context(|| format!("Invalid {INTERPRETER_ENV} value: '{raw}'"))?,
            None => Interpreter::default(),
        };
        Ok(Some(Self {
            root: PathBuf::from(root),
            interpreter,
        }))
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_NAME)
    }
}

/// Something that runs a worker subcommand: payload in, payload out.
pub trait Worker {
    fn execute(&self, subject: Subject, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Runs the worker script as a child process, one process per call.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    config: Config,
    show_stderr: bool,
}

impl ProcessWorker {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_stderr: false,
        }
    }

    /// Let the worker's stderr through to ours (suppressed by default).
    pub fn show_stderr(mut self, show: bool) -> Self {
        self.show_stderr = show;
        self
    }

    fn describe(&self, subject: Subject) -> String {
        format!(
            "{} {} {}",
            self.config.interpreter,
            self.config.script_path().display(),
            subject
        )
    }

    async fn execute_async(&self, subject: Subject, payload: &[u8]) -> Result<Vec<u8>> {
        let interpreter = &self.config.interpreter;
        let started = Instant::now();
        log_trace!("spawning worker: {}", self.describe(subject));

        let mut child = Command::new(&interpreter.program)
            .args(&interpreter.args)
            .arg(self.config.script_path())
            .arg(subject.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if self.show_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn worker: {}", self.describe(subject)))?;

        let mut stdin = child
            .stdin
            .take()
            .context("worker stdin was not captured")?;
        let mut stdout = child
            .stdout
            .take()
            .context("worker stdout was not captured")?;

        // Write and read concurrently: a large payload can fill the pipe
        // before the worker starts producing output.
        let write = async move {
            match stdin.write_all(payload).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    log_warn!("worker closed stdin before reading the whole payload");
                    return Ok(());
                }
                Err(e) => return Err(e).context("Failed to write payload to worker stdin"),
            }
            // Dropping the handle closes the pipe, signalling end of input.
            drop(stdin);
            Ok::<(), anyhow::Error>(())
        };
        let read = async move {
            let mut buf = Vec::new();
            stdout
                .read_to_end(&mut buf)
                .await
                .context("Failed to read worker stdout")?;
            Ok::<Vec<u8>, anyhow::Error>(buf)
        };
        let ((), output) = tokio::try_join!(write, read)?;

        let status = child
            .wait()
            .await
            .context("Failed to wait for worker process")?;
        if !status.success() {
            bail!("worker `{}` exited with {status}", self.describe(subject));
        }

        log_debug!(
            "worker {subject} finished in {} ms ({} bytes out)",
            started.elapsed().as_millis(),
            output.len()
        );
        Ok(output)
    }
}

impl Worker for ProcessWorker {
    /// Synchronous wrapper: builds a temporary Tokio runtime and blocks on the
    /// spawn / write / read / wait sequence.
    fn execute(&self, subject: Subject, payload: &[u8]) -> Result<Vec<u8>> {
        let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        rt.block_on(self.execute_async(subject, payload))
    }
}
