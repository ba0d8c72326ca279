//! Async command execution with timeout support
//!
//! Provides a unified interface for running external tools with:
//! - Configurable timeouts
//! - Combined stdout/stderr capture in arrival order
//! - Tail-preserving truncation for large build logs
//! - Optional live echo of tool output
//! - Working directory control

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::BuildError;

/// Maximum captured output before the oldest lines are dropped (in bytes)
const MAX_OUTPUT_SIZE: usize = 1_000_000; // 1MB

/// Marker placed where earlier output was dropped
const TRUNCATION_MARKER: &str = "... [earlier output truncated] ...\n";

/// How long to wait for output pipes to drain after the child exits
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Drain window after a timed out child was killed
const KILLED_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Options for async command execution
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Working directory for the command
    pub working_dir: Option<std::path::PathBuf>,
    /// Environment variables to set
    pub env: HashMap<String, String>,
    /// Timeout duration (None = no timeout)
    pub timeout: Option<Duration>,
    /// Echo each output line to stderr as it arrives
    pub stream: bool,
    /// Maximum output size before truncation
    pub max_output_size: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            working_dir: None,
            env: HashMap::new(),
            timeout: None,
            stream: false,
            max_output_size: MAX_OUTPUT_SIZE,
        }
    }
}

impl ExecOptions {
    /// Create options with a working directory
    pub fn in_dir(dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout if one is given
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Echo output while capturing it
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set maximum output size
    pub fn with_max_output(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }
}

/// Result of async command execution
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code if available (None when killed by a signal)
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr (may be truncated at the front)
    pub output: String,
    /// Whether earlier output was dropped
    pub truncated: bool,
    /// Duration of execution
    pub duration: Duration,
}

/// Render a program and its arguments as a single display string
pub fn render_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut command = program.to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg.as_ref());
    }
    command
}

/// Execute a command asynchronously with timeout support
///
/// On Unix the child leads a new process group. Dropping the returned
/// future or hitting the timeout kills that whole group, so compilers and
/// shells started by the tool do not outlive it.
///
/// # Errors
/// * `BuildError::ToolNotFound` - If the program does not exist
/// * `BuildError::SpawnFailed` - If the program exists but could not be started
/// * `BuildError::Timeout` - If the command did not finish in time
pub async fn exec_command<S: AsRef<str>>(
    program: &str,
    args: &[S],
    options: &ExecOptions,
) -> Result<ExecResult, BuildError> {
    let start = Instant::now();
    let command_str = render_command(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|a| a.as_ref()));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(ref dir) = options.working_dir {
        cmd.current_dir(dir);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    tracing::debug!("Executing async: {}", command_str);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BuildError::ToolNotFound {
                program: program.to_string(),
                command: command_str.clone(),
            }
        } else {
            BuildError::SpawnFailed {
                command: command_str.clone(),
                error: e.to_string(),
            }
        }
    })?;

    let mut tree = ProcessTree::new(child.id());

    let (tx, rx) = mpsc::unbounded_channel();
    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
    }
    drop(tx);

    let collector = tokio::spawn(collect_output(rx, options.max_output_size, options.stream));

    let status = match options.timeout {
        Some(limit) => match timeout(limit, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                tracing::warn!("Command timed out after {:?}: {}", limit, command_str);
                tree.kill();
                if let Err(e) = child.start_kill() {
                    tracing::debug!("Direct kill after group kill failed: {}", e);
                }
                let _ = child.wait().await;
                None
            }
        },
        None => Some(child.wait().await?),
    };

    if status.is_some() {
        // Background jobs left in the group would keep the pipes open
        #[cfg(unix)]
        tree.kill();
        // A reaped Windows PID may be reused, so never signal it afterwards
        #[cfg(not(unix))]
        tree.release();
    }

    // Grandchildren may keep the pipes open after the direct child exits
    let grace = if status.is_some() {
        DRAIN_GRACE
    } else {
        KILLED_DRAIN_GRACE
    };
    for reader in readers {
        let abort = reader.abort_handle();
        if timeout(grace, reader).await.is_err() {
            tracing::debug!("Output pipe still open after exit, detaching reader");
            abort.abort();
        }
    }

    let captured = collector
        .await
        .map_err(|e| BuildError::Io(std::io::Error::other(format!("output task failed: {}", e))))?;

    let duration = start.elapsed();

    match status {
        Some(status) => Ok(ExecResult {
            success: status.success(),
            exit_code: status.code(),
            output: captured.text,
            truncated: captured.truncated,
            duration,
        }),
        None => Err(BuildError::Timeout {
            command: command_str,
            timeout_secs: options.timeout.map(|d| d.as_secs()).unwrap_or_default(),
            output: captured.text,
        }),
    }
}

/// Every process started on behalf of one tool invocation
///
/// Killed when dropped, which covers cancellation of the future that owns it.
struct ProcessTree {
    pid: Option<u32>,
}

impl ProcessTree {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn kill(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_tree(pid);
        }
    }

    #[cfg(not(unix))]
    fn release(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessTree {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_tree(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("Failed to kill process group {}: {}", pgid, err);
        }
    }
}

#[cfg(windows)]
fn kill_tree(pid: u32) {
    let result = std::process::Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        tracing::warn!("Failed to kill process tree {}: {}", pid, e);
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(_pid: u32) {}

/// Forward lines from a child pipe into the shared channel
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut buf_reader = BufReader::new(reader);
    // Reuse line buffer across iterations
    let mut line = Vec::with_capacity(4096);

    loop {
        line.clear();
        match buf_reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                // Build tools do not always emit valid UTF-8
                let mut text = String::from_utf8_lossy(&line).into_owned();
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                if tx.send(text).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Error reading output: {}", e);
                break;
            }
        }
    }
}

/// Captured output after the channel closes
struct CapturedOutput {
    text: String,
    truncated: bool,
}

/// Collect lines in arrival order, keeping the most recent `max_size` bytes
async fn collect_output(
    mut rx: mpsc::UnboundedReceiver<String>,
    max_size: usize,
    echo: bool,
) -> CapturedOutput {
    let mut lines: VecDeque<String> = VecDeque::new();
    let mut size = 0usize;
    let mut truncated = false;

    while let Some(line) = rx.recv().await {
        if echo {
            eprint!("{}", line);
        }
        size += line.len();
        lines.push_back(line);
        while size > max_size {
            match lines.pop_front() {
                Some(dropped) => {
                    size -= dropped.len();
                    truncated = true;
                }
                None => break,
            }
        }
    }

    let mut text = String::with_capacity(size + TRUNCATION_MARKER.len());
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    for line in lines {
        text.push_str(&line);
    }

    CapturedOutput { text, truncated }
}

/// Whether a program name refers to a path rather than a PATH lookup
pub fn is_path_like(program: &str) -> bool {
    program.contains('/') || program.contains('\\') || Path::new(program).is_absolute()
}
