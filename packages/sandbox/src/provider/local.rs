// ABOUTME: Local sandbox provider backed by per-session temp directories
// ABOUTME: Runs commands and processes with tokio::process, loopback HTTP exposure

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    CommandOutput, ProviderError, ReadinessFault, RemoteProcess, RunningCommand, SandboxHandle,
    SandboxProvider,
};
use crate::types::{LogStream, ProcessLog, ProcessOutput, PROCESS_LOG_CAP};

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READER_DRAIN_GRACE: Duration = Duration::from_millis(500);

type Result<T> = std::result::Result<T, ProviderError>;

/// Provider that jails each session into a fresh temp directory and runs
/// its commands and processes on the host with tokio::process.
///
/// Exposure attaches a loopback URL; the routing fabric that would make it
/// publicly reachable is the deployment's concern, not this provider's.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SandboxProvider for LocalProvider {
    async fn provision(&self) -> Result<Box<dyn SandboxHandle>> {
        let root = tempfile::Builder::new()
            .prefix("forgebox-")
            .tempdir()
            .map_err(|e| ProviderError::Provision(e.to_string()))?;
        info!("Provisioned local sandbox at {:?}", root.path());
        Ok(Box::new(LocalSandbox {
            root_path: root.path().to_path_buf(),
            root: Mutex::new(Some(root)),
        }))
    }
}

struct LocalSandbox {
    root_path: PathBuf,
    // Present while the sandbox is live; taken on close.
    root: Mutex<Option<tempfile::TempDir>>,
}

impl LocalSandbox {
    async fn ensure_open(&self) -> Result<()> {
        if self.root.lock().await.is_none() {
            return Err(ProviderError::Closed);
        }
        Ok(())
    }

    /// Resolve a caller path against the sandbox root, refusing escapes.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path);
        if path.is_empty() || candidate.is_absolute() {
            return Err(ProviderError::File(format!(
                "path must be relative and non-empty: '{}'",
                path
            )));
        }
        for component in candidate.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(ProviderError::File(format!(
                        "path escapes the sandbox root: '{}'",
                        path
                    )))
                }
            }
        }
        Ok(self.root_path.join(candidate))
    }

    fn shell_command(&self, script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .current_dir(&self.root_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

#[async_trait]
impl SandboxHandle for LocalSandbox {
    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.ensure_open().await?;
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::File(e.to_string()))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| ProviderError::File(e.to_string()))?;
        debug!("Wrote {} bytes to {:?}", content.len(), target);
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.ensure_open().await?;
        let target = self.resolve(path)?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| ProviderError::File(format!("{}: {}", path, e)))
    }

    async fn exec(&self, command: &str) -> Result<Box<dyn RunningCommand>> {
        self.ensure_open().await?;
        let mut child = self
            .shell_command(command)
            .spawn()
            .map_err(|e| ProviderError::Exec(e.to_string()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        Ok(Box::new(LocalCommand {
            child,
            readers: Some((stdout_task, stderr_task)),
        }))
    }

    async fn spawn(&self, entrypoint: &str) -> Result<Box<dyn RemoteProcess>> {
        self.ensure_open().await?;
        let port = free_port()?;
        let mut command = self.shell_command(entrypoint);
        command.env("PORT", port.to_string());

        let mut child = command
            .spawn()
            .map_err(|e| ProviderError::Spawn(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| ProviderError::Spawn("process exited before tracking".to_string()))?;

        let logs: Arc<RwLock<VecDeque<ProcessLog>>> = Arc::new(RwLock::new(VecDeque::new()));
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, LogStream::Stdout, logs.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, LogStream::Stderr, logs.clone()));
        }

        info!("Spawned process {} for entrypoint '{}' (port {})", pid, entrypoint, port);
        Ok(Box::new(LocalProcess {
            pid,
            port,
            child: Mutex::new(child),
            logs,
            readers: Mutex::new(readers),
        }))
    }

    async fn close(&self) -> Result<()> {
        let taken = self.root.lock().await.take();
        match taken {
            Some(root) => {
                info!("Closing local sandbox at {:?}", self.root_path);
                root.close()
                    .map_err(|e| ProviderError::Provision(e.to_string()))
            }
            None => Ok(()),
        }
    }
}

struct LocalCommand {
    child: Child,
    readers: Option<(JoinHandle<Vec<u8>>, JoinHandle<Vec<u8>>)>,
}

#[async_trait]
impl RunningCommand for LocalCommand {
    async fn wait(&mut self) -> Result<CommandOutput> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ProviderError::Exec(e.to_string()))?;
        let (stdout, stderr) = match self.readers.take() {
            Some((out, err)) => (
                out.await.unwrap_or_default(),
                err.await.unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    async fn kill(&mut self) -> Result<()> {
        kill_group(&mut self.child);
        if let Err(e) = self.child.start_kill() {
            debug!("start_kill on finished command: {}", e);
        }
        let _ = self
            .child
            .wait()
            .await
            .map_err(|e| ProviderError::Kill(e.to_string()))?;
        // Readers can hang on pipes inherited by orphaned grandchildren.
        if let Some((out, err)) = self.readers.take() {
            out.abort();
            err.abort();
        }
        Ok(())
    }
}

struct LocalProcess {
    pid: u32,
    port: u16,
    child: Mutex<Child>,
    logs: Arc<RwLock<VecDeque<ProcessLog>>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

#[async_trait]
impl RemoteProcess for LocalProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait_http_ready(&self) -> std::result::Result<(), ReadinessFault> {
        let addr: SocketAddr = ([127, 0, 0, 1], self.port).into();
        loop {
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                return Ok(());
            }
            let exited = self.child.lock().await.try_wait().ok().flatten();
            if let Some(status) = exited {
                self.drain_readers().await;
                return Err(ReadinessFault {
                    reason: format!(
                        "process exited with {} before accepting connections",
                        status
                    ),
                });
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    async fn expose(&self) -> Result<String> {
        Ok(format!("http://localhost:{}", self.port))
    }

    async fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        kill_group(&mut child);
        if let Err(e) = child.start_kill() {
            debug!("start_kill on finished process {}: {}", self.pid, e);
        }
        let _ = child
            .wait()
            .await
            .map_err(|e| ProviderError::Kill(e.to_string()))?;
        drop(child);
        self.drain_readers().await;
        info!("Killed process {}", self.pid);
        Ok(())
    }

    async fn output(&self) -> ProcessOutput {
        let logs = self.logs.read().await;
        let mut output = ProcessOutput::default();
        for entry in logs.iter() {
            let buffer = match entry.stream {
                LogStream::Stdout => &mut output.stdout,
                LogStream::Stderr => &mut output.stderr,
            };
            buffer.push_str(&entry.line);
            buffer.push('\n');
        }
        output
    }
}

impl LocalProcess {
    /// Let the line readers flush once the process is dead, so diagnostics
    /// contain everything the process wrote. Bounded: orphaned grandchildren
    /// can keep the pipes open forever.
    async fn drain_readers(&self) {
        let mut readers = self.readers.lock().await;
        for mut task in readers.drain(..) {
            if tokio::time::timeout(READER_DRAIN_GRACE, &mut task).await.is_err() {
                task.abort();
                warn!("Output reader for process {} did not drain in time", self.pid);
            }
        }
    }
}

fn spawn_line_reader<R>(
    pipe: R,
    stream: LogStream,
    logs: Arc<RwLock<VecDeque<ProcessLog>>>,
) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let reader = BufReader::new(pipe);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut logs = logs.write().await;
            logs.push_back(ProcessLog {
                timestamp: Utc::now(),
                stream,
                line,
            });
            if logs.len() > PROCESS_LOG_CAP {
                logs.pop_front();
            }
        }
    })
}

/// Reserve an ephemeral loopback port for a process to bind.
fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| ProviderError::Spawn(format!("no free port: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| ProviderError::Spawn(e.to_string()))?
        .port();
    Ok(port)
}

/// Terminate the process group so grandchildren spawned by the shell do not
/// outlive the tracked process.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                debug!("killpg({}) failed: {}", pid, e);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child;
    }
}
