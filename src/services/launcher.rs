use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::dup2;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::UnixStream;
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{BenchError, Result};
use crate::models::TargetConfig;

/// 子进程中通知通道所在的文件描述符
pub const CHANNEL_FD: RawFd = 3;

/// 就绪消息
pub const READY_MESSAGE: &str = "ok";

/// 已启动的被测进程，只属于一个测量周期
pub struct TargetProcess {
    pid: u32,
    ready: Option<oneshot::Receiver<()>>,
    exited: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TargetProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// 取出就绪通知的接收端，只能取一次
    pub fn take_ready(&mut self) -> Option<oneshot::Receiver<()>> {
        self.ready.take()
    }

    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// 在 `limit` 内等待进程退出，返回是否已退出
    pub async fn wait_exit(&mut self, limit: Duration) -> bool {
        // 收到退出通知或发送端已关闭都算已退出，只有超时返回 false
        tokio::time::timeout(limit, self.exited.wait_for(|done| *done))
            .await
            .is_ok()
    }
}

impl Drop for TargetProcess {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// 启动被测进程
///
/// stdout / stderr 逐行转发到日志，fd 3 上是 JSON 行格式的通知通道
/// （与 Node.js `fork()` 的 IPC 约定一致）
pub fn launch(config: &TargetConfig) -> Result<TargetProcess> {
    let (parent_end, child_end) = StdUnixStream::pair()?;
    parent_end.set_nonblocking(true)?;
    let channel = UnixStream::from_std(parent_end)?;
    let child_fd = child_end.as_raw_fd();

    let mut command = Command::new(&config.program);
    command
        .args(config.command_args())
        .current_dir(&config.cwd)
        .env("NODE_CHANNEL_FD", CHANNEL_FD.to_string())
        .env("NODE_CHANNEL_SERIALIZATION_MODE", "json")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &config.env {
        command.env(key, value);
    }

    // SAFETY: 只调用 dup2 / fcntl，二者都是 async-signal-safe
    unsafe {
        command.pre_exec(move || install_channel(child_fd));
    }

    let mut child = command.spawn().map_err(|source| BenchError::Launch {
        program: config.program.clone(),
        source,
    })?;
    // 父进程关闭子端，子进程退出时才能读到 EOF
    drop(child_end);

    let pid = child.id().ok_or_else(|| BenchError::Launch {
        program: config.program.clone(),
        source: std::io::Error::other("process exited before its pid was observed"),
    })?;
    info!("🚀 Spawned {} (PID: {})", config.program, pid);

    let mut tasks = Vec::with_capacity(4);
    if let Some(stdout) = child.stdout.take() {
        tasks.push(relay_lines(stdout, "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        tasks.push(relay_lines(stderr, "stderr"));
    }

    let (ready_tx, ready_rx) = oneshot::channel();
    tasks.push(tokio::spawn(watch_notifications(channel, ready_tx)));

    let (exit_tx, exit_rx) = watch::channel(false);
    tasks.push(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!("Server process {} exited: {}", pid, status),
            Err(e) => warn!("Failed to wait for server process {}: {}", pid, e),
        }
        let _ = exit_tx.send(true);
    }));

    Ok(TargetProcess {
        pid,
        ready: Some(ready_rx),
        exited: exit_rx,
        tasks,
    })
}

/// 在子进程中把通知通道放到 CHANNEL_FD 上，并清除 close-on-exec
fn install_channel(fd: RawFd) -> std::io::Result<()> {
    if fd == CHANNEL_FD {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
    } else {
        dup2(fd, CHANNEL_FD)?;
    }
    Ok(())
}

fn relay_lines<R>(stream: R, origin: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    info!("[server {}] {}", origin, line.trim_end_matches(['\r', '\n']));
                }
                Err(e) => {
                    warn!("Failed to read server {}: {}", origin, e);
                    break;
                }
            }
        }
    })
}

/// 一行是否是就绪消息；其他内容（非 JSON、对象、其他字符串）都忽略
pub fn is_ready_message(line: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(line.trim()),
        Ok(serde_json::Value::String(ref s)) if s == READY_MESSAGE
    )
}

async fn watch_notifications(channel: UnixStream, ready_tx: oneshot::Sender<()>) {
    let mut ready_tx = Some(ready_tx);
    let mut reader = BufReader::new(channel);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if is_ready_message(&line) {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                } else {
                    debug!("Ignoring server message: {}", line.trim_end());
                }
            }
            Err(e) => {
                warn!("Notification channel read failed: {}", e);
                break;
            }
        }
    }
    // ready_tx 在这里被丢弃，接收端会看到通道关闭
}
