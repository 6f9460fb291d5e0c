use std::time::Duration;

use log::{debug, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use super::launcher::TargetProcess;

/// 进程是如何结束的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 发送信号前已经退出
    AlreadyExited,
    /// SIGTERM 后在宽限期内退出
    Graceful,
    /// 超过宽限期，已发送 SIGKILL
    Forced,
}

/// 先 SIGTERM，宽限期内未退出则 SIGKILL
///
/// 发出 SIGKILL 后直接返回，不等待回收
pub async fn terminate(target: &mut TargetProcess, grace: Duration) -> Termination {
    if target.has_exited() {
        debug!("Server process {} already exited", target.pid());
        return Termination::AlreadyExited;
    }

    send_signal(target.pid(), Signal::SIGTERM);

    if target.wait_exit(grace).await {
        info!("✓ Server process {} stopped", target.pid());
        return Termination::Graceful;
    }

    warn!(
        "Server process {} did not exit within {}ms, sending SIGKILL",
        target.pid(),
        grace.as_millis()
    );
    send_signal(target.pid(), Signal::SIGKILL);
    Termination::Forced
}

/// 直接 SIGKILL，并在 `wait` 内等待退出通知
pub async fn force_kill(target: &mut TargetProcess, wait: Duration) -> bool {
    if target.has_exited() {
        return true;
    }
    send_signal(target.pid(), Signal::SIGKILL);
    let exited = target.wait_exit(wait).await;
    if !exited {
        warn!("Server process {} still running after SIGKILL", target.pid());
    }
    exited
}

fn send_signal(pid: u32, signal: Signal) {
    debug!("Sending {} to PID {}", signal, pid);
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        warn!("Failed to send {} to PID {}: {}", signal, pid, e);
    }
}
