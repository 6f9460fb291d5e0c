use std::time::{Duration, Instant};

use log::{error, info};

use super::launcher::TargetProcess;
use super::termination::force_kill;
use crate::error::{BenchError, Result};

/// 等待被测进程发出 `"ok"`
///
/// 超时或通知通道提前关闭时，先强制结束进程再返回错误。
/// 成功时返回启动耗时。
pub async fn await_ready(
    target: &mut TargetProcess,
    timeout: Duration,
    grace: Duration,
) -> Result<Duration> {
    let started = Instant::now();
    let Some(ready) = target.take_ready() else {
        // 就绪通知已经被消费过，无法再观察到
        return Err(BenchError::NotReady {
            elapsed: Duration::ZERO,
        });
    };

    match tokio::time::timeout(timeout, ready).await {
        Ok(Ok(())) => {
            let elapsed = started.elapsed();
            info!("Server started in {}ms", elapsed.as_millis());
            Ok(elapsed)
        }
        Ok(Err(_)) => {
            let elapsed = started.elapsed();
            error!(
                "Server (PID: {}) closed its notification channel before becoming ready",
                target.pid()
            );
            force_kill(target, grace).await;
            Err(BenchError::NotReady { elapsed })
        }
        Err(_) => {
            let elapsed = started.elapsed();
            error!(
                "Server (PID: {}) not ready after {}ms, killing it",
                target.pid(),
                elapsed.as_millis()
            );
            force_kill(target, grace).await;
            Err(BenchError::StartupTimeout { elapsed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetConfig;
    use crate::services::launcher::launch;
    use crate::services::termination::terminate;
    use sysinfo::{Pid, ProcessesToUpdate, System};

    fn sh(script: &str) -> TargetConfig {
        TargetConfig::new("/bin/sh", vec!["-c".into(), script.into()], ".")
    }

    fn is_alive(pid: u32) -> bool {
        let mut sys = System::new();
        let pid = Pid::from_u32(pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        sys.process(pid).is_some()
    }

    #[tokio::test]
    async fn test_ready() {
        let mut target = launch(&sh("printf '\"ok\"\\n' >&3; exec sleep 30")).unwrap();

        let result = await_ready(&mut target, Duration::from_secs(10), Duration::from_secs(5)).await;

        assert!(result.is_ok());
        assert!(!target.has_exited());
        terminate(&mut target, Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_other_messages_ignored() {
        let script = "printf '\"starting\"\\n{\"cmd\":\"NODE_HANDLE_ACK\"}\\nnot json\\n' >&3; \
                      sleep 0.2; printf '\"ok\"\\n' >&3; exec sleep 30";
        let mut target = launch(&sh(script)).unwrap();

        let result = await_ready(&mut target, Duration::from_secs(10), Duration::from_secs(5)).await;

        assert!(result.is_ok());
        terminate(&mut target, Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_startup_timeout_kills_process() {
        let mut target = launch(&sh("printf '\"starting\"\\n' >&3; exec sleep 30")).unwrap();
        let pid = target.pid();

        let result =
            await_ready(&mut target, Duration::from_millis(300), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(BenchError::StartupTimeout { .. })));
        assert!(target.has_exited());
        drop(target);
        // 给 tokio 一点时间回收僵尸进程
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_second_wait_is_not_ready() {
        let mut target = launch(&sh("printf '\"ok\"\\n' >&3; exec sleep 30")).unwrap();
        await_ready(&mut target, Duration::from_secs(10), Duration::from_secs(5))
            .await
            .unwrap();

        let again = await_ready(&mut target, Duration::from_secs(10), Duration::from_secs(5)).await;

        assert!(matches!(
            again,
            Err(BenchError::NotReady { elapsed }) if elapsed == Duration::ZERO
        ));
        terminate(&mut target, Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_exit_before_ready() {
        let mut target = launch(&sh("exit 3")).unwrap();

        let result = await_ready(&mut target, Duration::from_secs(10), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(BenchError::NotReady { .. })));
        assert!(target.has_exited());
    }
}
