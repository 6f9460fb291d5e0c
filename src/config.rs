use std::path::PathBuf;
use std::time::Duration;

use crate::models::TargetConfig;

/// 采样次数
pub const SAMPLE_COUNT: usize = 3;
/// 等待服务就绪的超时时间
pub const STARTUP_TIMEOUT: Duration = Duration::from_millis(120_000);
/// 就绪后等待内存稳定的时间
pub const SETTLE_DURATION: Duration = Duration::from_millis(10_000);
/// SIGTERM 之后等待退出的时间，超时则 SIGKILL
pub const GRACE_PERIOD: Duration = Duration::from_millis(10_000);

/// 测量参数，构造后不可变
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub sample_count: usize,
    pub startup_timeout: Duration,
    pub settle_duration: Duration,
    pub grace_period: Duration,
    /// procfs 挂载点
    pub proc_root: PathBuf,
    /// 读取 /proc 失败时使用的 ps 程序
    pub ps_program: PathBuf,
    pub target: TargetConfig,
}

impl BenchConfig {
    pub fn new(target: TargetConfig) -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            startup_timeout: STARTUP_TIMEOUT,
            settle_duration: SETTLE_DURATION,
            grace_period: GRACE_PERIOD,
            proc_root: PathBuf::from("/proc"),
            ps_program: PathBuf::from("ps"),
            target,
        }
    }
}
