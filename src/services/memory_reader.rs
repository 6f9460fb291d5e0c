use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use tokio::process::Command;

use crate::error::{BenchError, Result};
use crate::models::MemorySample;

lazy_static! {
    static ref VM_RSS: Regex = Regex::new(r"VmRSS:\s+(\d+)\s+kB").unwrap();
    static ref VM_DATA: Regex = Regex::new(r"VmData:\s+(\d+)\s+kB").unwrap();
    static ref VM_SIZE: Regex = Regex::new(r"VmSize:\s+(\d+)\s+kB").unwrap();
}

/// 读取进程内存占用
///
/// 优先读取 `<proc_root>/<pid>/status`，失败时退回 `ps -o rss=`
pub struct MemoryReader {
    proc_root: PathBuf,
    ps_program: PathBuf,
}

impl MemoryReader {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            ps_program: PathBuf::from("ps"),
        }
    }

    /// 替换后备路径使用的 ps 程序
    pub fn with_ps_program(mut self, ps_program: impl Into<PathBuf>) -> Self {
        self.ps_program = ps_program.into();
        self
    }

    pub async fn read_memory(&self, pid: u32) -> Result<MemorySample> {
        let status_path = self.proc_root.join(pid.to_string()).join("status");

        match read_status(&status_path).await {
            Ok(sample) => {
                debug!("Read memory of PID {} from {}", pid, status_path.display());
                Ok(sample)
            }
            Err(e) => {
                warn!("Could not read {}: {}", status_path.display(), e);
                read_ps(&self.ps_program, pid).await
            }
        }
    }
}

impl Default for MemoryReader {
    fn default() -> Self {
        Self::new("/proc")
    }
}

async fn read_status(path: &Path) -> std::io::Result<MemorySample> {
    let text = tokio::fs::read_to_string(path).await?;
    let sample = parse_status(&text);
    if sample.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "no VmRSS/VmData/VmSize fields",
        ));
    }
    Ok(sample)
}

/// 解析 status 文件内容，单位 kB 转为字节；缺失的字段为 None
pub fn parse_status(text: &str) -> MemorySample {
    MemorySample {
        rss: capture_kb(&VM_RSS, text),
        heap_used: capture_kb(&VM_DATA, text),
        vm_size: capture_kb(&VM_SIZE, text),
    }
}

fn capture_kb(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text)
        .and_then(|c| c[1].parse::<u64>().ok())
        .and_then(|kb| kb.checked_mul(1024))
}

async fn read_ps(ps_program: &Path, pid: u32) -> Result<MemorySample> {
    let failed = |reason: String| BenchError::MemoryRead {
        pid,
        reason: format!("Failed to get memory usage via ps command: {}", reason),
    };

    let output = Command::new(ps_program)
        .args(["-o", "rss=", "-p", &pid.to_string()])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        return Err(failed(format!("ps exited with {}", output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rss = parse_ps_output(&stdout)
        .ok_or_else(|| failed(format!("unexpected output {:?}", stdout.trim())))?;
    Ok(MemorySample::rss_only(rss))
}

/// `ps -o rss=` 的输出（kB）转为字节
pub fn parse_ps_output(output: &str) -> Option<u64> {
    output
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|kb| kb.checked_mul(1024))
}
