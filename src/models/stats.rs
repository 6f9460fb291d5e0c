use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// 单次内存采样（字节）
///
/// 读取失败的字段为 `None`，序列化为 `null`，与真实的 0 区分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySample {
    /// 常驻内存 (VmRSS)
    pub rss: Option<u64>,
    /// 数据段大小 (VmData)，近似堆使用量
    pub heap_used: Option<u64>,
    /// 虚拟内存总量 (VmSize)
    pub vm_size: Option<u64>,
}

impl MemorySample {
    /// 仅有 RSS 的采样（ps 后备路径）
    pub fn rss_only(rss: u64) -> Self {
        Self {
            rss: Some(rss),
            heap_used: None,
            vm_size: None,
        }
    }

    /// 是否一个字段都没有读到
    pub fn is_empty(&self) -> bool {
        self.rss.is_none() && self.heap_used.is_none() && self.vm_size.is_none()
    }
}

/// 一个测量周期的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResult {
    pub timestamp: String,
    pub memory: MemorySample,
}

impl MeasurementResult {
    pub fn now(memory: MemorySample) -> Self {
        Self {
            timestamp: iso_timestamp(Utc::now()),
            memory,
        }
    }
}

/// 聚合后的内存数据，缺失字段已按 0 计入
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMemory {
    pub rss: u64,
    pub heap_used: u64,
    pub vm_size: u64,
}

/// 最终输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// 聚合时间，而不是任何一次采样的时间
    pub timestamp: String,
    pub memory: AggregateMemory,
}

/// UTC，毫秒精度，`Z` 结尾
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
