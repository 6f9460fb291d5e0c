use std::io::Write;

use anyhow::Context;
use chrono::Utc;
use log::info;

use crate::error::{BenchError, Result};
use crate::models::stats::iso_timestamp;
use crate::models::{AggregateMemory, AggregateResult, MeasurementResult};
use crate::services::Sampler;

/// 依次执行 `sample_count` 个周期并聚合
///
/// 任何一个周期失败都会立即中止，不产生部分结果
pub async fn run<S: Sampler>(sampler: &mut S, sample_count: usize) -> Result<AggregateResult> {
    let mut results = Vec::with_capacity(sample_count);
    for cycle in 1..=sample_count {
        info!("📏 Measuring sample {}/{}", cycle, sample_count);
        results.push(sampler.sample().await?);
    }
    Ok(aggregate(&results))
}

/// 各字段取算术平均并四舍五入，缺失的字段按 0 计入
pub fn aggregate(results: &[MeasurementResult]) -> AggregateResult {
    let mean = |field: fn(&MeasurementResult) -> Option<u64>| -> u64 {
        let n = results.len() as u128;
        if n == 0 {
            return 0;
        }
        let sum: u128 = results.iter().map(|r| field(r).unwrap_or(0) as u128).sum();
        ((sum + n / 2) / n) as u64
    };

    AggregateResult {
        timestamp: iso_timestamp(Utc::now()),
        memory: AggregateMemory {
            rss: mean(|r| r.memory.rss),
            heap_used: mean(|r| r.memory.heap_used),
            vm_size: mean(|r| r.memory.vm_size),
        },
    }
}

/// 错误文档 `{"error": ..., "timestamp": ...}`
pub fn error_document(err: &BenchError) -> serde_json::Value {
    serde_json::json!({
        "error": err.to_string(),
        "timestamp": iso_timestamp(Utc::now()),
    })
}

/// 以 2 空格缩进输出聚合结果
pub fn emit_result(out: &mut impl Write, result: &AggregateResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    writeln!(out, "{}", json).context("Failed to write result")?;
    Ok(())
}

pub fn emit_error(out: &mut impl Write, err: &BenchError) -> anyhow::Result<()> {
    writeln!(out, "{}", error_document(err)).context("Failed to write error document")?;
    Ok(())
}
