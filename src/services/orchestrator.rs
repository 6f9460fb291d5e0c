use log::{debug, info, warn};

use super::launcher::launch;
use super::memory_reader::MemoryReader;
use super::readiness::await_ready;
use super::termination::{terminate, Termination};
use crate::config::BenchConfig;
use crate::error::Result;
use crate::models::MeasurementResult;

/// 单个测量周期的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Launching,
    AwaitingReady,
    Settling,
    Sampling,
    Terminating,
    Done,
    Failed,
}

/// 产生一次测量结果
pub trait Sampler {
    async fn sample(&mut self) -> Result<MeasurementResult>;
}

/// 驱动完整的测量周期：启动 → 等待就绪 → 稳定 → 采样 → 终止
pub struct SampleOrchestrator {
    config: BenchConfig,
    reader: MemoryReader,
    cycle: usize,
    /// 当前或最近一个周期的被测进程
    pid: Option<u32>,
}

impl SampleOrchestrator {
    pub fn new(config: BenchConfig) -> Self {
        let reader = MemoryReader::new(config.proc_root.clone())
            .with_ps_program(config.ps_program.clone());
        Self {
            config,
            reader,
            cycle: 0,
            pid: None,
        }
    }

    #[cfg(test)]
    fn cycles(&self) -> usize {
        self.cycle
    }

    #[cfg(test)]
    fn last_pid(&self) -> Option<u32> {
        self.pid
    }

    fn enter(&self, state: CycleState) {
        match self.pid {
            Some(pid) => debug!("cycle {} (PID: {}): {:?}", self.cycle, pid, state),
            None => debug!("cycle {}: {:?}", self.cycle, state),
        }
    }

    pub async fn run_cycle(&mut self) -> Result<MeasurementResult> {
        self.cycle += 1;
        self.pid = None;

        self.enter(CycleState::Launching);
        let mut target = match launch(&self.config.target) {
            Ok(target) => target,
            Err(e) => {
                self.enter(CycleState::Failed);
                return Err(e);
            }
        };
        self.pid = Some(target.pid());

        self.enter(CycleState::AwaitingReady);
        if let Err(e) = await_ready(
            &mut target,
            self.config.startup_timeout,
            self.config.grace_period,
        )
        .await
        {
            self.enter(CycleState::Failed);
            return Err(e);
        }

        self.enter(CycleState::Settling);
        tokio::time::sleep(self.config.settle_duration).await;

        self.enter(CycleState::Sampling);
        let sample = self
            .reader
            .read_memory(target.pid())
            .await
            .map(MeasurementResult::now);

        // 不论采样是否成功都要结束进程
        self.enter(CycleState::Terminating);
        if terminate(&mut target, self.config.grace_period).await == Termination::Forced {
            warn!("cycle {}: server had to be killed", self.cycle);
        }

        match sample {
            Ok(result) => {
                self.enter(CycleState::Done);
                info!(
                    "cycle {}: rss={:?} heapUsed={:?} vmSize={:?}",
                    self.cycle, result.memory.rss, result.memory.heap_used, result.memory.vm_size
                );
                Ok(result)
            }
            Err(e) => {
                self.enter(CycleState::Failed);
                Err(e)
            }
        }
    }
}

impl Sampler for SampleOrchestrator {
    async fn sample(&mut self) -> Result<MeasurementResult> {
        self.run_cycle().await
    }
}
