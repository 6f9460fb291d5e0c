use serde::Serialize;
use std::path::PathBuf;

/// 启动参数，追加在用户参数之后（暴露手动 GC）
pub const EXPOSE_GC_ARG: &str = "expose-gc";

/// 默认注入的环境变量
pub const DEFAULT_ENV: &[(&str, &str)] = &[
    ("NODE_ENV", "production"),
    ("RUN_MODE", "production"),
    ("MK_DISABLE_CLUSTERING", "1"),
    ("MK_FORCE_GC", "1"),
];

/// 被测服务进程的启动配置
#[derive(Debug, Clone, Serialize)]
pub struct TargetConfig {
    /// 可执行程序
    pub program: String,
    /// 命令行参数（不含 expose-gc）
    pub args: Vec<String>,
    /// 工作目录
    pub cwd: PathBuf,
    /// 环境变量覆盖，按顺序生效
    pub env: Vec<(String, String)>,
}

impl TargetConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            env: DEFAULT_ENV
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// 实际传给进程的参数
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(EXPOSE_GC_ARG.to_string());
        args
    }
}
