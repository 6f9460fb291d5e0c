use clap::{{Parser}};
use std::path::PathBuf;

use crate::config::BenchConfig;
use crate::models::TargetConfig;

/// Process Membench - 启动服务进程并测量其内存占用
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// 服务进程的工作目录
    #[arg(short = 'C', long, env = "MEMBENCH_CWD", default_value = ".")]
    pub cwd: PathBuf,

    /// 启动服务的可执行程序
    #[arg(short, long, env = "MEMBENCH_PROGRAM", default_value = "node")]
    pub program: String,

    /// 额外的环境变量 KEY=VALUE，可重复
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// 传给程序的参数（之后会追加 expose-gc）
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, default_value = "built/boot/entry.js")]
    pub args: Vec<String>,
}

impl CommandArgs {
    pub fn into_config(self) -> BenchConfig {
        let mut target = TargetConfig::new(self.program, self.args, self.cwd);
        for (key, value) in self.env {
            target = target.with_env(key, value);
        }
        BenchConfig::new(target)
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CommandArgs::try_parse_from(["process-membench"]).unwrap();
        let config = args.into_config();

        assert_eq!(config.target.program, "node");
        assert_eq!(config.target.command_args(), vec!["built/boot/entry.js", "expose-gc"]);
        assert_eq!(config.sample_count, 3);
    }

    #[test]
    fn test_custom_target() {
        let args = CommandArgs::try_parse_from([
            "process-membench",
            "-C",
            "/srv/app",
            "--program",
            "deno",
            "-e",
            "PORT=3000",
            "run",
            "--allow-all",
            "main.ts",
        ])
        .unwrap();
        let config = args.into_config();

        assert_eq!(config.target.program, "deno");
        assert_eq!(config.target.cwd, PathBuf::from("/srv/app"));
        assert_eq!(
            config.target.command_args(),
            vec!["run", "--allow-all", "main.ts", "expose-gc"]
        );
        assert!(config.target.env.contains(&("PORT".into(), "3000".into())));
    }

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(parse_env_pair("A=b=c"), Ok(("A".into(), "b=c".into())));
        assert!(parse_env_pair("novalue").is_err());
        assert!(parse_env_pair("=x").is_err());
    }
}
