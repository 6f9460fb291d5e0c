use clap::Parser;

mod cli;
mod config;
mod error;
mod models;
mod report;
mod services;

use cli::CommandArgs;
use config::BenchConfig;
use services::SampleOrchestrator;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let config = args.into_config();

    print_banner(&config);

    let mut orchestrator = SampleOrchestrator::new(config.clone());
    let mut stdout = std::io::stdout();

    match report::run(&mut orchestrator, config.sample_count).await {
        Ok(result) => {
            if let Err(e) = report::emit_result(&mut stdout, &result) {
                log::error!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            log::error!("❌ Measurement failed: {}", e);
            let mut current_error: Option<&dyn std::error::Error> = std::error::Error::source(&e);
            while let Some(err) = current_error {
                log::error!("     - {}", err);
                current_error = err.source();
            }
            if let Err(write_err) = report::emit_error(&mut stdout, &e) {
                log::error!("❌ {:#}", write_err);
            }
            std::process::exit(1);
        }
    }
}

fn print_banner(config: &BenchConfig) {
    let target = &config.target;
    log::info!("Process Membench v{}", env!("CARGO_PKG_VERSION"));
    log::info!(
        "  target:  {} {}",
        target.program,
        target.command_args().join(" ")
    );
    log::info!("  cwd:     {}", target.cwd.display());
    log::info!(
        "  samples: {}, startup timeout {}ms, settle {}ms, grace {}ms",
        config.sample_count,
        config.startup_timeout.as_millis(),
        config.settle_duration.as_millis(),
        config.grace_period.as_millis()
    );
}
