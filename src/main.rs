use anyhow::Result;
use clap::Parser;
use scp_jump::{cli::Cli, config::Config, run};

#[tokio::main]
async fn main() -> Result<()> {
    // 方便本地测试
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}: {}", e.phase(), e);
            std::process::exit(1);
        }
    };

    let default_level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(config).await {
        Ok(result) => {
            println!("📡 Transferred {} files", result.count);
        }
        Err(e) => {
            eprintln!("❌ {}: {}", e.phase(), e);
            // 阻塞中的工作线程不会被等待
            std::process::exit(1);
        }
    }

    Ok(())
}
