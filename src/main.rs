//! `html2pdf-server` binary.
//!
//! Reads configuration from `app.env` and the environment, launches
//! headless Chrome, and serves until SIGINT or SIGTERM.

use std::process::ExitCode;

use html2pdf_server::ChromeEngineFactory;
use html2pdf_server::config::env::from_env;
use html2pdf_server::lifecycle;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match lifecycle::run(config, Box::new(ChromeEngineFactory::new())).await {
        Ok(()) => {
            log::info!("✅ Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
