use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use diagora::config::Settings;
use diagora::server::{self, AppState};
use diagora::telemetry::init_telemetry;
use diagora::{Capabilities, DEFAULT_PROMPT_PATH, build_assistant};

/// Natural-language health checks for Oracle E-Business Suite.
#[derive(Parser, Debug)]
#[command(name = "diagora", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "DIAGORA_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "DIAGORA_PORT", default_value_t = 5000)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Assistant persona prompt
    #[arg(long, env = "DIAGORA_PROMPT_PATH", default_value = DEFAULT_PROMPT_PATH)]
    prompt_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_telemetry(&args.log_level, args.json_logs)?;

    info!("Starting Diagora {}", env!("CARGO_PKG_VERSION"));

    let result = run(args).await;
    if let Err(ref e) = result {
        error!("Server error: {:#}", e);
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    let settings = Settings::from_env();
    let capabilities = Capabilities::from_settings(&settings);
    let assistant = build_assistant(&capabilities, &args.prompt_path);

    let state = AppState {
        assistant: Arc::new(assistant),
        llm_configured: capabilities.llm.is_some(),
    };

    server::serve(addr, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert()
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["diagora"]).unwrap();
        assert_eq!(args.port, 5000);
        assert_eq!(args.prompt_path, PathBuf::from(DEFAULT_PROMPT_PATH));
    }
}
