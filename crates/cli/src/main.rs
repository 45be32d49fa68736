use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wa-orchestrator")]
#[command(about = "WhatsApp inbound orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json (existing files are kept).
    Init {
        /// Config file path (default: WA_ORCHESTRATOR_CONFIG or ~/.wa-orchestrator/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Serve the WhatsApp webhook. Forwards text messages to AGENT_URL and relays replies when WHATSAPP_API_URL and WHATSAPP_ACCESS_TOKEN are set.
    Serve {
        /// Config file path (default: WA_ORCHESTRATOR_CONFIG or ~/.wa-orchestrator/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter()),
    )
    .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wa-orchestrator {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Filter used when RUST_LOG is unset: LOG_LEVEL (DEBUG, INFO, WARNING, ERROR, CRITICAL) or "info".
fn default_log_filter() -> String {
    let level = std::env::var("LOG_LEVEL").unwrap_or_default();
    log_filter_for(&level).to_string()
}

fn log_filter_for(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let mut settings = lib::config::Settings::resolve(&config)?;
    if let Some(p) = port {
        settings.port = p;
    }
    lib::gateway::run_gateway(settings).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names_map_to_filters() {
        assert_eq!(log_filter_for("DEBUG"), "debug");
        assert_eq!(log_filter_for("warning"), "warn");
        assert_eq!(log_filter_for("CRITICAL"), "error");
        assert_eq!(log_filter_for(""), "info");
        assert_eq!(log_filter_for("INFO"), "info");
    }
}
