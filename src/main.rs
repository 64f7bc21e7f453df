use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use modechat::backend::BackendKind;
use modechat::config::ServerConfig;
use modechat::{chat, constants, web_server, Mode};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chat web server.
    Start {
        #[arg(long, env = "PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, env = "CHAT_BACKEND", value_enum, default_value_t = BackendKind::Space, help = "Which inference backend answers messages.")]
        backend: BackendKind,
        #[arg(long, env = constants::API_KEY_ENV, hide_env_values = true, hide = true)]
        api_key: Option<String>,
        #[arg(long, env = "SPACE_BASE_URL", help = "Serve every space from this base URL instead of its public host.")]
        space_base_url: Option<String>,
        #[arg(long, env = "INFERENCE_MODEL", default_value = constants::DEFAULT_INFERENCE_MODEL, help = "Model used by the inference backend.")]
        inference_model: String,
        #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = constants::DEFAULT_REQUEST_TIMEOUT_SECS, help = "Seconds to wait for a backend reply (0 waits forever).")]
        request_timeout: u64,
        #[arg(long, default_value = "templates", help = "Directory holding index.html.")]
        templates: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
    },
    /// Chat with a running server from the terminal.
    Chat {
        #[arg(long, default_value = "http://127.0.0.1:3000", help = "Base URL of the chat server.")]
        server: String,
        #[arg(long, value_enum, default_value_t = Mode::Generative, help = "Initial mode.")]
        mode: Mode,
        #[arg(long, default_value_t = constants::DEFAULT_REQUEST_TIMEOUT_SECS, help = "Seconds to wait for each reply (0 waits forever).")]
        timeout: u64,
    },
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for the inference API token)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,modechat=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            port,
            backend,
            api_key,
            space_base_url,
            inference_model,
            request_timeout,
            templates,
            static_dir,
        } => {
            info!("Starting chat server on port {}...", port);
            let config = ServerConfig {
                port,
                backend,
                api_token: api_key,
                space_base_url,
                inference_model,
                request_timeout: timeout_from_secs(request_timeout),
                templates_dir: templates,
                static_dir,
            };
            web_server::start_web_server(config)
                .await
                .context("Chat server failed")?;
            info!("Shutdown complete.");
        }
        Commands::Chat {
            server,
            mode,
            timeout,
        } => {
            chat::run_chat(&server, mode, timeout_from_secs(timeout))
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
