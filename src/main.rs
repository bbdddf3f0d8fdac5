use std::fs::File;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use chat_client::config::{ClientConfig, Mode};
use chat_client::error::ClientError;
use chat_client::ui::{line, tui};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chat-client: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ClientError> {
    let config = ClientConfig::load()?;
    init_tracing(&config)?;
    tracing::info!(url = %config.socket_url, namespace = %config.namespace, mode = ?config.mode, "chat client starting");

    match config.mode {
        Mode::Interactive => tui::run(&config).await,
        Mode::Line => line::run(&config).await,
    }
}

/// Logs go to `--log-file` when given. Otherwise the interactive UI discards
/// them, since stderr shares the screen, and line mode writes them to stderr.
fn init_tracing(config: &ClientConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&config.log_file, config.mode) {
        (Some(path), _) => {
            let file = File::options().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        (None, Mode::Interactive) => builder.with_writer(io::sink).init(),
        (None, Mode::Line) => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}
