use std::io::IsTerminal;
use std::path::PathBuf;

use crate::app::Args;
use anyhow::{anyhow, Result};
use clap::Parser;
use preview_config::LogConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log files beyond this size are started afresh.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Starts a RPC service using stdio.
#[derive(Parser, Debug, Clone)]
pub struct Rpc;

impl Rpc {
    pub async fn run(&self, args: Args) -> Result<()> {
        let (config, config_err) =
            preview_config::load_config_on_startup(args.config_file.clone());

        let maybe_log = if let Some(log_path) = args.log {
            Some(log_path)
        } else if let Ok(log_path) = std::env::var("MJML_PREVIEW_LOG_PATH").map(PathBuf::from) {
            Some(log_path)
        } else {
            config.log.log_file.as_ref().map(PathBuf::from)
        };

        let config_err = config_err.map(|err| err.to_string());

        if let Some(log_path) = maybe_log {
            if let Ok(metadata) = std::fs::metadata(&log_path) {
                if log_path.is_file() && metadata.len() > MAX_LOG_FILE_SIZE {
                    std::fs::remove_file(&log_path)?;
                }
            }

            let file_name = log_path
                .file_name()
                .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

            let directory = log_path
                .parent()
                .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            let subscriber = tracing_subscriber::FmtSubscriber::builder()
                .with_env_filter(env_filter(&config.log))
                .with_line_number(true)
                .with_writer(non_blocking)
                .with_ansi(std::io::stdout().is_terminal())
                .finish();

            tracing::subscriber::set_global_default(subscriber)?;

            if let Some(err) = &config_err {
                tracing::error!(%err, "Malformed config file, using the defaults");
            }

            preview_server::stdio_server::start(config_err).await;
        } else {
            preview_server::stdio_server::start(config_err).await;
        }

        Ok(())
    }
}

/// Builds the filter from `max-level` with the extra `log-target` directives
/// on top.
fn env_filter(log: &LogConfig) -> EnvFilter {
    let max_level = log.max_level.parse().unwrap_or(tracing::Level::DEBUG);

    let mut filter = EnvFilter::default().add_directive(LevelFilter::from_level(max_level).into());
    for directive in log.log_target.split(',').map(str::trim) {
        if directive.is_empty() {
            continue;
        }
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(err) => eprintln!("Ignored invalid log target {directive}: {err}"),
        }
    }

    filter
}
