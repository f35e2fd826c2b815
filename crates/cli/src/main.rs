mod commands;
mod config;
mod serve;

use std::env;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{FileConfig, ServeConfig, ServeOverrides};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Chamados ticket intake board.
#[derive(Parser)]
#[command(name = "chamados", version, about = "Chamados ticket intake board")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ticket board HTTP API server
    Serve {
        /// Address to bind (default 0.0.0.0)
        #[arg(long, env = "CHAMADOS_HOST")]
        host: Option<String>,
        /// Port to listen on (default 8080)
        #[arg(long, env = "CHAMADOS_PORT")]
        port: Option<u16>,
        /// TOML file supplying defaults for the other flags
        #[arg(long, env = "CHAMADOS_CONFIG")]
        config: Option<PathBuf>,
        /// Days a finalized ticket stays on the board (default 15)
        #[arg(long, env = "CHAMADOS_RETENTION_DAYS")]
        retention_days: Option<i64>,
        /// Also run the archival sweep every N seconds (0 or unset: only on listing)
        #[arg(long, env = "CHAMADOS_SWEEP_INTERVAL_SECS")]
        sweep_interval_secs: Option<u64>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Validate a ticket, comment or history JSON document against the wire schema
    Validate {
        /// Path to the JSON document
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config,
            retention_days,
            sweep_interval_secs,
            tls_cert,
            tls_key,
        } => {
            let file = match config {
                Some(path) => match config::read_config(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        report_error(&e, cli.output, cli.quiet);
                        process::exit(1);
                    }
                },
                None => FileConfig::default(),
            };
            let overrides = ServeOverrides {
                host,
                port,
                retention_days,
                sweep_interval_secs,
                tls_cert,
                tls_key,
            };
            let serve_config = match ServeConfig::resolve(overrides, file) {
                Ok(c) => c,
                Err(e) => {
                    report_error(&format!("error: {e}"), cli.output, cli.quiet);
                    process::exit(1);
                }
            };

            init_tracing();
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {e}"),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(serve_config)) {
                tracing::error!(error = %e, "server error");
                report_error(&format!("Server error: {e}"), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet);
        }
    }
}

/// Install the global subscriber. `CHAMADOS_LOG` takes an `EnvFilter`
/// directive; `CHAMADOS_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHAMADOS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "chamados=debug,info"
        } else {
            "chamados=info,warn"
        })
    });

    let format = env::var("CHAMADOS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
