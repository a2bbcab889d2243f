//! Greenlight API server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use greenlight::config::validation::validate_config;
use greenlight::config::{load_config, AppConfig, ConfigError, Overrides};
use greenlight::http::HttpServer;
use greenlight::lifecycle::spawn_signal_listener;
use greenlight::mailer::LogMailer;
use greenlight::observability::{logging, metrics};
use greenlight::storage::Engine;

#[derive(Parser)]
#[command(name = "greenlight")]
#[command(version, about = "Movie catalog JSON API", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Environment (development|staging|production)
    #[arg(long)]
    env: Option<String>,

    /// Enable rate limiter
    #[arg(long)]
    limiter_enabled: Option<bool>,

    /// Rate limiter maximum requests per second
    #[arg(long)]
    limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long)]
    limiter_burst: Option<u32>,
}

impl Cli {
    fn load(self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };
        Overrides {
            port: self.port,
            environment: self.env,
            limiter_enabled: self.limiter_enabled,
            limiter_rps: self.limiter_rps,
            limiter_burst: self.limiter_burst,
        }
        .apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().load()?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "greenlight starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        env = %config.listener.environment,
        limiter_enabled = config.rate_limit.enabled,
        limiter_rps = config.rate_limit.requests_per_second,
        limiter_burst = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let mailer = Arc::new(LogMailer::new(&config.mailer));
    let server = HttpServer::new(config, Engine::new(), mailer);

    spawn_signal_listener(server.coordinator().token());

    if let Err(e) = server.run(listener).await {
        tracing::error!(error = %e, "Server stopped abnormally");
        return Err(e.into());
    }

    tracing::info!("Server stopped");
    Ok(())
}
