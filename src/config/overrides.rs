//! Command-line overrides layered on top of the file configuration.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub environment: Option<String>,
    pub limiter_enabled: Option<bool>,
    pub limiter_rps: Option<f64>,
    pub limiter_burst: Option<u32>,
}

impl Overrides {
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
        if let Some(env) = self.environment {
            config.listener.environment = env;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.rate_limit.enabled = enabled;
        }
        if let Some(rps) = self.limiter_rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.rate_limit.burst_size = burst;
        }
    }
}
