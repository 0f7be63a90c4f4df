pub mod config;

use std::{env, fmt, net::SocketAddr};

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the address the HTTP server should bind to.
///
/// `APP_BIND_ADDR` wins when set. Otherwise the server binds localhost on
/// `PORT`, falling back to port 3000 when neither variable is present.
pub fn server_bind_address() -> Result<SocketAddr, BindAddressError> {
    if let Ok(value) = env::var("APP_BIND_ADDR") {
        return value.parse().map_err(BindAddressError::InvalidAddress);
    }

    let port = match env::var("PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .map_err(|_| BindAddressError::InvalidPort(raw))?,
        Err(_) => DEFAULT_PORT,
    };

    Ok(SocketAddr::from(([127, 0, 0, 1], port)))
}

/// Errors that can occur while resolving the bind address.
#[derive(Debug)]
pub enum BindAddressError {
    InvalidAddress(std::net::AddrParseError),
    InvalidPort(String),
}

impl fmt::Display for BindAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidPort(value) => {
                write!(f, "PORT must be a number between 0 and 65535 (got {value})")
            }
        }
    }
}

impl std::error::Error for BindAddressError {}
