use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

const DEFAULT_DATABASE_URL: &str = "sqlite:poultry.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;

/// Process configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine; real environment variables still apply.
        let _ = dotenvy::dotenv();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let host = match std::env::var("HOST") {
            Ok(host) => host.parse().with_context(|| format!("invalid HOST: {host}"))?,
            Err(_) => DEFAULT_HOST.parse()?,
        };

        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().with_context(|| format!("invalid PORT: {port}"))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            host,
            port,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
