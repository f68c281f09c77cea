//! Environment configuration

use chrono_tz::Tz;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://solveboard.db";
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:3000";
pub const DEFAULT_PROOF_IMAGE_URL: &str = "https://www.nytimes.com/badges/games/mini.jpg";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::US::Eastern;

/// Permissions the bot asks for when installed into a server
const INSTALL_PERMISSIONS: u64 = 2415930432;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL
    pub database_url: String,
    /// Address the message gateway listens on
    pub listen_addr: SocketAddr,
    /// Base URL of the chat platform bridge (identity lookups)
    pub bridge_url: String,
    /// Badge image endpoint used for the anti-spoof check
    pub proof_image_url: String,
    /// Timezone in which "today's" puzzle is determined
    pub timezone: Tz,
    /// Timeout for outbound HTTP requests
    pub http_timeout: Duration,
    /// Application client id, used to print an install link
    pub client_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            proof_image_url: DEFAULT_PROOF_IMAGE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE,
            http_timeout: Duration::from_secs(30),
            client_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Blank variables fall back to defaults; unparseable ones do too, with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let listen_addr = match non_empty_var("LISTEN_ADDR") {
            Some(addr) => addr.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid LISTEN_ADDR '{}', using {}",
                    addr,
                    defaults.listen_addr
                );
                defaults.listen_addr
            }),
            None => defaults.listen_addr,
        };

        let timezone = match non_empty_var("PUZZLE_TIMEZONE") {
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown PUZZLE_TIMEZONE '{}', using {}", name, DEFAULT_TIMEZONE);
                DEFAULT_TIMEZONE
            }),
            None => DEFAULT_TIMEZONE,
        };

        let http_timeout = match non_empty_var("HTTP_TIMEOUT") {
            Some(secs) => secs.parse().map(Duration::from_secs).unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid HTTP_TIMEOUT '{}', using {}s",
                    secs,
                    defaults.http_timeout.as_secs()
                );
                defaults.http_timeout
            }),
            None => defaults.http_timeout,
        };

        Self {
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            listen_addr,
            bridge_url: non_empty_var("BRIDGE_URL").unwrap_or(defaults.bridge_url),
            proof_image_url: non_empty_var("PROOF_IMAGE_URL").unwrap_or(defaults.proof_image_url),
            timezone,
            http_timeout,
            client_id: non_empty_var("CLIENT_ID"),
        }
    }

    /// Link for adding the bot to a server, if a client id is configured
    pub fn install_url(&self) -> Option<String> {
        self.client_id.as_ref().map(|client_id| {
            format!(
                "https://discord.com/api/oauth2/authorize?client_id={}&permissions={}&scope=bot",
                client_id, INSTALL_PERMISSIONS
            )
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
