use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Runtime configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "sweeter-backend", version, about = "Sweeter Than Fiction backend")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite connection string, e.g. `sqlite://stf.db` or `sqlite::memory:`
    #[arg(long, env = "DB_URI", default_value = "sqlite::memory:")]
    pub database_url: String,

    /// HMAC secret for session tokens. A random one is generated when absent,
    /// which invalidates every session on restart.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime, one hour to one year
    #[arg(
        long,
        env = "SESSION_TTL_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_HOURS)
    )]
    pub session_ttl_hours: i64,

    /// JSON array of songs loaded into the discography at startup
    #[arg(long, env = "SONGS_FILE")]
    pub songs_file: Option<PathBuf>,

    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
