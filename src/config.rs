//! Server configuration
//!
//! Every setting can be given on the command line or through the
//! environment; the defaults match the limits in [`crate::constants`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{Parser, builder::TypedValueParser};
use web_time::Duration;

use crate::constants::{session, teams};

/// Runtime configuration of the buzzboard server
#[derive(Debug, Clone, Parser)]
#[command(name = "buzzboard", about = "Shared scoreboard and buzzer server for trivia nights")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BUZZBOARD_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Seconds after creation at which a session expires
    #[arg(long, env = "BUZZBOARD_SESSION_TTL", default_value_t = session::TTL_SECS)]
    pub session_ttl_secs: u64,
    /// Seconds between sweeps for expired sessions
    #[arg(long, env = "BUZZBOARD_CLEANUP_INTERVAL", default_value_t = session::CLEANUP_INTERVAL_SECS)]
    pub cleanup_interval_secs: u64,
    /// Maximum number of live sessions
    #[arg(long, env = "BUZZBOARD_MAX_SESSIONS", default_value_t = session::MAX_SESSIONS)]
    pub max_sessions: usize,
    /// Teams in a session when the host does not ask for a number
    #[arg(
        long,
        env = "BUZZBOARD_TEAM_COUNT",
        default_value_t = teams::DEFAULT_COUNT,
        value_parser = clap::value_parser!(u8).range(1..=teams::MAX_COUNT as i64).map(usize::from)
    )]
    pub team_count: usize,
    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, env = "BUZZBOARD_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            session_ttl_secs: session::TTL_SECS,
            cleanup_interval_secs: session::CLEANUP_INTERVAL_SECS,
            max_sessions: session::MAX_SESSIONS,
            team_count: teams::DEFAULT_COUNT,
            log_filter: "info".to_owned(),
        }
    }
}

impl Config {
    /// Socket address to bind
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Time between expiry sweeps, never zero
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_ttl(), Duration::from_secs(session::TTL_SECS));
        assert_eq!(config.max_sessions, session::MAX_SESSIONS);
        assert_eq!(config.team_count, teams::DEFAULT_COUNT);
        assert_eq!(config.addr(), "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "buzzboard",
            "--bind",
            "127.0.0.1",
            "--port",
            "8080",
            "--team-count",
            "5",
            "--cleanup-interval-secs",
            "0",
        ])
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.team_count, 5);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_team_count_bounds() {
        assert!(Config::try_parse_from(["buzzboard", "--team-count", "0"]).is_err());
        assert!(Config::try_parse_from(["buzzboard", "--team-count", "9"]).is_err());
    }
}
