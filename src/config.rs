//! Server configuration from environment variables and command-line flags.
//! Flags override the environment; the signing secret is environment-only so
//! it never shows up in a process listing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::identity::DEFAULT_TOKEN_TTL;

pub const ENV_HTTP_PORT: &str = "TENANTGATE_HTTP_PORT";
pub const ENV_BIND: &str = "TENANTGATE_BIND";
pub const ENV_SIGNING_SECRET: &str = "TENANTGATE_SIGNING_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "TENANTGATE_TOKEN_TTL_SECS";
pub const ENV_SEED: &str = "TENANTGATE_SEED";

pub const DEFAULT_HTTP_PORT: u16 = 8000;

pub const USAGE: &str = "tenantgate server\n\nUSAGE:\n  tenantgate_server [--http-port N] [--bind ADDR] [--token-ttl-secs N] [--seed PATH]\n\nOPTIONS:\n  --http-port N        HTTP port (env: TENANTGATE_HTTP_PORT, default 8000)\n  --bind ADDR          Bind address (env: TENANTGATE_BIND, default 0.0.0.0)\n  --token-ttl-secs N   Token lifetime in seconds (env: TENANTGATE_TOKEN_TTL_SECS, default 86400)\n  --seed PATH          JSON seed file for the identity store (env: TENANTGATE_SEED)\n\nThe token signing secret is read from TENANTGATE_SIGNING_SECRET and is required.\n";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{} is not set", ENV_SIGNING_SECRET)]
    MissingSecret,
    #[error("invalid value '{value}' for {name}")]
    Invalid { name: String, value: String },
    #[error("flag {0} needs a value")]
    MissingValue(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub bind_addr: IpAddr,
    pub signing_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub seed_path: Option<PathBuf>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_port", &self.http_port)
            .field("bind_addr", &self.bind_addr)
            .field("signing_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("seed_path", &self.seed_path)
            .finish()
    }
}

impl ServerConfig {
    /// Build from the process environment and `std::env::args()`.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::resolve(|name| std::env::var(name).ok(), args)
    }

    /// `env` is injected so tests never touch the process environment.
    pub fn resolve<F: Fn(&str) -> Option<String>>(env: F, args: &[String]) -> Result<Self, ConfigError> {
        let http_port = match arg_value(args, "--http-port")? {
            Some(v) => parse_named::<u16>("--http-port", &v)?,
            None => match env(ENV_HTTP_PORT) {
                Some(v) => parse_named::<u16>(ENV_HTTP_PORT, &v)?,
                None => DEFAULT_HTTP_PORT,
            },
        };
        let bind_addr = match arg_value(args, "--bind")? {
            Some(v) => parse_named::<IpAddr>("--bind", &v)?,
            None => match env(ENV_BIND) {
                Some(v) => parse_named::<IpAddr>(ENV_BIND, &v)?,
                None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            },
        };
        let ttl_secs = match arg_value(args, "--token-ttl-secs")? {
            Some(v) => Some(parse_ttl("--token-ttl-secs", &v)?),
            None => match env(ENV_TOKEN_TTL_SECS) {
                Some(v) => Some(parse_ttl(ENV_TOKEN_TTL_SECS, &v)?),
                None => None,
            },
        };
        let seed_path = arg_value(args, "--seed")?.or_else(|| env(ENV_SEED)).filter(|s| !s.is_empty()).map(PathBuf::from);
        let signing_secret = env(ENV_SIGNING_SECRET).filter(|s| !s.is_empty()).ok_or(ConfigError::MissingSecret)?;
        Ok(Self {
            http_port,
            bind_addr,
            signing_secret: signing_secret.into_bytes(),
            token_ttl: ttl_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TOKEN_TTL),
            seed_path,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.bind_addr, self.http_port) }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value(args: &[String], flag: &str) -> Result<Option<String>, ConfigError> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return match args.get(i + 1) {
                Some(v) if !v.starts_with("--") => Ok(Some(v.clone())),
                _ => Err(ConfigError::MissingValue(flag.to_string())),
            };
        }
        i += 1;
    }
    Ok(None)
}

fn parse_named<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid { name: name.to_string(), value: value.to_string() })
}

fn parse_ttl(name: &str, value: &str) -> Result<u64, ConfigError> {
    match parse_named::<u64>(name, value)? {
        0 => Err(ConfigError::Invalid { name: name.to_string(), value: value.to_string() }),
        n => Ok(n),
    }
}
