//! Server configuration from CLI flags and environment variables.
//! CLI arguments override environment, environment overrides defaults.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_USER_HEADER: &str = "x-authenticated-user";
pub const DEFAULT_ROLES_HEADER: &str = "x-authenticated-roles";

pub const USAGE: &str = "skeleton Server\n\nUSAGE:\n  skeleton_server [--http-port N] [--bind ADDR] [--users-file PATH] [--session-ttl-secs N]\n\nOPTIONS:\n  --http-port N            HTTP port (env: SKELETON_HTTP_PORT, default 8080)\n  --bind ADDR              Bind address (env: SKELETON_BIND, default 127.0.0.1)\n  --users-file PATH        JSON array of user records (env: SKELETON_USERS_FILE, default: built-in demo users)\n  --session-ttl-secs N     Idle session timeout (env: SKELETON_SESSION_TTL_SECS, default 1800)\n\nENVIRONMENT:\n  SKELETON_USER_HEADER     Trusted header carrying the authenticated username (default x-authenticated-user)\n  SKELETON_ROLES_HEADER    Trusted header carrying the authorities (default x-authenticated-roles)\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },
    #[error("missing value for {0}")]
    MissingValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub bind_addr: IpAddr,
    pub users_file: Option<PathBuf>,
    pub session_ttl: Duration,
    pub user_header: String,
    pub roles_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            users_file: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            user_header: DEFAULT_USER_HEADER.to_string(),
            roles_header: DEFAULT_ROLES_HEADER.to_string(),
        }
    }
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

fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid { key: key.to_string(), value })
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

impl ServerConfig {
    /// Resolve from the process environment and the given argv.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::resolve(args, |k| std::env::var(k).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ServerConfig::default();

        if let Some(v) = arg_value(args, "--http-port")? {
            cfg.http_port = parse("--http-port", v)?;
        } else if let Some(v) = env("SKELETON_HTTP_PORT") {
            cfg.http_port = parse("SKELETON_HTTP_PORT", v)?;
        }

        if let Some(v) = arg_value(args, "--bind")? {
            cfg.bind_addr = parse("--bind", v)?;
        } else if let Some(v) = env("SKELETON_BIND") {
            cfg.bind_addr = parse("SKELETON_BIND", v)?;
        }

        cfg.users_file = arg_value(args, "--users-file")?
            .or_else(|| env("SKELETON_USERS_FILE"))
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let ttl_secs: Option<u64> = match arg_value(args, "--session-ttl-secs")? {
            Some(v) => Some(parse("--session-ttl-secs", v)?),
            None => env("SKELETON_SESSION_TTL_SECS").map(|v| parse("SKELETON_SESSION_TTL_SECS", v)).transpose()?,
        };
        if let Some(secs) = ttl_secs {
            if secs == 0 {
                return Err(ConfigError::Invalid { key: "session ttl".into(), value: "0".into() });
            }
            cfg.session_ttl = Duration::from_secs(secs);
        }

        if let Some(h) = env("SKELETON_USER_HEADER").filter(|s| !s.trim().is_empty()) {
            cfg.user_header = h.trim().to_ascii_lowercase();
        }
        if let Some(h) = env("SKELETON_ROLES_HEADER").filter(|s| !s.trim().is_empty()) {
            cfg.roles_header = h.trim().to_ascii_lowercase();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("skeleton_server").chain(v.iter().copied()).map(String::from).collect()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_without_args_or_env() {
        let cfg = ServerConfig::resolve(&args(&[]), env_of(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.session_ttl, Duration::from_secs(1800));
        assert_eq!(cfg.user_header, "x-authenticated-user");
    }

    #[test]
    fn args_override_env() {
        let cfg = ServerConfig::resolve(
            &args(&["--http-port", "9000", "--session-ttl-secs", "5"]),
            env_of(&[("SKELETON_HTTP_PORT", "7000"), ("SKELETON_SESSION_TTL_SECS", "60"), ("SKELETON_BIND", "0.0.0.0")]),
        )
        .unwrap();
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.session_ttl, Duration::from_secs(5));
        assert_eq!(cfg.bind_addr, IpAddr::from([0, 0, 0, 0]));
    }

    #[test]
    fn header_names_are_normalized() {
        let cfg = ServerConfig::resolve(&args(&[]), env_of(&[("SKELETON_USER_HEADER", " X-Remote-User ")])).unwrap();
        assert_eq!(cfg.user_header, "x-remote-user");
        assert_eq!(cfg.roles_header, DEFAULT_ROLES_HEADER);
    }

    #[test]
    fn users_file_from_env() {
        let cfg = ServerConfig::resolve(&args(&[]), env_of(&[("SKELETON_USERS_FILE", "/etc/skeleton/users.json")])).unwrap();
        assert_eq!(cfg.users_file, Some(PathBuf::from("/etc/skeleton/users.json")));
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = ServerConfig::resolve(&args(&[]), env_of(&[("SKELETON_HTTP_PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { key: "SKELETON_HTTP_PORT".into(), value: "eighty".into() });
        assert!(ServerConfig::resolve(&args(&["--session-ttl-secs", "0"]), env_of(&[])).is_err());
        assert_eq!(
            ServerConfig::resolve(&args(&["--http-port"]), env_of(&[])).unwrap_err(),
            ConfigError::MissingValue("--http-port".into())
        );
    }

    #[test]
    fn help_flag_detection() {
        assert!(has_flag(&args(&["--help"]), "--help"));
        assert!(!has_flag(&args(&["--http-port", "1"]), "--help"));
    }
}
