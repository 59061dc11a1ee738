//! Server configuration from `WARDEN_*` environment variables.

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use warden_auth::AuthConfig;
use warden_db::{DbConfig, DbCredentials};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Peers whose `X-Forwarded-For` header is honoured.
    pub trusted_proxies: Vec<IpAddr>,
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            trusted_proxies: Vec::new(),
            db: DbConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset
    /// variables. Signing keys have no default.
    ///
    /// | variable | meaning |
    /// |---|---|
    /// | `WARDEN_BIND_ADDR` | listen address |
    /// | `WARDEN_TRUSTED_PROXIES` | comma-separated proxy IPs allowed to set `X-Forwarded-For` |
    /// | `WARDEN_DB_URL` | SurrealDB endpoint (`mem://` for embedded) |
    /// | `WARDEN_DB_NAMESPACE`, `WARDEN_DB_DATABASE` | SurrealDB scope |
    /// | `WARDEN_DB_USER`, `WARDEN_DB_PASS` | root credentials |
    /// | `WARDEN_DB_TIMEOUT_SECS` | per-call storage deadline |
    /// | `WARDEN_JWT_PRIVATE_KEY[_FILE]` | Ed25519 signing key, inline or path |
    /// | `WARDEN_JWT_PUBLIC_KEY[_FILE]` | Ed25519 verification key, inline or path |
    /// | `WARDEN_JWT_ISSUER` | `iss` claim |
    /// | `WARDEN_PEPPER` | password pepper |
    /// | `WARDEN_SESSION_TTL_SECS` | session token lifetime |
    /// | `WARDEN_IMPERSONATION_TTL_SECS` | impersonation token lifetime |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse(&get, "WARDEN_BIND_ADDR")?.unwrap_or(defaults.bind_addr);
        let trusted_proxies = match get("WARDEN_TRUSTED_PROXIES") {
            Some(raw) => proxy_list(&raw)?,
            None => defaults.trusted_proxies,
        };

        let url = get("WARDEN_DB_URL").unwrap_or(defaults.db.url);
        let credentials = match (get("WARDEN_DB_USER"), get("WARDEN_DB_PASS")) {
            (Some(username), Some(password)) => Some(DbCredentials { username, password }),
            (Some(_), None) | (None, Some(_)) => {
                bail!("WARDEN_DB_USER and WARDEN_DB_PASS must be set together")
            }
            (None, None) if url.starts_with("mem://") => None,
            (None, None) => defaults.db.credentials,
        };
        let query_timeout = parse::<u64>(&get, "WARDEN_DB_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.db.query_timeout);
        let db = DbConfig {
            url,
            namespace: get("WARDEN_DB_NAMESPACE").unwrap_or(defaults.db.namespace),
            database: get("WARDEN_DB_DATABASE").unwrap_or(defaults.db.database),
            credentials,
            query_timeout,
            migrate_on_connect: true,
        };

        let auth = AuthConfig {
            jwt_private_key_pem: pem(&get, "WARDEN_JWT_PRIVATE_KEY")?,
            jwt_public_key_pem: pem(&get, "WARDEN_JWT_PUBLIC_KEY")?,
            jwt_issuer: get("WARDEN_JWT_ISSUER").unwrap_or(defaults.auth.jwt_issuer),
            pepper: get("WARDEN_PEPPER"),
            session_token_lifetime_secs: parse(&get, "WARDEN_SESSION_TTL_SECS")?
                .unwrap_or(defaults.auth.session_token_lifetime_secs),
            impersonation_token_lifetime_secs: parse(&get, "WARDEN_IMPERSONATION_TTL_SECS")?
                .unwrap_or(defaults.auth.impersonation_token_lifetime_secs),
        };
        auth.validate()?;

        Ok(Self {
            bind_addr,
            trusted_proxies,
            db,
            auth,
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}"))
        })
        .transpose()
}

fn proxy_list(raw: &str) -> anyhow::Result<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map(|ip| ip.to_canonical())
                .with_context(|| format!("invalid WARDEN_TRUSTED_PROXIES entry {entry:?}"))
        })
        .collect()
}

/// Inline `KEY` wins over `KEY_FILE`.
fn pem(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    if let Some(inline) = get(key) {
        return Ok(inline);
    }
    let file_key = format!("{key}_FILE");
    match get(&file_key) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {file_key} at {path}")),
        None => bail!("{key} or {file_key} must be set"),
    }
}
