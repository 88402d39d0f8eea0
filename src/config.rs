use std::{env, fs, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::{models::Role, routes::RouteTable};

/// Fallback signing secret for `Env::Local`. Tokens signed with it must never
/// be trusted outside a developer machine.
pub const DEV_FALLBACK_SECRET: &str = "route-gate-insecure-local-dev-secret";

pub const DEFAULT_COOKIE_NAME: &str = "auth_token";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// ConfigError
///
/// Everything that can stop the gate from initializing. These are fatal at
/// startup and never produced while serving requests.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingSecret,
    #[error("JWT_SECRET must not be empty")]
    EmptySecret,
    #[error("{name} has an invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("failed to read routes file {path}: {source}")]
    RoutesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed route table: {0}")]
    MalformedRoutes(#[from] serde_json::Error),
    #[error("configured path {0:?} must start with '/' and carry no trailing '/'")]
    InvalidPath(String),
    #[error("role '{0}' is configured with an empty allowlist")]
    EmptyAllowlist(Role),
    #[error("route table names a role other than user, agent or admin")]
    UnknownRole,
    #[error("{name} {path:?} would redirect into a page that redirects again")]
    UnreachableTarget { name: &'static str, path: String },
}

/// Env
///
/// Runtime posture. `Local` tolerates a development signing secret and logs
/// in a human readable format; `Production` demands every secret explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// SecretSource
///
/// Where the signing secret came from, so the development fallback can never
/// be confused with a configured secret.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SecretSource {
    Environment,
    DevFallback,
}

/// AppConfig
///
/// The gate's complete configuration, read once at process start and treated
/// as immutable afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Env,
    /// HMAC secret used to verify session tokens.
    pub jwt_secret: String,
    pub secret_source: SecretSource,
    /// Allowed clock skew, in seconds, when checking `exp`.
    pub jwt_leeway_secs: u64,
    /// Cookie carrying the session token.
    pub cookie_name: String,
    /// Optional JSON file replacing the built-in routes; re-read on reload.
    pub routes_file: Option<PathBuf>,
    pub routes: RouteTable,
    pub bind_addr: SocketAddr,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("secret_source", &self.secret_source)
            .field("jwt_leeway_secs", &self.jwt_leeway_secs)
            .field("cookie_name", &self.cookie_name)
            .field("routes_file", &self.routes_file)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    /// Local configuration with the built-in routes, used by tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: DEV_FALLBACK_SECRET.to_string(),
            secret_source: SecretSource::DevFallback,
            jwt_leeway_secs: 0,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            routes_file: None,
            routes: RouteTable::default(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment and fails fast on
    /// anything missing or malformed. In `Env::Production` the signing secret
    /// is mandatory; in `Env::Local` a clearly marked fallback is used.
    pub fn load() -> Result<Self, ConfigError> {
        // 1. Runtime posture
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        // 2. Signing secret
        // Mandatory in production. Locally the named fallback is used and
        // tagged as such so `main` can warn about it.
        let (jwt_secret, secret_source) = match (env, env::var("JWT_SECRET")) {
            (_, Ok(secret)) => (secret, SecretSource::Environment),
            (Env::Production, Err(_)) => return Err(ConfigError::MissingSecret),
            (Env::Local, Err(_)) => (DEV_FALLBACK_SECRET.to_string(), SecretSource::DevFallback),
        };
        if jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        // 3. Verification and listener settings
        let jwt_leeway_secs: u64 = match env::var("GATE_JWT_LEEWAY_SECS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
                name: "GATE_JWT_LEEWAY_SECS",
                value,
            })?,
            Err(_) => 0,
        };

        let bind_addr = env::var("GATE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|_| ConfigError::InvalidVar {
            name: "GATE_BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        // 4. Route table
        // A routes file replaces the built-in table and is validated as a
        // whole; a broken file stops startup instead of gating with half of it.
        let routes_file = env::var("GATE_ROUTES_FILE").ok().map(PathBuf::from);
        let routes = match &routes_file {
            Some(path) => load_routes(path)?,
            None => RouteTable::default(),
        };

        Ok(Self {
            env,
            jwt_secret,
            secret_source,
            jwt_leeway_secs,
            cookie_name: env::var("GATE_COOKIE_NAME")
                .unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string()),
            routes_file,
            routes,
            bind_addr,
        })
    }
}

/// Reads and validates a JSON route table from disk.
pub fn load_routes(path: &std::path::Path) -> Result<RouteTable, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::RoutesFile {
        path: path.to_path_buf(),
        source,
    })?;
    RouteTable::from_json(&raw)
}
