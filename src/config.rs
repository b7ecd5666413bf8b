use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page: u32,
    pub default_size: u32,
    pub max_page: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    /// Login/signup attempts per window and client IP.
    pub session_max_requests: usize,
    /// Booking creations per window and client IP.
    pub booking_max_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
    pub rate_limit: RateLimitConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded file is part of the binary; failing to parse it is a build defect.
        ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .unwrap_or_else(|e| panic!("embedded default config is invalid: {}", e))
    }
}

/// Loads configuration: embedded defaults, then `spotbook.toml`, then the file
/// named by `SPOTBOOK_CONFIG`, then `SPOTBOOK__SECTION__KEY` variables.
pub fn load() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::with_name("spotbook").required(false));

    if let Ok(custom_path) = std::env::var("SPOTBOOK_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    builder = builder.add_source(::config::Environment::with_prefix("SPOTBOOK").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    if cfg.auth.token_secret.trim().is_empty() {
        return Err(anyhow::anyhow!("auth.token_secret must not be empty"));
    }
    if cfg.server.environment.is_production() && cfg.auth.token_secret.len() < 32 {
        return Err(anyhow::anyhow!("auth.token_secret must be at least 32 bytes in production"));
    }
    if cfg.auth.token_ttl_secs == 0 {
        return Err(anyhow::anyhow!("auth.token_ttl_secs must be > 0"));
    }

    let p = &cfg.pagination;
    if p.max_page == 0 || p.max_size == 0 {
        return Err(anyhow::anyhow!("pagination.max_page and pagination.max_size must be > 0"));
    }
    if p.default_page == 0 || p.default_page > p.max_page {
        return Err(anyhow::anyhow!("pagination.default_page must be in 1..=max_page"));
    }
    if p.default_size == 0 || p.default_size > p.max_size {
        return Err(anyhow::anyhow!("pagination.default_size must be in 1..=max_size"));
    }

    let rl = &cfg.rate_limit;
    if rl.window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.window_seconds must be > 0"));
    }
    if rl.max_requests == 0 || rl.session_max_requests == 0 || rl.booking_max_requests == 0 {
        return Err(anyhow::anyhow!("rate_limit request limits must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path == ":memory:" {
            return Ok(());
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
