/// Configuration management for the API server
///
/// Configuration is read once at startup from environment variables (and a
/// `.env` file if present), then shared immutably as `Arc<Config>`.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS and strict headers (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Session signing secret, at least 32 characters (required)
/// - `JWT_TTL_MINUTES`: Session token lifetime (default: 60)
/// - `SUMMARIZER_URL`: Project analysis endpoint (optional)
/// - `SUMMARIZER_API_KEY`: Bearer key for the summarizer (optional)
/// - `SUMMARIZER_TIMEOUT_SECONDS`: Summarizer request timeout (default: 30)
/// - `RUST_LOG` / `LOG_FORMAT`: Read by the logging setup in `main`
///
/// # Example
///
/// ```no_run
/// use trellis_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub summarizer: SummarizerConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, no permissive defaults)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 secret, at least 32 characters
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub ttl_minutes: i64,
}

/// External summarizer configuration
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Analysis is disabled when unset
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 8080u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = parse_or(&lookup, "PRODUCTION", false)?;

        let database_url = non_empty(lookup("DATABASE_URL"))
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let ttl_minutes = parse_or(&lookup, "JWT_TTL_MINUTES", 60i64)?;
        if ttl_minutes <= 0 {
            anyhow::bail!("JWT_TTL_MINUTES must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_minutes,
            },
            summarizer: SummarizerConfig {
                url: non_empty(lookup("SUMMARIZER_URL")),
                api_key: non_empty(lookup("SUMMARIZER_API_KEY")),
                timeout_seconds: parse_or(&lookup, "SUMMARIZER_TIMEOUT_SECONDS", 30u64)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
