use serde::Deserialize;

/// Production Threads Graph API root.
pub const DEFAULT_THREADS_API_BASE: &str = "https://graph.threads.net/v1.0";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Root of the remote API, without a trailing slash.
    /// Set via THREADS_API_BASE. Tests point this at a mock server.
    pub threads_api_base: String,
    /// Origin of the browser dashboard allowed by CORS.
    /// Set via DASHBOARD_ORIGIN env var. Default: http://localhost:3000.
    pub dashboard_origin: String,
    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Config {
    /// Config for talking to an arbitrary API root with every other knob at its default.
    pub fn with_api_base(base: &str) -> anyhow::Result<Self> {
        Ok(Self {
            port: 3001,
            threads_api_base: normalize_api_base(base)?,
            dashboard_origin: "http://localhost:3000".into(),
            body_limit_bytes: 1024 * 1024,
        })
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let base = std::env::var("THREADS_API_BASE")
        .unwrap_or_else(|_| DEFAULT_THREADS_API_BASE.into());

    Ok(Config {
        port: std::env::var("RELAY_PORT")
            .unwrap_or_else(|_| "3001".into())
            .parse()
            .unwrap_or(3001),
        threads_api_base: normalize_api_base(&base)?,
        dashboard_origin: std::env::var("DASHBOARD_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into()),
        body_limit_bytes: std::env::var("RELAY_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024 * 1024),
    })
}

/// Validates the API root and strips trailing slashes so paths can be appended verbatim.
fn normalize_api_base(raw: &str) -> anyhow::Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("invalid THREADS_API_BASE '{}': {}", raw, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("THREADS_API_BASE must be http(s), got '{}'", parsed.scheme());
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}
