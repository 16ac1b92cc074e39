//! Server configuration module
//!
//! Loads listener, middleware and access settings from environment variables.
//! Storage and OCR settings come from [`PageConfig::from_env`].

use std::net::SocketAddr;

use pageocr_core::PageConfig;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum page image size in MB (default: 25)
    pub max_image_size_mb: usize,
    /// Request timeout in seconds (default: 300, must exceed the OCR timeout)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Seconds a `/health` engine check is reused (default: 10)
    pub health_cache_secs: u64,
    /// Accepted `X-Auth-Key` values; empty disables the token check
    pub auth_tokens: Vec<String>,
    /// Client IP patterns (regular expressions, whitespace-separated in
    /// `PAGEOCR_ALLOWED_IPS`); empty disables the IP check
    pub allowed_ips: Vec<String>,
    /// Storage layout and OCR engine settings
    pub pages: PageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_image_size_mb: 25,
            timeout_secs: 300,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            health_cache_secs: 10,
            auth_tokens: Vec::new(),
            allowed_ips: Vec::new(),
            pages: PageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| split_list(&origins));

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        let max_image_size_mb = std::env::var("MAX_IMAGE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(25);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        // Enabled in production unless RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let health_cache_secs = std::env::var("HEALTH_CACHE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let auth_tokens = std::env::var("PAGEOCR_AUTH_TOKENS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let allowed_ips = std::env::var("PAGEOCR_ALLOWED_IPS")
            .map(|v| split_patterns(&v))
            .unwrap_or_default();

        let pages = PageConfig::from_env();

        if timeout_secs <= pages.ocr_timeout.as_secs() {
            tracing::warn!(
                request_timeout_secs = timeout_secs,
                ocr_timeout_secs = pages.ocr_timeout.as_secs(),
                "Request timeout does not exceed the OCR timeout; slow pages will be cut off"
            );
        }

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            max_image_size_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            health_cache_secs,
            auth_tokens,
            allowed_ips,
            pages,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Copy of this config serving pages from `pages`.
    pub fn with_pages(mut self, pages: PageConfig) -> Self {
        self.pages = pages;
        self
    }
}

/// Comma-separated list with blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whitespace-separated regular expressions. Commas belong to the patterns
/// (`\d{1,3}`), so they are not separators.
fn split_patterns(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
