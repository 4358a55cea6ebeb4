use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP listener
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the gateway's HTTP API listens, and which guards sit in front of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Off unless a `[server.rate_limit]` table is present.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default = "default_max_in_flight")]
    pub max_concurrent_requests: usize,
}

impl ServerConfig {
    /// `host:port`, as handed to the TCP listener.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors: CorsConfig::default(),
            rate_limit: None,
            max_concurrent_requests: default_max_in_flight(),
        }
    }
}

/// Per-client-IP token bucket: refills at `requests_per_second`, holds at
/// most `burst_size` tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Browser origins allowed to call the API.
///
/// Each entry is an exact origin (`https://ops.example.com`), a host with
/// any port (`http://localhost:*`), or `*` for everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn rules(&self) -> Vec<OriginRule> {
        self.allowed_origins
            .iter()
            .map(|o| OriginRule::parse(o))
            .collect()
    }

    pub fn allows_any(&self) -> bool {
        self.rules().contains(&OriginRule::Any)
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

/// One parsed `allowed_origins` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    Any,
    Exact(String),
    /// Scheme and host up to and including the `:`; any numeric port follows.
    AnyPort(String),
}

impl OriginRule {
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if entry == "*" {
            Self::Any
        } else if let Some(host) = entry.strip_suffix('*').filter(|h| h.ends_with(':')) {
            Self::AnyPort(host.to_owned())
        } else {
            Self::Exact(entry.trim_end_matches('/').to_owned())
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => exact == origin,
            Self::AnyPort(host) => origin
                .strip_prefix(host.as_str())
                .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        }
    }

    /// Entries without a scheme never match a browser `Origin` header.
    pub fn has_scheme(&self) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(s) | Self::AnyPort(s) => s.contains("://"),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_max_in_flight() -> usize {
    256
}

fn default_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
