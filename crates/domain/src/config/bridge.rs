use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messaging bridge (sidecar) connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how to reach the messaging sidecar.  One WebSocket is opened
/// per session; the sidecar drives the actual messaging client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "d_url")]
    pub url: String,

    /// Name of the env var holding the sidecar auth token.  Unset or empty
    /// means no token is sent.
    #[serde(default = "d_token_env")]
    pub token_env: String,

    #[serde(default = "d_10")]
    pub connect_timeout_secs: u64,
    #[serde(default = "d_10")]
    pub welcome_timeout_secs: u64,
    /// How long a `reply` may wait for its acknowledgement.
    #[serde(default = "d_30")]
    pub reply_timeout_secs: u64,
    #[serde(default = "d_30")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "d_max_frame")]
    pub max_frame_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: d_url(),
            token_env: d_token_env(),
            connect_timeout_secs: 10,
            welcome_timeout_secs: 10,
            reply_timeout_secs: 30,
            heartbeat_interval_secs: 30,
            max_frame_bytes: d_max_frame(),
        }
    }
}

fn d_url() -> String {
    "ws://127.0.0.1:3300/v1/clients".into()
}
fn d_token_env() -> String {
    "PB_BRIDGE_TOKEN".into()
}
fn d_10() -> u64 {
    10
}
fn d_30() -> u64 {
    30
}
fn d_max_frame() -> usize {
    1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_other_defaults() {
        let cfg: BridgeConfig = toml::from_str(r#"url = "wss://bridge.internal/v1/clients""#).unwrap();
        assert_eq!(cfg.url, "wss://bridge.internal/v1/clients");
        assert_eq!(cfg.token_env, "PB_BRIDGE_TOKEN");
        assert_eq!(cfg.reply_timeout_secs, 30);
        assert_eq!(cfg.max_frame_bytes, 1024 * 1024);
    }
}
