use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Upper bound accepted for `sessions.pairing_wait_ms`.
pub const MAX_PAIRING_WAIT_MS: u64 = 30_000;

/// Per-phone-number session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// How long `start` waits for the first pairing code before answering
    /// `initializing`.  Best-effort only: the code may still arrive later.
    #[serde(default = "d_2000")]
    pub pairing_wait_ms: u64,

    /// Prefix of the per-key auth profile ID (`<prefix>-<key>`).  Keeping
    /// it stable lets the client reuse stored credentials on re-pairing.
    #[serde(default = "d_prefix")]
    pub auth_profile_prefix: String,

    /// Directory where the client keeps credential material.  `None` leaves
    /// the choice to the client.
    #[serde(default)]
    pub auth_data_path: Option<PathBuf>,

    /// Capacity of each session's lifecycle event channel.
    #[serde(default = "d_64")]
    pub event_buffer: usize,

    /// Render each pairing code as a QR code on the terminal.
    #[serde(default = "d_true")]
    pub print_pairing_code: bool,

    /// Browser launch options handed to the client at construction.
    #[serde(default)]
    pub launch: LaunchConfig,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            pairing_wait_ms: d_2000(),
            auth_profile_prefix: d_prefix(),
            auth_data_path: None,
            event_buffer: d_64(),
            print_pairing_code: true,
            launch: LaunchConfig::default(),
        }
    }
}

/// Headless browser launch options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "d_true")]
    pub headless: bool,
    #[serde(default = "d_launch_args")]
    pub args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            args: d_launch_args(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2000() -> u64 {
    2000
}
fn d_64() -> usize {
    64
}
fn d_true() -> bool {
    true
}
fn d_prefix() -> String {
    "pairbot".into()
}
fn d_launch_args() -> Vec<String> {
    [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-accelerated-2d-canvas",
        "--no-first-run",
        "--no-zygote",
        "--single-process",
        "--disable-gpu",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
