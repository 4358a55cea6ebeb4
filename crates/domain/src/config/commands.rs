use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Leading character that marks a message as a command.
    #[serde(default = "d_prefix")]
    pub prefix: char,

    /// Case-insensitive substrings that trigger the greeting auto-reply.
    /// An empty list disables it.
    #[serde(default = "d_keywords")]
    pub greeting_keywords: Vec<String>,

    #[serde(default = "d_reply")]
    pub greeting_reply: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: d_prefix(),
            greeting_keywords: d_keywords(),
            greeting_reply: d_reply(),
        }
    }
}

fn d_prefix() -> char {
    '.'
}
fn d_keywords() -> Vec<String> {
    vec!["hello".into(), "hi".into(), "hey".into()]
}
fn d_reply() -> String {
    "Hello! How can I help you?".into()
}
