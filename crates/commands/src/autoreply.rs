//! Passive greeting auto-reply.

use pb_domain::config::CommandsConfig;
use pb_domain::trace::TraceEvent;
use pb_sessions::{InboundMessage, Session};

/// Replies with a fixed greeting when the lowercased body contains any
/// keyword.  Runs on every message, command or not.
#[derive(Debug, Clone)]
pub struct AutoReply {
    keywords: Vec<String>,
    reply: String,
}

impl AutoReply {
    pub fn new(keywords: &[String], reply: impl Into<String>) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            reply: reply.into(),
        }
    }

    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new(&config.greeting_keywords, config.greeting_reply.clone())
    }

    /// First keyword contained in `body`, if any.
    pub fn matches(&self, body: &str) -> Option<&str> {
        let lowered = body.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Send the greeting if `message` matches.  Returns whether it did.
    pub async fn respond(&self, message: &InboundMessage, session: &Session) -> bool {
        let Some(keyword) = self.matches(&message.body) else {
            return false;
        };

        if let Err(e) = session.reply(message, &self.reply).await {
            tracing::warn!(error = %e, "greeting reply failed");
            return false;
        }
        TraceEvent::AutoReplySent {
            session_key: session.key().to_string(),
            keyword: keyword.to_owned(),
        }
        .emit();
        true
    }
}
