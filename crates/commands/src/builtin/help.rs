use async_trait::async_trait;

use pb_domain::error::Result;
use pb_sessions::{InboundMessage, Session};

use crate::registry::Command;

/// `help`: static usage listing.
pub struct HelpCommand {
    text: String,
}

impl HelpCommand {
    pub fn new(prefix: char) -> Self {
        Self {
            text: format!(
                "*Available Commands:*\n\
                 • {prefix}ping - Check bot response speed\n\
                 • {prefix}help - Show this help message"
            ),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[async_trait]
impl Command for HelpCommand {
    async fn execute(&self, message: &InboundMessage, session: &Session) -> Result<()> {
        session.reply(message, &self.text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_uses_configured_prefix() {
        let help = HelpCommand::new('!');
        assert_eq!(
            help.text(),
            "*Available Commands:*\n• !ping - Check bot response speed\n• !help - Show this help message"
        );
    }
}
