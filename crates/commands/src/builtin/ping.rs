use std::time::{Duration, Instant};

use async_trait::async_trait;

use pb_domain::error::Result;
use pb_sessions::{InboundMessage, Session};

use crate::registry::Command;

/// Round-trip latency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedBand {
    ExtremelyFast,
    Fast,
    Normal,
    Slow,
}

impl SpeedBand {
    pub fn classify(latency: Duration) -> Self {
        match latency.as_millis() {
            0..=199 => Self::ExtremelyFast,
            200..=499 => Self::Fast,
            500..=999 => Self::Normal,
            _ => Self::Slow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExtremelyFast => "🚀 Extremely Fast",
            Self::Fast => "⚡ Fast",
            Self::Normal => "👍 Normal",
            Self::Slow => "🐢 Slow",
        }
    }
}

/// `ping`: replies once, times how long the network took to confirm that
/// reply, then reports the band and raw latency in a second reply.
pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    async fn execute(&self, message: &InboundMessage, session: &Session) -> Result<()> {
        let started = Instant::now();
        session.reply(message, "Pong!").await?;
        let latency = started.elapsed();

        let band = SpeedBand::classify(latency);
        tracing::debug!(latency_ms = latency.as_millis() as u64, band = ?band, "ping");
        session
            .reply(
                message,
                &format!(
                    "Bot speed: {} | Latency: {}ms",
                    band.label(),
                    latency.as_millis()
                ),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_thresholds() {
        let ms = Duration::from_millis;
        assert_eq!(SpeedBand::classify(ms(0)), SpeedBand::ExtremelyFast);
        assert_eq!(SpeedBand::classify(ms(199)), SpeedBand::ExtremelyFast);
        assert_eq!(SpeedBand::classify(ms(200)), SpeedBand::Fast);
        assert_eq!(SpeedBand::classify(ms(499)), SpeedBand::Fast);
        assert_eq!(SpeedBand::classify(ms(500)), SpeedBand::Normal);
        assert_eq!(SpeedBand::classify(ms(999)), SpeedBand::Normal);
        assert_eq!(SpeedBand::classify(ms(1000)), SpeedBand::Slow);
        assert_eq!(SpeedBand::classify(Duration::from_secs(30)), SpeedBand::Slow);
    }

    #[test]
    fn sub_millisecond_counts_as_zero() {
        assert_eq!(
            SpeedBand::classify(Duration::from_micros(900)),
            SpeedBand::ExtremelyFast
        );
    }
}
