mod help;
mod ping;

pub use help::HelpCommand;
pub use ping::{PingCommand, SpeedBand};
