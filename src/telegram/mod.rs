//! Telegram bot integration
//!
//! Thin binding around the flow layer: decode updates into events, render
//! reply instructions back out. No flow logic lives here.

pub mod bot;
pub mod handlers;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{handle_callback, handle_command, handle_message};
