//! Cross-messenger abstractions (Telegram, MAX).

pub mod port;
pub mod throttled;
pub mod types;
