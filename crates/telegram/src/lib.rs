//! Telegram transport for the pinsaver pipeline.
//!
//! Long-polls the Bot API with teloxide, hands every text message to the
//! media pipeline on its own task and replies through [`TelegramReplySink`].

pub mod bot;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;

pub use {
    bot::{build_bot, start_polling},
    error::{Error, Result},
    outbound::TelegramReplySink,
    state::BotState,
};
