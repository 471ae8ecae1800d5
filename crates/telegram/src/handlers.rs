use std::sync::Arc;

use {
    pinsaver_media::LinkOutcome,
    teloxide::types::Message,
    tracing::{debug, info},
};

use crate::{outbound::TelegramReplySink, state::BotState};

/// Run the media pipeline over one incoming message and reply in its chat.
pub async fn handle_message(msg: Message, state: Arc<BotState>) {
    let chat_id = msg.chat.id.0;
    let Some(text) = incoming_text(&msg) else {
        debug!(chat_id, "ignoring command or non-text message");
        return;
    };

    let sink = TelegramReplySink::new(
        state.bot.clone(),
        msg.chat.id,
        msg.id,
        state.max_retry_after,
    );
    let reports = state.pipeline.handle_text(text, &sink).await;
    if reports.is_empty() {
        debug!(chat_id, "no platform links in message");
        return;
    }

    let delivered = reports
        .iter()
        .filter(|r| matches!(r.outcome, LinkOutcome::Delivered { .. }))
        .count();
    info!(
        chat_id,
        links = reports.len(),
        delivered,
        "message processed"
    );
}

/// Plain message text, or `None` for commands and messages without text.
/// Captions on media messages do not count.
#[must_use]
pub fn incoming_text(msg: &Message) -> Option<&str> {
    let text = msg.text()?;
    if text.trim_start().starts_with('/') {
        return None;
    }
    Some(text)
}
