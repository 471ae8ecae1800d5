use std::sync::Arc;

use pinsaver_media::Pipeline;

/// Everything a message handler needs, shared by all per-message tasks.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub pipeline: Arc<Pipeline>,
    /// `RetryAfter` waits honoured per outbound call.
    pub max_retry_after: usize,
}
