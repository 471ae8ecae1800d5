use std::{sync::Arc, time::Duration};

use {
    pinsaver_config::TelegramConfig,
    pinsaver_media::Pipeline,
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    handlers,
    state::BotState,
};

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP client uses the configured upload timeouts.
pub fn build_bot(config: &TelegramConfig) -> Result<Bot> {
    if !config.has_token() {
        return Err(Error::message("telegram bot token is not set"));
    }
    // The request timeout must outlast the long-poll timeout or every idle
    // poll would be cut off client-side.
    let timeout = Duration::from_secs(config.request_timeout_secs)
        .max(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15));
    let client = teloxide::net::default_reqwest_settings()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(timeout)
        .build()
        .map_err(|e| Error::external("telegram http client", e))?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify the token, clear any webhook and start the polling loop.
///
/// Each incoming message is handled on its own task, so a slow download in
/// one chat never delays another. The loop stops when `cancel` fires.
pub async fn start_polling(
    bot: Bot,
    config: &TelegramConfig,
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;
    info!(username = ?me.username, "telegram bot connected (webhook cleared)");

    let state = Arc::new(BotState {
        bot: bot.clone(),
        pipeline,
        max_retry_after: config.max_retry_after,
    });

    Ok(tokio::spawn(poll_loop(bot, state, cancel)))
}

async fn poll_loop(bot: Bot, state: Arc<BotState>, cancel: CancellationToken) {
    info!("starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            debug!(chat_id = msg.chat.id.0, "received telegram message");
                            tokio::spawn(handlers::handle_message(msg, Arc::clone(&state)));
                        },
                        other => {
                            debug!("ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(e) => {
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!("telegram polling stopped: another instance is running with this token");
                    cancel.cancel();
                    break;
                }
                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                }
            },
        }
    }
}
