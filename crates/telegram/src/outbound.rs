use std::{future::Future, path::Path, time::Duration};

use {
    async_trait::async_trait,
    pinsaver_media::{Error as MediaError, MediaSink, Result as MediaResult},
    teloxide::{
        RequestError,
        payloads::{
            SendAnimationSetters, SendDocumentSetters, SendMessageSetters, SendPhotoSetters,
            SendVideoSetters,
        },
        prelude::*,
        types::{ChatId, InputFile, MessageId, ReplyParameters},
    },
    tracing::{debug, warn},
};

/// Replies into one chat, threaded under the message that carried the link.
#[derive(Clone)]
pub struct TelegramReplySink {
    bot: Bot,
    chat_id: ChatId,
    reply_to: MessageId,
    max_retry_after: usize,
}

impl TelegramReplySink {
    #[must_use]
    pub fn new(bot: Bot, chat_id: ChatId, reply_to: MessageId, max_retry_after: usize) -> Self {
        Self {
            bot,
            chat_id,
            reply_to,
            max_retry_after,
        }
    }

    fn reply_params(&self) -> ReplyParameters {
        ReplyParameters::new(self.reply_to).allow_sending_without_reply()
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, request: F) -> MediaResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        match run_with_retry(self.chat_id.0, operation, self.max_retry_after, request).await {
            Ok(_) => {
                debug!(chat_id = self.chat_id.0, operation, "telegram send ok");
                Ok(())
            },
            Err(e) => Err(MediaError::external(format!("telegram {operation}"), e)),
        }
    }
}

#[async_trait]
impl MediaSink for TelegramReplySink {
    async fn send_video(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.run("send_video", || {
            let mut req = self
                .bot
                .send_video(self.chat_id, InputFile::file(path))
                .reply_parameters(self.reply_params());
            if let Some(caption) = caption {
                req = req.caption(caption);
            }
            req.send()
        })
        .await
    }

    async fn send_animation(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.run("send_animation", || {
            let mut req = self
                .bot
                .send_animation(self.chat_id, InputFile::file(path))
                .reply_parameters(self.reply_params());
            if let Some(caption) = caption {
                req = req.caption(caption);
            }
            req.send()
        })
        .await
    }

    async fn send_photo(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.run("send_photo", || {
            let mut req = self
                .bot
                .send_photo(self.chat_id, InputFile::file(path))
                .reply_parameters(self.reply_params());
            if let Some(caption) = caption {
                req = req.caption(caption);
            }
            req.send()
        })
        .await
    }

    async fn send_document(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.run("send_document", || {
            let mut req = self
                .bot
                .send_document(self.chat_id, InputFile::file(path))
                .reply_parameters(self.reply_params());
            if let Some(caption) = caption {
                req = req.caption(caption);
            }
            req.send()
        })
        .await
    }

    async fn send_text(&self, text: &str) -> MediaResult<()> {
        self.run("send_message", || {
            self.bot
                .send_message(self.chat_id, text)
                .reply_parameters(self.reply_params())
                .send()
        })
        .await
    }
}

/// Run a Telegram request, sleeping through up to `max_retries` server
/// mandated `RetryAfter` waits. Any other error is returned at once.
pub async fn run_with_retry<T, F, Fut>(
    chat_id: i64,
    operation: &'static str,
    max_retries: usize,
    mut request: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= max_retries {
                    warn!(
                        chat_id,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id,
                    operation,
                    retries,
                    max_retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
        teloxide::types::Seconds,
    };

    fn message_json() -> String {
        serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 99,
                "date": 1,
                "chat": { "id": 42, "type": "private", "first_name": "Alice" },
                "text": "ok"
            }
        })
        .to_string()
    }

    fn sink(server: &mockito::ServerGuard) -> TelegramReplySink {
        let api_url = reqwest::Url::parse(&format!("{}/", server.url())).unwrap();
        let bot = Bot::new("test-token").set_api_url(api_url);
        TelegramReplySink::new(bot, ChatId(42), MessageId(7), 2)
    }

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[tokio::test]
    async fn retries_through_rate_limit() {
        let attempts = AtomicUsize::new(0);
        let result = run_with_retry(1, "test", 2, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RequestError::RetryAfter(Seconds::from_seconds(0)))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), _> = run_with_retry(1, "test", 2, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::RetryAfter(Seconds::from_seconds(0))) }
        })
        .await;
        assert!(matches!(result, Err(RequestError::RetryAfter(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), _> = run_with_retry(1, "test", 5, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::Io(std::io::Error::other("down"))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_text_replies_in_chat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Regex("(?i)/bottest-token/sendmessage$".into()))
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#""chat_id":42"#.into()),
                mockito::Matcher::Regex("Could not extract media".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(message_json())
            .create_async()
            .await;

        sink(&server)
            .send_text("Could not extract media from that pin.")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_video_uploads_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Regex("(?i)/bottest-token/sendvideo$".into()))
            .match_body(mockito::Matcher::Regex("Saved from Pinterest".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(message_json())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        sink(&server)
            .send_video(&path, Some("Saved from Pinterest"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_surfaces_as_media_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let err = sink(&server).send_text("hi").await.unwrap_err();
        assert!(err.to_string().starts_with("telegram send_message"), "{err}");
    }
}
