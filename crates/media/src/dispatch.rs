//! Delivery of classified media to the chat transport.

use std::path::Path;

use {async_trait::async_trait, tracing::debug};

use crate::{asset::FetchedAsset, error::Result, kind::MediaKind};

/// Outbound capability of the chat transport, bound to one conversation.
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn send_video(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    async fn send_animation(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    async fn send_photo(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    /// Generic file send, used when the kind is unknown.
    async fn send_document(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Send `asset` with the call matching `kind`, then delete it.
///
/// The asset is released whether or not the send succeeds.
pub async fn deliver(
    sink: &dyn MediaSink,
    asset: FetchedAsset,
    kind: MediaKind,
    caption: Option<&str>,
) -> Result<()> {
    debug!(%kind, path = %asset.path().display(), bytes = asset.size(), "delivering");
    let path = asset.path();
    let sent = match kind {
        MediaKind::Video => sink.send_video(path, caption).await,
        MediaKind::Animation => sink.send_animation(path, caption).await,
        MediaKind::Photo => sink.send_photo(path, caption).await,
        MediaKind::Unknown => sink.send_document(path, caption).await,
    };
    asset.release().await;
    sent
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{asset::TempRoot, error::Error},
        rstest::rstest,
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(&'static str, bool, Option<String>)>>,
        fail: bool,
    }

    impl Recorder {
        fn record(&self, call: &'static str, path: &Path, caption: Option<&str>) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((call, path.exists(), caption.map(str::to_string)));
            if self.fail {
                Err(Error::message("transport down"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MediaSink for Recorder {
        async fn send_video(&self, path: &Path, caption: Option<&str>) -> Result<()> {
            self.record("video", path, caption)
        }

        async fn send_animation(&self, path: &Path, caption: Option<&str>) -> Result<()> {
            self.record("animation", path, caption)
        }

        async fn send_photo(&self, path: &Path, caption: Option<&str>) -> Result<()> {
            self.record("photo", path, caption)
        }

        async fn send_document(&self, path: &Path, caption: Option<&str>) -> Result<()> {
            self.record("document", path, caption)
        }

        async fn send_text(&self, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn asset(root: &Path) -> FetchedAsset {
        let file = TempRoot::new(Some(root.to_path_buf()))
            .file("bin")
            .await
            .unwrap();
        FetchedAsset::from_temp_path(file.into_temp_path(), "bin", None, 0)
    }

    #[rstest]
    #[case(MediaKind::Video, "video")]
    #[case(MediaKind::Animation, "animation")]
    #[case(MediaKind::Photo, "photo")]
    #[case(MediaKind::Unknown, "document")]
    #[tokio::test]
    async fn routes_by_kind_and_releases(#[case] kind: MediaKind, #[case] call: &str) {
        let root = tempfile::tempdir().unwrap();
        let sink = Recorder::default();

        deliver(&sink, asset(root.path()).await, kind, Some("cap"))
            .await
            .unwrap();

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, call);
        assert!(calls[0].1, "file must exist while sending");
        assert_eq!(calls[0].2.as_deref(), Some("cap"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_send_still_releases() {
        let root = tempfile::tempdir().unwrap();
        let sink = Recorder {
            fail: true,
            ..Default::default()
        };

        let result = deliver(&sink, asset(root.path()).await, MediaKind::Photo, None).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
