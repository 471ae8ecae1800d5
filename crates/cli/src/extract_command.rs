use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    pinsaver_media::{LinkOutcome, MediaKind, MediaSink, Pipeline, Result as MediaResult},
    tracing::info,
};

/// Writes delivered media into a local directory instead of a chat.
///
/// Files are named `<n>-<kind>.<ext>` in delivery order. Text notices go to
/// stdout.
pub struct DirectorySink {
    out: PathBuf,
    counter: AtomicUsize,
}

impl DirectorySink {
    #[must_use]
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self {
            out: out.into(),
            counter: AtomicUsize::new(0),
        }
    }

    async fn save(&self, kind: MediaKind, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
        let target = self.out.join(format!("{n}-{kind}.{ext}"));
        let bytes = tokio::fs::copy(path, &target).await?;
        match caption {
            Some(caption) => println!("{} ({bytes} bytes): {caption}", target.display()),
            None => println!("{} ({bytes} bytes)", target.display()),
        }
        Ok(())
    }
}

#[async_trait]
impl MediaSink for DirectorySink {
    async fn send_video(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.save(MediaKind::Video, path, caption).await
    }

    async fn send_animation(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.save(MediaKind::Animation, path, caption).await
    }

    async fn send_photo(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.save(MediaKind::Photo, path, caption).await
    }

    async fn send_document(&self, path: &Path, caption: Option<&str>) -> MediaResult<()> {
        self.save(MediaKind::Unknown, path, caption).await
    }

    async fn send_text(&self, text: &str) -> MediaResult<()> {
        println!("{text}");
        Ok(())
    }
}

/// Run the pipeline over `text`, saving whatever it finds into `out`.
pub async fn run_extract(pipeline: &Pipeline, text: &str, out: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(out).await?;
    let sink = DirectorySink::new(out);
    let reports = pipeline.handle_text(text, &sink).await;
    if reports.is_empty() {
        anyhow::bail!("no Pinterest links found in the given text");
    }

    for report in &reports {
        match &report.outcome {
            LinkOutcome::Delivered { kind, strategy } => {
                info!(link = %report.link, %kind, strategy = %strategy, "saved");
            },
            LinkOutcome::NoMedia => info!(link = %report.link, "no media"),
            LinkOutcome::Failed(failure) => info!(link = %report.link, %failure, "failed"),
        }
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn files_are_numbered_by_delivery() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let video = src.path().join("media.mp4");
        let photo = src.path().join("media.jpg");
        std::fs::write(&video, b"mp4").unwrap();
        std::fs::write(&photo, b"jpeg!").unwrap();

        let sink = DirectorySink::new(out.path());
        sink.send_video(&video, Some("Saved from Pinterest"))
            .await
            .unwrap();
        sink.send_photo(&photo, None).await.unwrap();

        assert_eq!(std::fs::read(out.path().join("1-video.mp4")).unwrap(), b"mp4");
        assert_eq!(std::fs::read(out.path().join("2-photo.jpg")).unwrap(), b"jpeg!");
    }

    #[tokio::test]
    async fn missing_extension_falls_back_to_bin() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let blob = src.path().join("media");
        std::fs::write(&blob, b"?").unwrap();

        DirectorySink::new(out.path())
            .send_document(&blob, None)
            .await
            .unwrap();
        assert!(out.path().join("1-unknown.bin").exists());
    }

    #[tokio::test]
    async fn text_without_links_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_strategies(
            &pinsaver_config::PinsaverConfig::default(),
            pinsaver_media::build_client(&pinsaver_config::HttpConfig::default()).unwrap(),
            Vec::new(),
        )
        .unwrap();
        let err = run_extract(&pipeline, "nothing to see", out.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no Pinterest links"));
    }
}
