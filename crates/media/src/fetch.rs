use std::time::Duration;

use {
    futures::StreamExt,
    pinsaver_config::FetchConfig,
    reqwest::header::CONTENT_TYPE,
    tokio::io::AsyncWriteExt,
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    asset::{FetchedAsset, TempRoot},
    error::{Error, Result},
    kind::sniff_extension,
};

/// Streams remote assets into temporary files under a byte ceiling.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
    temp_root: TempRoot,
}

impl AssetFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: config.max_bytes,
            temp_root: TempRoot::new(config.temp_dir.clone()),
        }
    }

    /// Download `url` into a new temp file.
    ///
    /// Fails with [`Error::Status`] on a non-2xx response and with
    /// [`Error::TooLarge`] as soon as the body grows past the ceiling; the
    /// partial file is removed when the error propagates.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedAsset> {
        debug!(%url, "fetching asset");
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        if let Some(declared) = response.content_length()
            && declared > self.max_bytes
        {
            warn!(%url, declared, limit = self.max_bytes, "asset larger than limit");
            return Err(Error::TooLarge {
                limit: self.max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let extension = sniff_extension(url, content_type.as_deref());

        let (file, temp_path) = self.temp_root.file(extension).await?.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                warn!(%url, limit = self.max_bytes, "asset exceeded limit while streaming");
                return Err(Error::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        debug!(%url, bytes = written, extension, "asset fetched");
        Ok(FetchedAsset::from_temp_path(
            temp_path,
            extension,
            content_type,
            written,
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::path::Path};

    fn fetcher(root: &Path, max_bytes: u64) -> AssetFetcher {
        AssetFetcher::new(reqwest::Client::new(), &FetchConfig {
            timeout_secs: 5,
            max_bytes,
            temp_dir: Some(root.to_path_buf()),
        })
    }

    fn is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn streams_body_to_temp_file() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/media/blob")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![7u8; 300])
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/media/blob", server.url())).unwrap();
        let asset = fetcher(root.path(), 1024).fetch(&url).await.unwrap();

        assert_eq!(asset.extension(), "png");
        assert_eq!(asset.content_type(), Some("image/png"));
        assert_eq!(asset.size(), 300);
        assert_eq!(std::fs::read(asset.path()).unwrap().len(), 300);

        asset.release().await;
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn url_extension_beats_content_type() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v/clip.mp4")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body("abc")
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/v/clip.mp4", server.url())).unwrap();
        let asset = fetcher(root.path(), 1024).fetch(&url).await.unwrap();
        assert_eq!(asset.extension(), "mp4");
        assert!(asset.path().to_string_lossy().ends_with(".mp4"));
        asset.release().await;
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_and_removed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/big.mp4")
            .with_status(200)
            .with_chunked_body(|w| {
                for _ in 0..8 {
                    w.write_all(&[0u8; 512])?;
                }
                Ok(())
            })
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/big.mp4", server.url())).unwrap();
        let err = fetcher(root.path(), 1000).fetch(&url).await.unwrap_err();

        assert!(matches!(err, Error::TooLarge { limit: 1000 }), "{err}");
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn declared_length_over_limit_fails_fast() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/big.gif")
            .with_status(200)
            .with_body(vec![1u8; 4096])
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/big.gif", server.url())).unwrap();
        let err = fetcher(root.path(), 100).fetch(&url).await.unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn error_status_aborts() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/gone.jpg")
            .with_status(404)
            .create_async()
            .await;
        let root = tempfile::tempdir().unwrap();

        let url = Url::parse(&format!("{}/gone.jpg", server.url())).unwrap();
        let err = fetcher(root.path(), 100).fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, Error::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND)
        );
        assert!(is_empty(root.path()));
    }
}
