use std::time::Duration;

use {
    async_trait::async_trait,
    pinsaver_config::PinsaverConfig,
    scraper::{Html, Selector},
    tracing::debug,
    url::Url,
};

use super::{
    Extraction, MediaHint, MediaReference, ResolvedResource, Strategy, absolute_url,
};
use crate::{
    error::{Error, Result},
    kind::MediaKind,
};

/// Queries the platform's oEmbed endpoint for a preview image.
#[derive(Debug, Clone)]
pub struct EmbedLookup {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl EmbedLookup {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn from_config(config: &PinsaverConfig, client: &reqwest::Client) -> Result<Self> {
        let raw = &config.platform.oembed_endpoint;
        let endpoint = Url::parse(raw).map_err(|e| Error::invalid_url(raw.as_str(), e))?;
        Ok(Self::new(
            client.clone(),
            endpoint,
            Duration::from_secs(config.http.request_timeout_secs),
        ))
    }

    /// Image URL advertised by the embed metadata for `page`.
    ///
    /// `None` when the endpoint answers with an error status, a body that is
    /// not a JSON object, an `error` field, or no usable image.
    pub async fn lookup(&self, page: &Url) -> Result<Option<Url>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("url", page.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%page, %status, "embed endpoint returned an error status");
            return Ok(None);
        }
        let body = response.text().await?;
        Ok(embed_image(&body, page))
    }
}

#[async_trait]
impl Strategy for EmbedLookup {
    fn name(&self) -> &str {
        "embed_lookup"
    }

    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction> {
        let Some(image) = self.lookup(&resource.url).await? else {
            return Ok(Extraction::NotFound);
        };
        debug!(asset = %image, "embed metadata image");
        let hint = MediaHint {
            kind: Some(MediaKind::Photo),
            platform_type: None,
        };
        Ok(Extraction::Found(MediaReference::remote(image, hint)))
    }
}

/// Pull the preview image out of an oEmbed response body. An `<img>` inside
/// the `html` fragment wins over `thumbnail_url`.
fn embed_image(body: &str, page: &Url) -> Option<Url> {
    let data: serde_json::Value = serde_json::from_str(body).ok()?;
    let data = data.as_object()?;
    if data.contains_key("error") {
        debug!(%page, "embed metadata reported an error");
        return None;
    }

    let from_fragment = data
        .get("html")
        .and_then(|v| v.as_str())
        .and_then(fragment_image)
        .and_then(|src| absolute_url(page, &src));
    from_fragment.or_else(|| {
        data.get("thumbnail_url")
            .and_then(|v| v.as_str())
            .and_then(|src| absolute_url(page, src))
    })
}

fn fragment_image(fragment: &str) -> Option<String> {
    let selector = Selector::parse("img[src]").ok()?;
    let html = Html::parse_fragment(fragment);
    html.select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| !src.trim().is_empty())
        .map(str::to_string)
}
