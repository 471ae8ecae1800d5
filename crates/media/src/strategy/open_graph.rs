use std::time::Duration;

use {
    async_trait::async_trait,
    pinsaver_config::PinsaverConfig,
    scraper::{Html, Selector},
    tracing::debug,
    url::Url,
};

use super::{
    Extraction, MediaHint, MediaReference, PageFetcher, ResolvedResource, Strategy, absolute_url,
};
use crate::{error::Result, kind::MediaKind};

/// Open Graph properties relevant to media extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenGraphTags {
    pub image: Option<Url>,
    /// `og:video`, else `og:video:url`.
    pub video: Option<Url>,
    /// `og:type`, e.g. `video.other` or `pinterestapp:gif`.
    pub kind: Option<String>,
}

impl OpenGraphTags {
    /// Parse the `<meta property="og:…">` tags of a page. Relative URLs are
    /// resolved against `page`.
    #[must_use]
    pub fn parse(markup: &str, page: &Url) -> Self {
        let document = Html::parse_document(markup);
        let property = |name: &str| -> Option<String> {
            let selector = Selector::parse(&format!(r#"meta[property="{name}"]"#)).ok()?;
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(str::to_string)
        };

        Self {
            image: property("og:image").and_then(|v| absolute_url(page, &v)),
            video: property("og:video")
                .and_then(|v| absolute_url(page, &v))
                .or_else(|| property("og:video:url").and_then(|v| absolute_url(page, &v))),
            kind: property("og:type"),
        }
    }
}

/// Scrapes Open Graph tags from the resolved page.
#[derive(Debug, Clone)]
pub struct OpenGraph {
    page: PageFetcher,
}

impl OpenGraph {
    #[must_use]
    pub fn new(page: PageFetcher) -> Self {
        Self { page }
    }

    #[must_use]
    pub fn from_config(config: &PinsaverConfig, client: &reqwest::Client) -> Self {
        Self::new(PageFetcher::new(
            client.clone(),
            Duration::from_secs(config.http.request_timeout_secs),
        ))
    }

    /// Tags of `page`; all empty when the page is not available.
    pub async fn scrape(&self, page: &Url) -> Result<OpenGraphTags> {
        let Some(markup) = self.page.get(page).await? else {
            return Ok(OpenGraphTags::default());
        };
        let tags = OpenGraphTags::parse(&markup, page);
        debug!(%page, image = ?tags.image, video = ?tags.video, og_type = ?tags.kind, "open graph tags");
        Ok(tags)
    }
}

/// Pick the media a set of tags points at: video first, then image.
pub(crate) fn reference_from(
    video: Option<Url>,
    image: Option<Url>,
    platform_type: Option<String>,
) -> Extraction {
    let (url, kind) = match (video, image) {
        (Some(video), _) => (video, MediaKind::Video),
        (None, Some(image)) => (image, MediaKind::Photo),
        (None, None) => return Extraction::NotFound,
    };
    Extraction::Found(MediaReference::remote(url, MediaHint {
        kind: Some(kind),
        platform_type,
    }))
}

#[async_trait]
impl Strategy for OpenGraph {
    fn name(&self) -> &str {
        "open_graph"
    }

    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction> {
        let tags = self.scrape(&resource.url).await?;
        Ok(reference_from(tags.video, tags.image, tags.kind))
    }
}
