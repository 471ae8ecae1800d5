//! Extraction strategies.
//!
//! Each strategy looks at one resolved platform page and either points at a
//! media file or reports that it found nothing. The pipeline tries them in
//! configured order and stops at the first hit.

mod combined;
mod direct;
mod downloader;
mod embed;
mod open_graph;
mod page;

use {async_trait::async_trait, pinsaver_config::PinsaverConfig, url::Url};

pub use {
    combined::EmbedAndScrape,
    direct::DirectPattern,
    downloader::ExternalDownloader,
    embed::EmbedLookup,
    open_graph::{OpenGraph, OpenGraphTags},
    page::PageFetcher,
};

use {
    crate::{asset::FetchedAsset, error::Result, kind::MediaKind},
    pinsaver_config::StrategyKind,
};

/// A platform link after redirect resolution and normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// The link as the user sent it.
    pub original: String,
    /// Canonical page URL.
    pub url: Url,
}

/// Where the media lives.
#[derive(Debug)]
pub enum MediaSource {
    /// Still on a CDN; the pipeline downloads it.
    Remote(Url),
    /// Already on disk, owned by this reference.
    Local(FetchedAsset),
}

/// What a strategy learned about the media's type besides the file itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaHint {
    /// Kind declared by the source, used when the file alone is inconclusive.
    pub kind: Option<MediaKind>,
    /// Free-form type string from the platform, e.g. `og:type`.
    pub platform_type: Option<String>,
}

#[derive(Debug)]
pub struct MediaReference {
    pub source: MediaSource,
    pub hint: MediaHint,
    pub caption: Option<String>,
}

impl MediaReference {
    #[must_use]
    pub fn remote(url: Url, hint: MediaHint) -> Self {
        Self {
            source: MediaSource::Remote(url),
            hint,
            caption: None,
        }
    }

    #[must_use]
    pub fn local(asset: FetchedAsset) -> Self {
        Self {
            source: MediaSource::Local(asset),
            hint: MediaHint::default(),
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption.filter(|c| !c.is_empty());
        self
    }
}

/// Result of one strategy attempt. Faults travel separately as `Err`.
#[derive(Debug)]
pub enum Extraction {
    Found(MediaReference),
    NotFound,
}

impl Extraction {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// One technique for locating media on a resolved page.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable identifier used in logs and config.
    fn name(&self) -> &str;

    /// Look for media. Expected absence (error pages, empty markup, no
    /// match) is `Ok(Extraction::NotFound)`; only faults are `Err`.
    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction>;
}

/// Instantiate one strategy.
pub fn build_strategy(
    kind: StrategyKind,
    config: &PinsaverConfig,
    client: &reqwest::Client,
) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match kind {
        StrategyKind::DirectPattern => Box::new(DirectPattern::from_config(config, client)?),
        StrategyKind::ExternalDownloader => Box::new(ExternalDownloader::from_config(config)),
        StrategyKind::EmbedLookup => Box::new(EmbedLookup::from_config(config, client)?),
        StrategyKind::OpenGraph => Box::new(OpenGraph::from_config(config, client)),
        StrategyKind::EmbedAndScrape => Box::new(EmbedAndScrape::from_config(config, client)?),
    };
    Ok(strategy)
}

/// Instantiate `pipeline.strategies` in order.
pub fn build_strategies(
    config: &PinsaverConfig,
    client: &reqwest::Client,
) -> Result<Vec<Box<dyn Strategy>>> {
    config
        .pipeline
        .strategies
        .iter()
        .map(|kind| build_strategy(*kind, config, client))
        .collect()
}

/// Resolve a URL found in markup or metadata against the page it came from.
/// Blank values and unparsable references yield `None`.
pub(crate) fn absolute_url(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok()
}
