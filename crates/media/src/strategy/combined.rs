use {async_trait::async_trait, pinsaver_config::PinsaverConfig, tracing::debug};

use super::{
    EmbedLookup, Extraction, OpenGraph, ResolvedResource, Strategy, open_graph::reference_from,
};
use crate::error::Result;

/// Embed lookup and Open Graph scrape merged into one attempt.
///
/// Video comes from the page tags only. The image is `og:image`, falling back
/// to the embed thumbnail, and `og:type` rides along as the platform hint.
pub struct EmbedAndScrape {
    embed: EmbedLookup,
    open_graph: OpenGraph,
}

impl EmbedAndScrape {
    #[must_use]
    pub fn new(embed: EmbedLookup, open_graph: OpenGraph) -> Self {
        Self { embed, open_graph }
    }

    pub fn from_config(config: &PinsaverConfig, client: &reqwest::Client) -> Result<Self> {
        Ok(Self::new(
            EmbedLookup::from_config(config, client)?,
            OpenGraph::from_config(config, client),
        ))
    }
}

#[async_trait]
impl Strategy for EmbedAndScrape {
    fn name(&self) -> &str {
        "embed_and_scrape"
    }

    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction> {
        let thumbnail = self.embed.lookup(&resource.url).await?;
        let tags = self.open_graph.scrape(&resource.url).await?;
        debug!(
            thumbnail = ?thumbnail,
            image = ?tags.image,
            video = ?tags.video,
            "merged embed and page metadata"
        );
        Ok(reference_from(
            tags.video,
            tags.image.or(thumbnail),
            tags.kind,
        ))
    }
}
