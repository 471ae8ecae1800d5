//! The per-message media pipeline.
//!
//! For every platform link in a message: resolve redirects, normalise, try
//! the strategies in order, download what the winner points at, classify it
//! and hand it to the sink. Links run one after another. Each ends in a
//! delivery, a "no media" notice or an error notice, and a failing link never
//! stops the ones after it.

use std::{
    fmt,
    time::{Duration, Instant},
};

use {
    pinsaver_config::PinsaverConfig,
    tracing::{debug, error, info, warn},
    url::Url,
};

use crate::{
    dispatch::{MediaSink, deliver},
    error::{Error, Result},
    fetch::AssetFetcher,
    kind::{MediaKind, classify},
    links::LinkClassifier,
    resolve::resolve,
    strategy::{
        Extraction, MediaReference, MediaSource, ResolvedResource, Strategy, build_strategies,
    },
};

/// Where in the pipeline a link failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    /// Inside the named strategy.
    Extract(String),
    Fetch,
    Deliver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => f.write_str("resolve"),
            Self::Extract(strategy) => write!(f, "extract:{strategy}"),
            Self::Fetch => f.write_str("fetch"),
            Self::Deliver => f.write_str("deliver"),
        }
    }
}

#[derive(Debug)]
pub struct LinkFailure {
    pub stage: Stage,
    pub error: Error,
}

impl LinkFailure {
    fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

#[derive(Debug)]
pub enum LinkOutcome {
    Delivered { kind: MediaKind, strategy: String },
    NoMedia,
    Failed(LinkFailure),
}

/// What happened to one link of a message.
#[derive(Debug)]
pub struct LinkReport {
    /// The link as it appeared in the message.
    pub link: String,
    /// Canonical page URL, when resolution got that far.
    pub resolved: Option<Url>,
    pub outcome: LinkOutcome,
}

pub struct Pipeline {
    classifier: LinkClassifier,
    client: reqwest::Client,
    resolve_timeout: Duration,
    fetcher: AssetFetcher,
    strategies: Vec<Box<dyn Strategy>>,
    link_budget: Duration,
    no_media_notice: String,
}

impl Pipeline {
    /// Build the pipeline with the strategies named in `pipeline.strategies`.
    /// `client` is shared by every network call.
    pub fn from_config(config: &PinsaverConfig, client: reqwest::Client) -> Result<Self> {
        let strategies = build_strategies(config, &client)?;
        Self::with_strategies(config, client, strategies)
    }

    /// Build the pipeline around an explicit strategy list.
    pub fn with_strategies(
        config: &PinsaverConfig,
        client: reqwest::Client,
        strategies: Vec<Box<dyn Strategy>>,
    ) -> Result<Self> {
        Ok(Self {
            classifier: LinkClassifier::new(&config.platform)?,
            resolve_timeout: Duration::from_secs(config.http.request_timeout_secs),
            fetcher: AssetFetcher::new(client.clone(), &config.fetch),
            client,
            strategies,
            link_budget: Duration::from_secs(config.pipeline.link_budget_secs),
            no_media_notice: config.pipeline.no_media_notice.clone(),
        })
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Process every platform link in `text`, in order. Text without
    /// platform links does nothing at all.
    pub async fn handle_text(&self, text: &str, sink: &dyn MediaSink) -> Vec<LinkReport> {
        let links = self.classifier.target_links(text);
        if links.is_empty() {
            return Vec::new();
        }
        debug!(count = links.len(), "platform links in message");

        let mut reports = Vec::with_capacity(links.len());
        for link in links {
            let report = self.process_link(&link.text, sink).await;
            self.report(&report, sink).await;
            reports.push(report);
        }
        reports
    }

    async fn process_link(&self, link: &str, sink: &dyn MediaSink) -> LinkReport {
        let deadline = Instant::now() + self.link_budget;
        let resource = match self.resolve_link(link).await {
            Ok(resource) => resource,
            Err(failure) => {
                return LinkReport {
                    link: link.to_string(),
                    resolved: None,
                    outcome: LinkOutcome::Failed(failure),
                };
            },
        };

        let outcome = match self.retrieve(&resource, deadline, sink).await {
            Ok(outcome) => outcome,
            Err(failure) => LinkOutcome::Failed(failure),
        };
        LinkReport {
            link: link.to_string(),
            resolved: Some(resource.url),
            outcome,
        }
    }

    /// Follow redirects and normalise. A link that cannot be resolved is
    /// used as given.
    async fn resolve_link(&self, link: &str) -> std::result::Result<ResolvedResource, LinkFailure> {
        let raw = Url::parse(link)
            .map_err(|e| LinkFailure::new(Stage::Resolve, Error::invalid_url(link, e)))?;
        let resolved = match resolve(&self.client, &raw, self.resolve_timeout).await {
            Ok(url) => url,
            Err(e) => {
                warn!(link, error = %e, "redirect resolution failed, using link as given");
                raw
            },
        };

        let normalized = self.classifier.normalize(resolved.as_str());
        let url = Url::parse(&normalized).map_err(|e| {
            LinkFailure::new(Stage::Resolve, Error::invalid_url(normalized.as_str(), e))
        })?;
        debug!(link, resolved = %url, "link resolved");
        Ok(ResolvedResource {
            original: link.to_string(),
            url,
        })
    }

    async fn retrieve(
        &self,
        resource: &ResolvedResource,
        deadline: Instant,
        sink: &dyn MediaSink,
    ) -> std::result::Result<LinkOutcome, LinkFailure> {
        let Some((strategy, reference)) = self.extract(resource, deadline).await? else {
            return Ok(LinkOutcome::NoMedia);
        };
        let MediaReference {
            source,
            hint,
            caption,
        } = reference;

        let asset = match source {
            MediaSource::Local(asset) => asset,
            MediaSource::Remote(url) => self
                .fetcher
                .fetch(&url)
                .await
                .map_err(|e| LinkFailure::new(Stage::Fetch, e))?,
        };

        let platform_type = hint.platform_type.as_deref();
        let kind = match classify(asset.extension(), asset.content_type(), platform_type) {
            MediaKind::Unknown => hint
                .kind
                .map_or(MediaKind::Unknown, |k| k.with_platform_hint(platform_type)),
            kind => kind,
        };

        deliver(sink, asset, kind, caption.as_deref())
            .await
            .map_err(|e| LinkFailure::new(Stage::Deliver, e))?;
        info!(link = %resource.original, strategy = %strategy, %kind, "media delivered");
        Ok(LinkOutcome::Delivered { kind, strategy })
    }

    /// Try each strategy until one finds media. Running out of budget before
    /// or during a strategy fails the link.
    async fn extract(
        &self,
        resource: &ResolvedResource,
        deadline: Instant,
    ) -> std::result::Result<Option<(String, MediaReference)>, LinkFailure> {
        for strategy in &self.strategies {
            let name = strategy.name();
            let stage = Stage::Extract(name.to_string());
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.budget_exhausted(stage));
            }

            debug!(strategy = name, page = %resource.url, "trying strategy");
            match tokio::time::timeout(remaining, strategy.attempt(resource)).await {
                Err(_) => return Err(self.budget_exhausted(stage)),
                Ok(Err(error)) => return Err(LinkFailure::new(stage, error)),
                Ok(Ok(Extraction::NotFound)) => debug!(strategy = name, "strategy found nothing"),
                Ok(Ok(Extraction::Found(reference))) => {
                    debug!(strategy = name, "strategy found media");
                    return Ok(Some((name.to_string(), reference)));
                },
            }
        }
        Ok(None)
    }

    fn budget_exhausted(&self, stage: Stage) -> LinkFailure {
        let error = Error::timeout(format!("link budget at {stage}"), self.link_budget);
        LinkFailure::new(stage, error)
    }

    /// Log the outcome and send the matching notice. Failing to send a
    /// notice is logged and otherwise ignored.
    async fn report(&self, report: &LinkReport, sink: &dyn MediaSink) {
        let notice = match &report.outcome {
            LinkOutcome::Delivered { .. } => return,
            LinkOutcome::NoMedia => {
                info!(link = %report.link, "no media found");
                self.no_media_notice.clone()
            },
            LinkOutcome::Failed(failure) => {
                error!(
                    link = %report.link,
                    stage = %failure.stage,
                    error = %failure.error,
                    "link failed"
                );
                format!("Error: {}", failure.error)
            },
        };
        if let Err(e) = sink.send_text(&notice).await {
            warn!(link = %report.link, error = %e, "failed to send notice");
        }
    }
}
