/// Config schema types (telegram, http, fetch, downloader, platform, pipeline).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PinsaverConfig {
    pub telegram: TelegramConfig,
    pub http: HttpConfig,
    pub fetch: FetchConfig,
    pub downloader: DownloaderConfig,
    pub platform: PlatformConfig,
    pub pipeline: PipelineConfig,
}

/// Telegram bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Overridden by `BOT_TOKEN`.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
    /// Read/write timeout for uploads, in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Number of `RetryAfter` waits honoured per send before giving up.
    pub max_retry_after: usize,
}

impl TelegramConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_retry_after", &self.max_retry_after)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            request_timeout_secs: 120,
            connect_timeout_secs: 20,
            max_retry_after: 2,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Shared HTTP client settings. One client is built from this at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `User-Agent` sent on every platform, embed and asset request.
    pub user_agent: String,
    /// Timeout for redirect resolution, page and embed requests, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum redirects followed while resolving a link.
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".into(),
            request_timeout_secs: 20,
            max_redirects: 10,
        }
    }
}

/// Asset download limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-download timeout, in seconds.
    pub timeout_secs: u64,
    /// Byte ceiling for a single asset.
    pub max_bytes: u64,
    /// Directory for temporary files. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<std::path::PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_bytes: 100 * 1024 * 1024,
            temp_dir: None,
        }
    }
}

/// External generic media downloader (yt-dlp compatible CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments inserted before the fixed flags (e.g. `["-m", "yt_dlp"]`
    /// when `program` is a python interpreter).
    pub args: Vec<String>,
    /// Format selector passed to `-f`.
    pub format: String,
    /// Wall-clock limit for one invocation, in seconds.
    pub timeout_secs: u64,
    /// Diagnostic substrings meaning "nothing downloadable here".
    pub no_format_markers: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".into(),
            args: Vec::new(),
            format: "bv*+ba/best/best".into(),
            timeout_secs: 120,
            no_format_markers: vec!["No video formats found".into()],
        }
    }
}

/// Target platform hosts and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Short-link host matched exactly (e.g. `pin.it`).
    pub short_link_host: String,
    /// Fragment matched anywhere in the host (e.g. `pinterest.`).
    pub domain_fragment: String,
    /// Base used to build canonical `/pin/{id}/` addresses.
    pub canonical_base: String,
    /// oEmbed metadata endpoint.
    pub oembed_endpoint: String,
    /// CDN prefix of direct video assets.
    pub video_cdn: String,
    /// CDN prefix of direct animated-image assets.
    pub image_cdn: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            short_link_host: "pin.it".into(),
            domain_fragment: "pinterest.".into(),
            canonical_base: "https://www.pinterest.com".into(),
            oembed_endpoint: "https://www.pinterest.com/oembed.json".into(),
            video_cdn: "https://v.pinimg.com/".into(),
            image_cdn: "https://i.pinimg.com/".into(),
        }
    }
}

/// Extraction strategies available to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Regex scan of page markup for CDN asset URLs.
    DirectPattern,
    /// Out-of-process generic media downloader.
    ExternalDownloader,
    /// oEmbed thumbnail lookup.
    EmbedLookup,
    /// Open Graph meta tag scrape.
    OpenGraph,
    /// oEmbed lookup merged with the Open Graph scrape.
    EmbedAndScrape,
}

impl StrategyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectPattern => "direct_pattern",
            Self::ExternalDownloader => "external_downloader",
            Self::EmbedLookup => "embed_lookup",
            Self::OpenGraph => "open_graph",
            Self::EmbedAndScrape => "embed_and_scrape",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cascade order and per-link limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Strategies tried in order; the first hit wins.
    pub strategies: Vec<StrategyKind>,
    /// Upper bound for processing one link, in seconds.
    pub link_budget_secs: u64,
    /// Caption attached to media found by the direct pattern scan.
    pub direct_caption: String,
    /// Reply when every strategy comes up empty.
    pub no_media_notice: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyKind::DirectPattern,
                StrategyKind::ExternalDownloader,
                StrategyKind::EmbedAndScrape,
            ],
            link_budget_secs: 300,
            direct_caption: "Saved from Pinterest".into(),
            no_media_notice: "Could not extract media from that pin.".into(),
        }
    }
}
