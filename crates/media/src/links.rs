//! Link detection: find URLs in chat text, keep the ones that belong to the
//! platform, and rewrite content links to their canonical form.

use std::ops::Range;

use {pinsaver_config::PlatformConfig, regex::Regex, url::Url};

use crate::error::Result;

/// A URL-looking token found in message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// The token exactly as it appears in the text.
    pub text: String,
    /// Byte range of `text` within the message.
    pub span: Range<usize>,
    /// Lowercased scheme (`http` or `https`).
    pub scheme: String,
    /// Lowercased host, `None` when the token does not parse as a URL.
    pub host: Option<String>,
}

/// Recognises platform links and canonicalises them.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    url_re: Regex,
    pin_id_re: Regex,
    short_link_host: String,
    domain_fragment: String,
    canonical_base: String,
}

impl LinkClassifier {
    pub fn new(platform: &PlatformConfig) -> Result<Self> {
        Ok(Self {
            url_re: Regex::new(r"(?i)https?://\S+")?,
            pin_id_re: Regex::new(r"/pin/(\d+)")?,
            short_link_host: platform.short_link_host.to_lowercase(),
            domain_fragment: platform.domain_fragment.to_lowercase(),
            canonical_base: platform.canonical_base.trim_end_matches('/').to_string(),
        })
    }

    /// Every `http(s)://` token in `text`, in order, duplicates included.
    #[must_use]
    pub fn extract_links(&self, text: &str) -> Vec<LinkCandidate> {
        self.url_re
            .find_iter(text)
            .map(|m| {
                let token = m.as_str();
                let scheme = token
                    .split_once("://")
                    .map(|(s, _)| s.to_ascii_lowercase())
                    .unwrap_or_default();
                let host = Url::parse(token)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
                LinkCandidate {
                    text: token.to_string(),
                    span: m.range(),
                    scheme,
                    host,
                }
            })
            .collect()
    }

    /// True when the candidate's host is the short-link host or contains the
    /// platform's domain fragment. Unparsable candidates never match.
    #[must_use]
    pub fn is_target_link(&self, candidate: &LinkCandidate) -> bool {
        candidate.host.as_deref().is_some_and(|host| {
            host == self.short_link_host
                || (!self.domain_fragment.is_empty() && host.contains(&self.domain_fragment))
        })
    }

    /// [`extract_links`](Self::extract_links) filtered by
    /// [`is_target_link`](Self::is_target_link).
    #[must_use]
    pub fn target_links(&self, text: &str) -> Vec<LinkCandidate> {
        self.extract_links(text)
            .into_iter()
            .filter(|c| self.is_target_link(c))
            .collect()
    }

    /// Rewrite a URL carrying a numeric content id to `{base}/pin/{id}/`.
    /// Anything else comes back unchanged.
    #[must_use]
    pub fn normalize(&self, url: &str) -> String {
        match self.pin_id_re.captures(url).and_then(|c| c.get(1)) {
            Some(id) => format!("{}/pin/{}/", self.canonical_base, id.as_str()),
            None => url.to_string(),
        }
    }
}
