use std::time::Duration;

use {
    async_trait::async_trait,
    pinsaver_config::PinsaverConfig,
    regex::{Regex, RegexBuilder},
    tracing::debug,
    url::Url,
};

use super::{Extraction, MediaHint, MediaReference, PageFetcher, ResolvedResource, Strategy};
use crate::{error::Result, kind::MediaKind};

/// Characters that end a URL embedded in markup or inline JSON.
const URL_TAIL: &str = r#"[^\s"'<>]"#;

const GIF_HINT: &str = r#"animated[_-]?gif|"is_gif"\s*:\s*true|"isGif"\s*:\s*true|"content_type"\s*:\s*"animated_gif"|"pin_type"\s*:\s*"gif""#;
const VIDEO_HINT: &str = r#""type"\s*:\s*"video"|"is_video"\s*:\s*true|"isVideo"\s*:\s*true|"content_type"\s*:\s*"video""#;

/// Scans page markup for CDN asset URLs.
///
/// Video CDN links ending in `.mp4` are tried first, then image CDN links
/// ending in `.gif`. The first occurrence in the markup wins.
pub struct DirectPattern {
    page: PageFetcher,
    video_re: Regex,
    animation_re: Regex,
    gif_hint_re: Regex,
    video_hint_re: Regex,
    caption: Option<String>,
}

impl DirectPattern {
    pub fn new(
        page: PageFetcher,
        video_cdn: &str,
        image_cdn: &str,
        caption: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            page,
            video_re: cdn_pattern(video_cdn, "mp4")?,
            animation_re: cdn_pattern(image_cdn, "gif")?,
            gif_hint_re: case_insensitive(GIF_HINT)?,
            video_hint_re: case_insensitive(VIDEO_HINT)?,
            caption: caption.filter(|c| !c.is_empty()),
        })
    }

    pub fn from_config(config: &PinsaverConfig, client: &reqwest::Client) -> Result<Self> {
        let page = PageFetcher::new(
            client.clone(),
            Duration::from_secs(config.http.request_timeout_secs),
        );
        Self::new(
            page,
            &config.platform.video_cdn,
            &config.platform.image_cdn,
            Some(config.pipeline.direct_caption.clone()),
        )
    }

    /// First CDN asset URL in `markup` with the kind it implies.
    fn scan(&self, markup: &str) -> Option<(String, MediaKind)> {
        if let Some(m) = self.video_re.find(markup) {
            return Some((m.as_str().to_string(), MediaKind::Video));
        }
        self.animation_re
            .find(markup)
            .map(|m| (m.as_str().to_string(), MediaKind::Animation))
    }

    /// Platform type implied by hints in the markup: `gif`, `video`, or
    /// nothing when the page carries no hint.
    fn page_hint(&self, markup: &str) -> Option<&'static str> {
        if self.gif_hint_re.is_match(markup) {
            Some("gif")
        } else if self.video_hint_re.is_match(markup) {
            Some("video")
        } else {
            None
        }
    }
}

#[async_trait]
impl Strategy for DirectPattern {
    fn name(&self) -> &str {
        "direct_pattern"
    }

    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction> {
        let Some(markup) = self.page.get(&resource.url).await? else {
            return Ok(Extraction::NotFound);
        };
        let Some((raw, kind)) = self.scan(&markup) else {
            debug!(page = %resource.url, "no CDN asset in markup");
            return Ok(Extraction::NotFound);
        };
        let Ok(url) = Url::parse(&raw) else {
            debug!(candidate = %raw, "CDN match is not a valid URL");
            return Ok(Extraction::NotFound);
        };

        let platform_type = self.page_hint(&markup).map(str::to_string);
        debug!(asset = %url, %kind, hint = ?platform_type, "direct pattern matched");
        let hint = MediaHint {
            kind: Some(kind),
            platform_type,
        };
        Ok(Extraction::Found(
            MediaReference::remote(url, hint).with_caption(self.caption.clone()),
        ))
    }
}

fn cdn_pattern(prefix: &str, extension: &str) -> Result<Regex> {
    let pattern = format!(
        r"{}{URL_TAIL}+\.{}{URL_TAIL}*",
        regex::escape(prefix),
        regex::escape(extension)
    );
    case_insensitive(&pattern)
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn strategy(base: &str, caption: Option<&str>) -> DirectPattern {
        DirectPattern::new(
            PageFetcher::new(reqwest::Client::new(), Duration::from_secs(5)),
            &format!("{base}/v/"),
            &format!("{base}/i/"),
            caption.map(str::to_string),
        )
        .unwrap()
    }

    fn resource(url: String) -> ResolvedResource {
        ResolvedResource {
            original: url.clone(),
            url: Url::parse(&url).unwrap(),
        }
    }

    #[test]
    fn video_beats_gif_and_first_occurrence_wins() {
        let s = strategy("https://cdn.test", None);
        let markup = r#"<img src="https://cdn.test/i/a.gif">
            <script>{"url":"https://cdn.test/v/hls/first.mp4?x=1"}</script>
            <video src='https://cdn.test/v/720p/second.mp4'></video>"#;
        let (url, kind) = s.scan(markup).unwrap();
        assert_eq!(url, "https://cdn.test/v/hls/first.mp4?x=1");
        assert_eq!(kind, MediaKind::Video);
    }

    #[test]
    fn falls_back_to_gif_pattern() {
        let s = strategy("https://cdn.test", None);
        let (url, kind) = s
            .scan(r#"<img src="https://CDN.TEST/i/originals/a/b.GIF">"#)
            .unwrap();
        assert_eq!(url, "https://CDN.TEST/i/originals/a/b.GIF");
        assert_eq!(kind, MediaKind::Animation);
    }

    #[test]
    fn other_hosts_do_not_match() {
        let s = strategy("https://cdn.test", None);
        assert!(
            s.scan(r#"<a href="https://evil.test/v/x.mp4">https://cdn.testx/v/y.mp4</a>"#)
                .is_none()
        );
        assert!(s.scan("https://cdn.test/i/photo.jpg").is_none());
    }

    #[rstest]
    #[case(r#"{"is_gif": true}"#, Some("gif"))]
    #[case(r#"class="animated-gif""#, Some("gif"))]
    #[case(r#"{"pin_type":"gif","type":"video"}"#, Some("gif"))]
    #[case(r#"{"isVideo" : TRUE}"#, Some("video"))]
    #[case(r#"{"content_type": "video"}"#, Some("video"))]
    #[case("<html></html>", None)]
    #[case("", None)]
    fn page_hints(#[case] markup: &str, #[case] expected: Option<&str>) {
        assert_eq!(strategy("https://cdn.test", None).page_hint(markup), expected);
    }

    #[tokio::test]
    async fn finds_video_with_caption_and_hint() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"<html><script>{{"is_gif":true,"v":"{0}/v/720p/clip.mp4"}}</script></html>"#,
            server.url()
        );
        let _m = server
            .mock("GET", "/pin/42/")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let s = strategy(&server.url(), Some("Saved"));
        let found = s
            .attempt(&resource(format!("{}/pin/42/", server.url())))
            .await
            .unwrap();
        let Extraction::Found(reference) = found else {
            panic!("expected a match");
        };
        assert_eq!(reference.caption.as_deref(), Some("Saved"));
        assert_eq!(reference.hint.kind, Some(MediaKind::Video));
        assert_eq!(reference.hint.platform_type.as_deref(), Some("gif"));
        let super::super::MediaSource::Remote(url) = reference.source else {
            panic!("expected remote source");
        };
        assert!(url.as_str().ends_with("/v/720p/clip.mp4"));
    }

    #[tokio::test]
    async fn page_without_hints_leaves_platform_type_empty() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/pin/43/")
            .with_status(200)
            .with_body(format!(r#"<img src="{}/i/loop.gif">"#, server.url()))
            .create_async()
            .await;

        let found = strategy(&server.url(), None)
            .attempt(&resource(format!("{}/pin/43/", server.url())))
            .await
            .unwrap();
        let Extraction::Found(reference) = found else {
            panic!("expected a match");
        };
        assert_eq!(reference.hint.kind, Some(MediaKind::Animation));
        assert_eq!(reference.hint.platform_type, None);
    }

    #[tokio::test]
    async fn error_page_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/pin/404/")
            .with_status(404)
            .with_body(format!("{}/v/x.mp4", server.url()))
            .create_async()
            .await;

        let s = strategy(&server.url(), None);
        let result = s
            .attempt(&resource(format!("{}/pin/404/", server.url())))
            .await
            .unwrap();
        assert!(!result.is_found());
    }
}
