//! Media kind classification and file-type sniffing.

use url::Url;

/// Extensions recognised at the end of an asset URL path, first match wins.
const URL_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "gif", "jpg", "jpeg", "png"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Extension used when neither the URL nor the content type says anything.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Attachment type chosen for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Unknown,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Unknown => "unknown",
        }
    }
}

impl MediaKind {
    /// Apply a platform type hint: "gif" anywhere in it turns a photo or
    /// video into an animation.
    #[must_use]
    pub fn with_platform_hint(self, platform_hint: Option<&str>) -> Self {
        let animated = platform_hint.is_some_and(|h| h.to_ascii_lowercase().contains("gif"));
        match self {
            Self::Photo | Self::Video if animated => Self::Animation,
            other => other,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the attachment type from what is known about a file.
///
/// `extension` is compared case-insensitively and may carry a leading dot.
/// A platform type hint mentioning "gif" turns a photo or video into an
/// animation.
#[must_use]
pub fn classify(extension: &str, mime: Option<&str>, platform_hint: Option<&str>) -> MediaKind {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let mime = mime.map(str::to_ascii_lowercase);
    let mime = mime.as_deref().unwrap_or("");

    let kind = if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else if ext == "gif" || mime.starts_with("image/gif") {
        MediaKind::Animation
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) || mime.starts_with("image/") {
        MediaKind::Photo
    } else if mime.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Unknown
    };

    kind.with_platform_hint(platform_hint)
}

/// Pick a file extension (without the dot) for a download.
///
/// The URL path's trailing extension wins, then the declared content type,
/// then [`FALLBACK_EXTENSION`].
#[must_use]
pub fn sniff_extension(url: &Url, content_type: Option<&str>) -> &'static str {
    let path = urlencoding::decode(url.path())
        .map(|p| p.to_ascii_lowercase())
        .unwrap_or_else(|_| url.path().to_ascii_lowercase());
    if let Some(ext) = URL_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| path.strip_suffix(*ext).is_some_and(|rest| rest.ends_with('.')))
    {
        return ext;
    }

    let ct = content_type.map(str::to_ascii_lowercase).unwrap_or_default();
    [
        ("video/mp4", "mp4"),
        ("video/webm", "webm"),
        ("image/gif", "gif"),
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
    ]
    .into_iter()
    .find(|(mime, _)| ct.contains(mime))
    .map_or(FALLBACK_EXTENSION, |(_, ext)| ext)
}

/// Best-effort MIME type for a local file extension.
#[must_use]
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}
