use std::{error::Error as StdError, time::Duration};

/// Longest slice of a tool's diagnostic output kept in [`Error::Tool`].
pub const TOOL_OUTPUT_LIMIT: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("file too large (limit {limit} bytes)")]
    TooLarge { limit: u64 },

    #[error("{stage} timed out after {}s", after.as_secs())]
    Timeout { stage: String, after: Duration },

    #[error("{program} failed (exit code {code:?}): {output}")]
    Tool {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    #[must_use]
    pub fn timeout(stage: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            stage: stage.into(),
            after,
        }
    }

    /// Build a tool failure, keeping at most [`TOOL_OUTPUT_LIMIT`] bytes of
    /// its diagnostic output.
    #[must_use]
    pub fn tool(program: impl Into<String>, code: Option<i32>, output: &str) -> Self {
        Self::Tool {
            program: program.into(),
            code,
            output: truncate_at_char_boundary(output.trim(), TOOL_OUTPUT_LIMIT).to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_output_is_truncated() {
        let long = "e".repeat(TOOL_OUTPUT_LIMIT * 2);
        let Error::Tool { output, .. } = Error::tool("yt-dlp", Some(1), &long) else {
            panic!("expected tool error");
        };
        assert_eq!(output.len(), TOOL_OUTPUT_LIMIT);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "é".repeat(TOOL_OUTPUT_LIMIT);
        let cut = truncate_at_char_boundary(&s, TOOL_OUTPUT_LIMIT + 1);
        assert!(cut.len() <= TOOL_OUTPUT_LIMIT + 1);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn timeout_message_names_stage() {
        let err = Error::timeout("extract:external_downloader", Duration::from_secs(120));
        assert_eq!(
            err.to_string(),
            "extract:external_downloader timed out after 120s"
        );
    }
}
