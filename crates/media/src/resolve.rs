//! Redirect resolution.

use std::time::Duration;

use {tracing::debug, url::Url};

use crate::error::Result;

/// Follow redirects from `url` and return the address the chain ends on.
///
/// The body is never read. The status of the final response does not matter,
/// since a 404 page still tells us where the short link pointed.
pub async fn resolve(client: &reqwest::Client, url: &Url, timeout: Duration) -> Result<Url> {
    let response = client.get(url.clone()).timeout(timeout).send().await?;
    let resolved = response.url().clone();
    debug!(from = %url, to = %resolved, status = %response.status(), "resolved link");
    Ok(resolved)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn follows_redirect_chain() {
        let mut server = mockito::Server::new_async().await;
        let _a = server
            .mock("GET", "/abc123")
            .with_status(301)
            .with_header("location", "/hop")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/hop")
            .with_status(302)
            .with_header("location", "/pin/987/sent/")
            .create_async()
            .await;
        let _c = server
            .mock("GET", "/pin/987/sent/")
            .with_status(200)
            .create_async()
            .await;

        let start = Url::parse(&format!("{}/abc123", server.url())).unwrap();
        let end = resolve(&reqwest::Client::new(), &start, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(end.path(), "/pin/987/sent/");
    }

    #[tokio::test]
    async fn non_redirect_returns_same_url() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/pin/1/")
            .with_status(404)
            .create_async()
            .await;

        let start = Url::parse(&format!("{}/pin/1/", server.url())).unwrap();
        let end = resolve(&reqwest::Client::new(), &start, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(end, start);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let start = Url::parse("http://127.0.0.1:9/nowhere").unwrap();
        let result = resolve(&reqwest::Client::new(), &start, Duration::from_secs(2)).await;
        assert!(result.is_err());
    }
}
