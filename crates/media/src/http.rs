//! The shared HTTP client.
//!
//! Built once at startup and cloned into every component that does network
//! I/O. `reqwest::Client` is an `Arc` around its connection pool, so clones
//! share the pool and are safe to use from concurrent tasks.

use {pinsaver_config::HttpConfig, reqwest::redirect::Policy, tracing::debug};

use crate::error::Result;

/// Build the client every request in the pipeline goes through.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    debug!(
        user_agent = %config.user_agent,
        max_redirects = config.max_redirects,
        "building shared http client"
    );
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::limited(config.max_redirects))
        .build()?;
    Ok(client)
}
