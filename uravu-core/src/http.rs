use std::time::Duration;

/// Identifies this client to public services that require a user agent.
pub(crate) const USER_AGENT: &str = concat!("uravu/", env!("CARGO_PKG_VERSION"));

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}
