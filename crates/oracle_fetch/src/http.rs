use crate::error::FetchError;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

/// GETs `url` and returns the body of a 2xx response.
pub async fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<String, FetchError> {
    debug!(url = %url, "GET");
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

/// Host name used as `verificationSource`; falls back to the raw endpoint.
pub fn source_host(endpoint: &str) -> String {
    Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| endpoint.to_string())
}

/// `scheme://host[:port]` of the endpoint.
pub fn origin(endpoint: &str) -> String {
    Url::parse(endpoint)
        .map(|url| url.origin().ascii_serialization())
        .unwrap_or_else(|_| endpoint.trim_end_matches('/').to_string())
}
