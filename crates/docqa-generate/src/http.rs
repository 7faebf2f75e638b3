//! Shared request handling for the HTTP providers.

use serde::de::DeserializeOwned;

use docqa_core::{RagError, Result};

/// Send a JSON request and decode the JSON response.
///
/// Transport failures, non-success statuses and undecodable bodies all map
/// to [`RagError::Generation`] tagged with the provider name.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| RagError::generation(format!("{}: request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(RagError::generation(format!(
            "{}: API error {}: {}",
            provider, status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RagError::generation(format!("{}: invalid response: {}", provider, e)))
}

/// Strip a trailing slash so paths can be appended with `format!`.
pub(crate) fn trim_base_url(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}
