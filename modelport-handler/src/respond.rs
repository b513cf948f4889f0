//! cfn-response adapter — deliver the completion payload to the engine.
//!
//! The engine hands the handler a presigned URL; the payload is PUT there
//! with an empty content type (the URL is signed without one).

use anyhow::bail;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::info;

use crate::event::CustomResourceResponse;

pub async fn send_response(
    client: &reqwest::Client,
    response_url: &str,
    response: &CustomResourceResponse,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(response)?;
    info!(status = ?response.status, url = response_url, "delivering custom-resource response");

    let reply = client
        .put(response_url)
        .header(CONTENT_TYPE, HeaderValue::from_static(""))
        .body(body)
        .send()
        .await?;
    if !reply.status().is_success() {
        bail!(
            "custom-resource response delivery failed with status {}",
            reply.status()
        );
    }
    Ok(())
}
