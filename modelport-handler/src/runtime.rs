//! Lambda custom-runtime API client.
//!
//! The sandbox exposes a local HTTP endpoint (`AWS_LAMBDA_RUNTIME_API`)
//! the runtime long-polls for invocations and posts results back to.

use anyhow::{Context, bail};
use serde_json::Value;

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

/// One pending invocation pulled from the runtime API.
#[derive(Debug)]
pub struct Invocation {
    pub request_id: String,
    pub payload: Value,
}

pub struct RuntimeClient {
    client: reqwest::Client,
    base: String,
}

impl RuntimeClient {
    /// Build a client from the sandbox environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .context("AWS_LAMBDA_RUNTIME_API is not set; not running inside a managed sandbox")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base: format!("http://{api}/{API_VERSION}"),
        })
    }

    /// Block until the engine hands over the next invocation.
    pub async fn next_invocation(&self) -> anyhow::Result<Invocation> {
        let response = self
            .client
            .get(format!("{}/runtime/invocation/next", self.base))
            .send()
            .await
            .context("runtime API next-invocation poll failed")?;

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("runtime API response missing the request id header")?;
        let payload: Value = response
            .json()
            .await
            .context("invocation payload is not valid JSON")?;

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    /// Report a completed invocation.
    pub async fn post_response(&self, request_id: &str, body: &Value) -> anyhow::Result<()> {
        let reply = self
            .client
            .post(format!(
                "{}/runtime/invocation/{request_id}/response",
                self.base
            ))
            .json(body)
            .send()
            .await?;
        if !reply.status().is_success() {
            bail!("runtime API rejected the response: {}", reply.status());
        }
        Ok(())
    }

    /// Report an invocation the handler could not process at all.
    pub async fn post_error(&self, request_id: &str, message: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "errorMessage": message,
            "errorType": "HandlerError",
        });
        let reply = self
            .client
            .post(format!(
                "{}/runtime/invocation/{request_id}/error",
                self.base
            ))
            .json(&body)
            .send()
            .await?;
        if !reply.status().is_success() {
            bail!("runtime API rejected the error report: {}", reply.status());
        }
        Ok(())
    }
}
