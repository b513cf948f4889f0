//! Modelport handler — the callable unit invoked by the infra engine.
//!
//! Speaks the sandbox's runtime API on one side and the engine's
//! custom-resource response protocol on the other; the staging and
//! triggering logic itself lives in modelport-core.

mod event;
mod handler;
mod respond;
mod runtime;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .without_time()
        .init();

    let runtime = runtime::RuntimeClient::from_env()?;
    let http = reqwest::Client::new();
    info!("modelport handler ready");

    loop {
        let invocation = runtime.next_invocation().await?;
        let event: event::CustomResourceEvent = match serde_json::from_value(invocation.payload) {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "unparseable invocation payload");
                runtime
                    .post_error(&invocation.request_id, &format!("unparseable event: {err}"))
                    .await?;
                continue;
            }
        };

        let response = handler::handle(&event).await;

        // The engine only acts on the presigned-URL payload; the runtime
        // response is an acknowledgment.
        if let Err(err) = respond::send_response(&http, &event.response_url, &response).await {
            error!(error = ?err, "failed to deliver custom-resource response");
            runtime
                .post_error(&invocation.request_id, &format!("{err:#}"))
                .await?;
            continue;
        }
        runtime
            .post_response(
                &invocation.request_id,
                &serde_json::json!({ "status": "delivered" }),
            )
            .await?;
    }
}
