use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{Backend, BackendError};
use crate::constants;

#[derive(Deserialize, Debug)]
struct CallStarted {
    event_id: String,
}

/// Client for demo spaces that expose named endpoints through a two-step
/// call API: queue the call, then read its result events.
pub struct SpaceBackend {
    client: Client,
    token: Option<String>,
    base_url: Option<String>,
}

impl SpaceBackend {
    pub fn new(token: Option<String>, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| BackendError::Request {
            url: String::from("<client>"),
            source,
        })?;
        Ok(Self {
            client,
            token,
            base_url: None,
        })
    }

    /// Serve every space from `{base_url}/{backend_id}` instead of its public host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn space_url(&self, backend_id: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), backend_id),
            None => {
                let host = backend_id
                    .to_lowercase()
                    .replace(['/', '_', '.'], "-");
                format!("https://{}.{}", host, *constants::HF_SPACE_DOMAIN)
            }
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    #[instrument(skip(self, payload))]
    async fn call(
        &self,
        backend_id: &str,
        endpoint: &str,
        payload: &Map<String, Value>,
    ) -> Result<Value, BackendError> {
        let call_url = format!(
            "{}/gradio_api/call/{}",
            self.space_url(backend_id),
            endpoint.trim_start_matches('/')
        );
        // Named parameters are passed positionally, in payload order.
        let data: Vec<Value> = payload.values().cloned().collect();

        let response = self
            .authorize(self.client.post(&call_url))
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: call_url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Space call could not be queued");
            return Err(BackendError::Status { status, body });
        }

        let started: CallStarted = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(format!("missing event id: {}", e)))?;
        debug!(event_id = %started.event_id, "Space call queued");

        let result_url = format!("{}/{}", call_url, started.event_id);
        let response = self
            .authorize(self.client.get(&result_url))
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: result_url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|source| BackendError::Request {
                url: result_url,
                source,
            })?;

        let output = parse_result_events(&body)?;
        Ok(json!({ "data": output }))
    }
}

impl Backend for SpaceBackend {
    fn invoke<'a>(
        &'a self,
        backend_id: &'a str,
        endpoint: &'a str,
        payload: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, BackendError>> {
        Box::pin(self.call(backend_id, endpoint, payload))
    }
}

/// Pulls the output of the `complete` event out of a result event stream.
fn parse_result_events(body: &str) -> Result<Value, BackendError> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    return serde_json::from_str(data).map_err(|e| {
                        BackendError::Protocol(format!("invalid result payload: {}", e))
                    });
                }
                "error" => {
                    let message = match serde_json::from_str::<Value>(data) {
                        Ok(Value::String(s)) => s,
                        Ok(Value::Null) | Err(_) if data.is_empty() || data == "null" => {
                            "space call failed without details".to_string()
                        }
                        _ => data.to_string(),
                    };
                    return Err(BackendError::Remote(message));
                }
                _ => {}
            }
        }
    }
    Err(BackendError::Protocol(
        "event stream ended without a result".to_string(),
    ))
}
