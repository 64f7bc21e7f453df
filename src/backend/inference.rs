use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{Backend, BackendError};
use crate::constants;

#[derive(Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool, // Only the newly generated answer
}

/// Managed text-generation API serving a single instruction-tuned model.
///
/// The routing target only decides which payload field carries the message;
/// every mode is answered by the same model.
pub struct InferenceBackend {
    client: Client,
    token: Option<String>,
    api_url: String,
    model: String,
}

impl InferenceBackend {
    pub fn new(
        token: Option<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, BackendError> {
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
            api_url: constants::HF_INFERENCE_URL.clone(),
            model: model.into(),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[instrument(skip(self, payload), fields(model = %self.model))]
    async fn generate(
        &self,
        backend_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<Value, BackendError> {
        let message = payload
            .values()
            .next()
            .and_then(Value::as_str)
            .unwrap_or_default();

        let request = GenerationRequest {
            inputs: instruction_prompt(message),
            parameters: GenerationParameters {
                max_new_tokens: 200,
                temperature: 0.7,
                return_full_text: false,
            },
        };

        let url = format!(
            "{}/models/{}",
            self.api_url.trim_end_matches('/'),
            self.model
        );
        let mut http_request = self.client.post(&url).json(&request);
        if let Some(token) = &self.token {
            http_request = http_request.bearer_auth(token);
        }

        let response = http_request
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Text generation request failed");
            return Err(BackendError::Status { status, body });
        }

        let generated: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(format!("invalid generation response: {}", e)))?;
        debug!(%backend_id, ?generated, "Received generation");

        Ok(json!({ "data": generated }))
    }
}

impl Backend for InferenceBackend {
    fn invoke<'a>(
        &'a self,
        backend_id: &'a str,
        _endpoint: &'a str,
        payload: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, BackendError>> {
        Box::pin(self.generate(backend_id, payload))
    }
}

/// Instruction format expected by the default model.
fn instruction_prompt(message: &str) -> String {
    format!("<s>[INST] {} [/INST]", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_instruction_prompt() {
        assert_eq!(instruction_prompt("Halo"), "<s>[INST] Halo [/INST]");
    }

    #[tokio::test]
    async fn test_generation_is_wrapped_as_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/test/model"))
            .and(header("authorization", "Bearer hf_secret"))
            .and(body_partial_json(json!({
                "inputs": "<s>[INST] Halo [/INST]",
                "parameters": { "max_new_tokens": 200, "return_full_text": false }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "generated_text": "Hai, ada yang bisa dibantu?" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = InferenceBackend::new(Some("hf_secret".to_string()), "test/model", None)
            .unwrap()
            .with_api_url(server.uri());
        let mut payload = Map::new();
        payload.insert("message".to_string(), json!("Halo"));

        let result = backend
            .invoke("generative-backend", "chat_logic", &payload)
            .await
            .unwrap();
        assert_eq!(result["data"][0]["generated_text"], "Hai, ada yang bisa dibantu?");
    }

    #[tokio::test]
    async fn test_model_loading_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_string("{\"error\":\"Model is currently loading\"}"),
            )
            .mount(&server)
            .await;

        let backend = InferenceBackend::new(None, "test/model", None)
            .unwrap()
            .with_api_url(server.uri());
        let mut payload = Map::new();
        payload.insert("text".to_string(), json!("Halo"));

        let err = backend
            .invoke("fallback-backend", "chat_logic", &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { .. }));
        assert!(err.to_string().contains("Model is currently loading"));
    }
}
