use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::api::{ChatRequest, ChatResponse, ErrorResponse, CHAT_PATH};
use crate::session::{ChatTransport, TransportError};

/// Talks to a running chat server over HTTP.
pub struct HttpChatTransport {
    client: Client,
    url: String,
    timeout: Option<Duration>,
}

impl HttpChatTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self, request), fields(url = %self.url))]
    async fn post(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout.unwrap_or_default())
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The error body is optional; anything unreadable falls back to the default text.
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .map(|body| body.error);
            debug!(%status, ?message, "Chat server returned an error");
            return Err(TransportError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl ChatTransport for HttpChatTransport {
    fn send<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, TransportError>> {
        Box::pin(self.post(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(message: &str, mode: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            mode: Some(mode.to_string()),
        }
    }

    #[test]
    fn test_url_joins_chat_path() {
        let transport = HttpChatTransport::new("http://localhost:3000/", None).unwrap();
        assert_eq!(transport.url(), "http://localhost:3000/api/chat");
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({ "message": "Halo", "mode": "rag" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reply": "Tren naik",
                "sources": ["Memo_Internal.docx"],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpChatTransport::new(&server.uri(), None).unwrap();
        let response = transport.send(&request("Halo", "rag")).await.unwrap();

        assert_eq!(response.reply, json!("Tren naik"));
        assert_eq!(response.sources, Some(vec!["Memo_Internal.docx".to_string()]));
    }

    #[tokio::test]
    async fn test_error_body_is_carried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "backend down" })),
            )
            .mount(&server)
            .await;

        let transport = HttpChatTransport::new(&server.uri(), None).unwrap();
        match transport.send(&request("Halo", "generative")).await {
            Err(TransportError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message.as_deref(), Some("backend down"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let transport = HttpChatTransport::new(&server.uri(), None).unwrap();
        match transport.send(&request("Halo", "generative")).await {
            Err(TransportError::Server { status, message }) => {
                assert_eq!(status, 502);
                assert!(message.is_none());
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Nothing listens on port 9 locally.
        let transport = HttpChatTransport::new("http://127.0.0.1:9", None).unwrap();
        let err = transport
            .send(&request("Halo", "generative"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }
}
