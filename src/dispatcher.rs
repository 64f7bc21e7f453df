use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::backend::{Backend, BackendError};
use crate::mode::{DispatchTarget, Mode};

#[derive(Debug, thiserror::Error)]
#[error("{backend_id}/{endpoint}: {source}")]
pub struct DispatchError {
    pub backend_id: &'static str,
    pub endpoint: &'static str,
    #[source]
    pub source: BackendError,
}

/// Normalised backend result handed back to the chat client.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReply {
    /// `data[0]` of the backend result, passed through unvalidated (null when absent).
    pub reply: Value,
    pub sources: Option<Vec<String>>,
}

/// Routes one message to the backend chosen by its mode. Stateless apart from
/// the shared backend client.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn dispatch(
        &self,
        message: &str,
        mode: Option<Mode>,
    ) -> Result<DispatchReply, DispatchError> {
        let target = DispatchTarget::for_mode(mode);
        let payload = target.payload(message);

        info!(
            backend = target.backend_id,
            endpoint = target.endpoint,
            "Dispatching chat message"
        );

        match self
            .backend
            .invoke(target.backend_id, target.endpoint, &payload)
            .await
        {
            Ok(response) => Ok(normalize(response)),
            Err(source) => {
                error!(
                    backend = target.backend_id,
                    endpoint = target.endpoint,
                    error = %source,
                    "Backend call failed"
                );
                Err(DispatchError {
                    backend_id: target.backend_id,
                    endpoint: target.endpoint,
                    source,
                })
            }
        }
    }
}

fn normalize(response: Value) -> DispatchReply {
    let reply = response["data"][0].clone();
    let sources = response
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        });
    DispatchReply { reply, sources }
}
