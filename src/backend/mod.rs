//! Opaque inference backends reachable by `(backend id, endpoint)`.

use futures::future::BoxFuture;
use serde_json::{Map, Value};

mod inference;
mod simulated;
mod space;

pub use inference::InferenceBackend;
pub use simulated::SimulatedBackend;
pub use space::SpaceBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected response from backend: {0}")]
    Protocol(String),
    #[error("backend reported an error: {0}")]
    Remote(String),
}

/// One outbound call to a hosted backend.
///
/// Implementations return the backend's raw result. Callers pick the reply out
/// of it by convention (`data[0]`), so no schema is imposed here.
pub trait Backend: Send + Sync {
    fn invoke<'a>(
        &'a self,
        backend_id: &'a str,
        endpoint: &'a str,
        payload: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, BackendError>>;
}

/// Which backend implementation the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// Demo-hosting spaces, one per routing target.
    #[default]
    Space,
    /// Managed text-generation API with a single model.
    Inference,
    /// Canned offline replies with mock citations.
    Simulated,
}
