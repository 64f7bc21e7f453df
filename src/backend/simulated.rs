use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use super::{Backend, BackendError};
use crate::mode::{FALLBACK_BACKEND, RAG_BACKEND};

/// Offline stand-in that answers every routing target with a canned reply,
/// including mock document citations for the retrieval and RAG targets.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    delay: Duration,
}

impl SimulatedBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backend for SimulatedBackend {
    fn invoke<'a>(
        &'a self,
        backend_id: &'a str,
        endpoint: &'a str,
        _payload: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, BackendError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!(%backend_id, %endpoint, "Answering from simulated backend");
            Ok(canned_reply(backend_id))
        })
    }
}

fn canned_reply(backend_id: &str) -> Value {
    match backend_id {
        RAG_BACKEND => json!({
            "data": ["Based on the **document analysis**, sales show a significant rise in the third quarter."],
            "sources": ["Laporan_Keuangan.pdf (Hal 12)", "Memo_Internal.docx"],
        }),
        FALLBACK_BACKEND => json!({
            "data": ["Here are the documents that were found:"],
            "sources": ["Laporan_Akhir_2024.pdf", "Data_Survey_Q1.xlsx"],
        }),
        _ => json!({
            "data": ["This is a reply from **generative** mode."],
        }),
    }
}
