use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::backend::{Backend, BackendKind, InferenceBackend, SimulatedBackend, SpaceBackend};
use crate::constants;

/// Everything the web server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub backend: BackendKind,
    /// Bearer token for the inference backends. Never logged.
    pub api_token: Option<String>,
    pub space_base_url: Option<String>,
    pub inference_model: String,
    pub request_timeout: Option<Duration>,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
            backend: BackendKind::default(),
            api_token: None,
            space_base_url: None,
            inference_model: constants::DEFAULT_INFERENCE_MODEL.to_string(),
            request_timeout: Some(Duration::from_secs(constants::DEFAULT_REQUEST_TIMEOUT_SECS)),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    pub fn build_backend(&self) -> Result<Arc<dyn Backend>> {
        let needs_token = self.backend != BackendKind::Simulated;
        if needs_token && self.api_token.as_deref().map_or(true, str::is_empty) {
            // Not fatal: the backend rejects the call and the user sees the error.
            warn!(
                "{} is not set; backend calls will be sent without credentials",
                constants::API_KEY_ENV
            );
        }
        let token = self.api_token.clone().filter(|t| !t.is_empty());

        let backend: Arc<dyn Backend> = match self.backend {
            BackendKind::Space => {
                let mut backend = SpaceBackend::new(token, self.request_timeout)
                    .context("Failed to create space backend client")?;
                if let Some(base) = &self.space_base_url {
                    info!(%base, "Serving spaces from base URL override");
                    backend = backend.with_base_url(base.clone());
                }
                Arc::new(backend)
            }
            BackendKind::Inference => Arc::new(
                InferenceBackend::new(token, self.inference_model.clone(), self.request_timeout)
                    .context("Failed to create inference backend client")?,
            ),
            BackendKind::Simulated => Arc::new(SimulatedBackend::new(Duration::from_millis(1500))),
        };
        info!(backend = ?self.backend, "Backend ready");
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.backend, BackendKind::Space);
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_every_backend_kind_builds_without_token() {
        for kind in [BackendKind::Space, BackendKind::Inference, BackendKind::Simulated] {
            let config = ServerConfig {
                backend: kind,
                ..ServerConfig::default()
            };
            assert!(config.build_backend().is_ok());
        }
    }
}
