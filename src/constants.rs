// Hosts and defaults for the hosted inference services, overridable from the environment.

use std::env;

lazy_static::lazy_static! {
    // Domain under which demo spaces are served: `owner/name` -> `https://owner-name.<domain>`
    pub static ref HF_SPACE_DOMAIN: String = env::var("HF_SPACE_DOMAIN").unwrap_or_else(|_| "hf.space".to_string());
    pub static ref HF_INFERENCE_URL: String = env::var("HF_INFERENCE_URL").unwrap_or_else(|_| "https://api-inference.huggingface.co".to_string());
}

/// Model used by the managed text-generation backend when none is configured.
pub const DEFAULT_INFERENCE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Environment variable holding the bearer token for the inference backends.
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
