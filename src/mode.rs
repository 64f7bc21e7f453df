use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const RAG_BACKEND: &str = "rag-backend";
pub const GENERATIVE_BACKEND: &str = "generative-backend";
pub const FALLBACK_BACKEND: &str = "fallback-backend";

/// Conversational strategy chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Generative,
    Retrieval,
    Rag,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown mode '{0}' (expected generative, retrieval or rag)")]
pub struct ModeParseError(pub String);

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Generative, Mode::Retrieval, Mode::Rag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generative => "generative",
            Mode::Retrieval => "retrieval",
            Mode::Rag => "rag",
        }
    }

    /// Request-side parsing: anything missing or unrecognised yields `None`,
    /// which routes to the fallback target.
    pub fn parse_lenient(raw: Option<&str>) -> Option<Mode> {
        raw.and_then(|s| s.parse().ok())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generative" => Ok(Mode::Generative),
            "retrieval" => Ok(Mode::Retrieval),
            "rag" => Ok(Mode::Rag),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// Where a message goes for a given mode, and under which field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTarget {
    pub backend_id: &'static str,
    pub endpoint: &'static str,
    pub payload_field: &'static str,
}

impl DispatchTarget {
    // Retrieval has no backend of its own and shares the fallback target.
    pub fn for_mode(mode: Option<Mode>) -> Self {
        match mode {
            Some(Mode::Rag) => DispatchTarget {
                backend_id: RAG_BACKEND,
                endpoint: "chat_api",
                payload_field: "pertanyaan",
            },
            Some(Mode::Generative) => DispatchTarget {
                backend_id: GENERATIVE_BACKEND,
                endpoint: "chat_logic",
                payload_field: "message",
            },
            Some(Mode::Retrieval) | None => DispatchTarget {
                backend_id: FALLBACK_BACKEND,
                endpoint: "chat_logic",
                payload_field: "text",
            },
        }
    }

    pub fn payload(&self, message: &str) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(self.payload_field.to_string(), Value::String(message.to_string()));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_routes_to_rag_backend() {
        let target = DispatchTarget::for_mode(Some(Mode::Rag));
        assert_eq!(target.backend_id, "rag-backend");
        assert_eq!(target.endpoint, "chat_api");
        assert_eq!(target.payload_field, "pertanyaan");
    }

    #[test]
    fn test_generative_routes_to_generative_backend() {
        let target = DispatchTarget::for_mode(Some(Mode::Generative));
        assert_eq!(target.backend_id, "generative-backend");
        assert_eq!(target.endpoint, "chat_logic");
        assert_eq!(target.payload_field, "message");
    }

    #[test]
    fn test_retrieval_and_unknown_share_fallback() {
        let retrieval = DispatchTarget::for_mode(Some(Mode::Retrieval));
        let unspecified = DispatchTarget::for_mode(None);
        let unknown = DispatchTarget::for_mode(Mode::parse_lenient(Some("summarize")));

        assert_eq!(retrieval, unspecified);
        assert_eq!(unknown, unspecified);
        assert_eq!(unspecified.backend_id, "fallback-backend");
        assert_eq!(unspecified.endpoint, "chat_logic");
        assert_eq!(unspecified.payload_field, "text");
    }

    #[test]
    fn test_routing_is_deterministic() {
        for mode in Mode::ALL {
            assert_eq!(
                DispatchTarget::for_mode(Some(mode)),
                DispatchTarget::for_mode(Some(mode))
            );
        }
    }

    #[test]
    fn test_payload_uses_target_field() {
        let payload = DispatchTarget::for_mode(Some(Mode::Rag)).payload("Apa tren penjualan?");
        assert_eq!(payload.len(), 1);
        assert_eq!(payload["pertanyaan"], "Apa tren penjualan?");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Mode::parse_lenient(Some("rag")), Some(Mode::Rag));
        assert_eq!(Mode::parse_lenient(Some("RAG")), None);
        assert_eq!(Mode::parse_lenient(None), None);
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        let err = "chat".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("chat"));
        assert_eq!("retrieval".parse::<Mode>().unwrap(), Mode::Retrieval);
    }
}
