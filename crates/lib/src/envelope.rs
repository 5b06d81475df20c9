//! The uniform response envelope and the single conversion from handler results into it.

use crate::agents::{AgentError, AgentKind, Outcome};
use crate::codec::Decoded;
use crate::protocol::VoiceCommand;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of every chat, prescription and voice response. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_validation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ResultEnvelope {
    pub fn from_outcome(kind: AgentKind, result: Result<Outcome, AgentError>) -> Self {
        match result {
            Ok(Outcome::Reply(reply)) => Self {
                success: true,
                response: Some(reply.response),
                data: reply.data,
                agent: Some(reply.agent.to_string()),
                requires_validation: reply.requires_validation,
                source: reply.source.map(str::to_string),
                error: None,
            },
            Ok(Outcome::NeedsInput(message)) => Self {
                success: false,
                response: Some(message),
                ..Self::default()
            },
            Err(AgentError::Config) => {
                log::warn!("{}: provider credential not configured", kind.label());
                Self::failure(
                    AgentError::Config.to_string(),
                    Some(kind.missing_credential_response()),
                )
            }
            Err(e) => {
                log::error!("{} error: {}", kind.label(), e);
                Self::failure(e.to_string(), Some(kind.failure_response()))
            }
        }
    }

    /// Voice commands carry only `data` on success and only `error` on failure.
    pub fn from_voice(result: Result<Decoded<VoiceCommand>, AgentError>) -> Self {
        match result {
            Ok(command) => Self {
                success: true,
                data: Some(command.raw),
                ..Self::default()
            },
            Err(e) => {
                log::error!("voice command error: {}", e);
                Self::failure(e.to_string(), None)
            }
        }
    }

    /// Precondition failure answered before any handler ran.
    pub fn rejected(error: impl Into<String>, response: &str) -> Self {
        Self::failure(error.into(), Some(response))
    }

    fn failure(error: String, response: Option<&str>) -> Self {
        Self {
            success: false,
            error: Some(error),
            response: response.map(str::to_string),
            ..Self::default()
        }
    }
}
