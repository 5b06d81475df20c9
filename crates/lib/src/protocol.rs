//! Request and record types shared by the gateway, the handlers and the CLI client.

use serde::{Deserialize, Serialize};

/// One prior turn of the conversation, supplied by the caller (oldest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl ConversationTurn {
    fn now(role: &str, content: impl Into<String>, agent: Option<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            agent,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::now("user", content, None)
    }

    pub fn assistant(content: impl Into<String>, agent: Option<String>) -> Self {
        Self::now("assistant", content, agent)
    }
}

/// Body of `POST /api/chat`. `mode` is kept as text so an unknown value can be reported as 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, alias = "agent_type", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Body of `POST /api/prescription/parse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionParseRequest {
    pub image: String,
}

/// Body of `POST /api/voice/command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCommandRequest {
    pub text: String,
}

/// Typed view of a prescription extraction. Only `medications` is required; the model
/// may null out anything it could not read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub patient: Option<Patient>,
    #[serde(default)]
    pub doctor: Option<Doctor>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub human_review_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    /// Model's confidence in this line, 0.0 to 1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(default)]
    pub name: Option<String>,
}

/// Typed view of a parsed voice command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCommand {
    #[serde(default)]
    pub intent: Option<VoiceIntent>,
    #[serde(default)]
    pub medication_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceIntent {
    Add,
    Remove,
    Confirm,
    Done,
    #[serde(other)]
    Unknown,
}
