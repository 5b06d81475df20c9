//! Request handlers and the dispatch that routes a chat request to one of them.
//!
//! Handlers return `Result<Outcome, AgentError>`; `crate::envelope` turns that into the
//! wire envelope exactly once, at the request boundary.

mod medical_chat;
mod multi_agent;
mod prescription;
mod voice;

pub use medical_chat::MedicalChatAgent;
pub use multi_agent::MultiAgentSystem;
pub use prescription::PrescriptionAgent;
pub use voice::VoiceCommandParser;

use crate::codec::CodecError;
use crate::envelope::ResultEnvelope;
use crate::image::{EncodedImage, ImageError};
use crate::llm::{Provider, ProviderError};
use crate::protocol::ChatRequest;
use crate::routing::{self, Mode};
use serde_json::Value;
use std::sync::Arc;

/// Failure inside a handler. Every variant ends up as a `success: false` envelope.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("API Key missing")]
    Config,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Successful handler result.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub response: String,
    pub data: Option<Value>,
    pub agent: &'static str,
    pub requires_validation: Option<bool>,
    pub source: Option<&'static str>,
}

impl AgentReply {
    pub fn text(agent: &'static str, response: String) -> Self {
        Self {
            response,
            data: None,
            agent,
            requires_validation: None,
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(AgentReply),
    /// The handler cannot proceed without more input from the caller (not an error).
    NeedsInput(String),
}

/// Which handler produced a result; selects the fallback texts of failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    MedicalChat,
    Prescription,
    MultiAgent,
}

impl AgentKind {
    pub fn label(self) -> &'static str {
        match self {
            AgentKind::MedicalChat => "medical conversation",
            AgentKind::Prescription => "prescription parsing",
            AgentKind::MultiAgent => "multi-agent",
        }
    }

    pub fn missing_credential_response(self) -> &'static str {
        match self {
            AgentKind::MedicalChat => "API Key is missing. Please configure GOOGLE_API_KEY.",
            AgentKind::Prescription | AgentKind::MultiAgent => "API Key is missing.",
        }
    }

    pub fn failure_response(self) -> &'static str {
        match self {
            AgentKind::MedicalChat => {
                "I apologize, but I encountered an error processing your request. Please try again."
            }
            AgentKind::Prescription => {
                "Failed to parse prescription. Please ensure the image is clear and try again."
            }
            AgentKind::MultiAgent => {
                "I encountered an error processing your request with the multi-agent system."
            }
        }
    }
}

impl From<Mode> for AgentKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Prescription => AgentKind::Prescription,
            Mode::MultiAgent => AgentKind::MultiAgent,
            Mode::Auto | Mode::MedicalChat => AgentKind::MedicalChat,
        }
    }
}

/// Request refused before any handler runs (answered with a 400-class status).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Invalid agent type")]
    InvalidMode(String),
    #[error("Image required for prescription parsing")]
    ImageRequired,
}

impl Rejection {
    pub fn into_envelope(self) -> ResultEnvelope {
        let response = match self {
            Rejection::InvalidMode(_) => {
                "Use one of: auto, medical-chat, prescription, multi-agent."
            }
            Rejection::ImageRequired => "Please attach a prescription image.",
        };
        ResultEnvelope::rejected(self.to_string(), response)
    }
}

/// The three logical handlers plus the voice parser, all sharing one provider.
pub struct Agents {
    pub medical_chat: MedicalChatAgent,
    pub prescription: PrescriptionAgent,
    pub multi_agent: MultiAgentSystem,
    pub voice: VoiceCommandParser,
}

impl Agents {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            medical_chat: MedicalChatAgent::new(provider.clone()),
            prescription: PrescriptionAgent::new(provider.clone()),
            multi_agent: MultiAgentSystem::new(provider.clone()),
            voice: VoiceCommandParser::new(provider),
        }
    }

    /// Resolve the mode, check preconditions, run the handler and wrap its result.
    pub async fn chat(&self, request: ChatRequest) -> Result<ResultEnvelope, Rejection> {
        let requested = match request.mode.as_deref() {
            None => Mode::Auto,
            Some(raw) => raw
                .parse::<Mode>()
                .map_err(|e| Rejection::InvalidMode(e.0))?,
        };
        let image = EncodedImage::from_optional(request.image);
        let mode = routing::resolve_mode(requested, &request.message, image.is_some());
        log::info!("chat: requested {}, routed to {}", requested, mode);

        let result = match mode {
            Mode::Prescription => {
                let image = image.ok_or(Rejection::ImageRequired)?;
                self.prescription.process(&image).await
            }
            Mode::MultiAgent => {
                self.multi_agent
                    .process(&request.message, image.as_ref())
                    .await
            }
            Mode::Auto | Mode::MedicalChat => {
                self.medical_chat
                    .process(&request.message, &request.history, image.as_ref())
                    .await
            }
        };
        Ok(ResultEnvelope::from_outcome(mode.into(), result))
    }

    /// Dedicated prescription endpoint; a blank image is the same precondition failure as in chat.
    pub async fn parse_prescription(&self, image: String) -> Result<ResultEnvelope, Rejection> {
        let image = EncodedImage::from_optional(Some(image)).ok_or(Rejection::ImageRequired)?;
        let result = self.prescription.process(&image).await;
        Ok(ResultEnvelope::from_outcome(AgentKind::Prescription, result))
    }

    pub async fn voice_command(&self, text: &str) -> ResultEnvelope {
        ResultEnvelope::from_voice(self.voice.process(text).await)
    }
}

/// Credential check shared by every handler; runs before any provider call.
fn require_configured(provider: &dyn Provider) -> Result<(), AgentError> {
    if provider.is_configured() {
        Ok(())
    } else {
        Err(AgentError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::StubProvider;
    use crate::protocol::ConversationTurn;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn request(message: &str, image: Option<String>, mode: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            history: Vec::new(),
            image,
            mode: mode.map(str::to_string),
        }
    }

    fn png() -> Option<String> {
        Some(format!(
            "data:image/png;base64,{}",
            EncodedImage::from_bytes(PNG).as_str()
        ))
    }

    #[tokio::test]
    async fn flu_question_goes_to_medical_chat() {
        let stub = Arc::new(StubProvider::new().reply("Fever, cough, aches. Not medical advice."));
        let agents = Agents::new(stub.clone());
        let env = agents
            .chat(request("What are symptoms of flu?", None, Some("auto")))
            .await
            .unwrap();
        assert!(env.success);
        assert_eq!(env.agent.as_deref(), Some("Medical Conversation Agent"));
        assert!(!env.response.unwrap_or_default().is_empty());
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn prescription_with_image_returns_medications() {
        let reply = r#"```json
{"medications":[{"name":"Amoxicillin","quantity":21,"dose":"500mg","frequency":"three times daily","confidence":0.92}],
 "patient":{"name":"A. Patel","dob":null},"doctor":{"name":null},"date":"2025-01-04","human_review_required":false}
```"#;
        let stub = Arc::new(StubProvider::new().reply(reply));
        let agents = Agents::new(stub.clone());
        let env = agents
            .chat(request("parse this prescription", png(), None))
            .await
            .unwrap();
        assert!(env.success);
        assert_eq!(env.agent.as_deref(), Some("Prescription Parser"));
        let meds = env.data.as_ref().unwrap()["medications"].as_array().unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0]["name"], "Amoxicillin");
        let calls = stub.calls();
        assert_eq!(calls[0].image.as_ref().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn explicit_prescription_without_image_is_rejected_without_provider_call() {
        let stub = Arc::new(StubProvider::new());
        let agents = Agents::new(stub.clone());
        let err = agents
            .chat(request("hello", None, Some("prescription")))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::ImageRequired);
        assert_eq!(stub.call_count(), 0);
        let env = err.into_envelope();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Image required for prescription parsing"));
    }

    #[tokio::test]
    async fn blank_image_counts_as_missing() {
        let stub = Arc::new(StubProvider::new());
        let agents = Agents::new(stub.clone());
        let err = agents.parse_prescription("  ".to_string()).await.unwrap_err();
        assert_eq!(err, Rejection::ImageRequired);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let agents = Agents::new(Arc::new(StubProvider::new()));
        let err = agents
            .chat(request("hi", None, Some("surgeon")))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidMode("surgeon".to_string()));
        assert_eq!(err.into_envelope().error.as_deref(), Some("Invalid agent type"));
    }

    #[tokio::test]
    async fn explicit_mode_bypasses_keywords() {
        let stub = Arc::new(StubProvider::new().reply("plain answer"));
        let agents = Agents::new(stub.clone());
        let env = agents
            .chat(request("latest research on x-ray scan", None, Some("medical-chat")))
            .await
            .unwrap();
        assert_eq!(env.agent.as_deref(), Some("Medical Conversation Agent"));
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let stub = Arc::new(StubProvider::unconfigured());
        let agents = Agents::new(stub.clone());
        let env = agents
            .chat(request("What are symptoms of flu?", None, None))
            .await
            .unwrap();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("API Key missing"));
        assert_eq!(
            env.response.as_deref(),
            Some("API Key is missing. Please configure GOOGLE_API_KEY.")
        );
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_failure_becomes_apology_envelope() {
        let stub = Arc::new(StubProvider::new().fail("quota exceeded"));
        let agents = Agents::new(stub);
        let mut req = request("hello", None, None);
        req.history.push(ConversationTurn::user("earlier"));
        let env = agents.chat(req).await.unwrap();
        assert!(!env.success);
        assert!(env.error.unwrap().contains("quota exceeded"));
        assert_eq!(
            env.response.as_deref(),
            Some(AgentKind::MedicalChat.failure_response())
        );
        assert!(env.data.is_none());
    }

    #[tokio::test]
    async fn voice_command_add() {
        let stub = Arc::new(StubProvider::new().reply(
            r#"{"intent":"add","medication_name":"paracetamol","quantity":2,"confidence":0.9}"#,
        ));
        let agents = Agents::new(stub);
        let env = agents.voice_command("add paracetamol 2 tablets").await;
        assert!(env.success);
        assert_eq!(env.data.as_ref().unwrap()["intent"], "add");
        assert_eq!(env.data.as_ref().unwrap()["medication_name"], "paracetamol");
        assert_eq!(env.data.as_ref().unwrap()["quantity"].as_u64(), Some(2));
    }
}
