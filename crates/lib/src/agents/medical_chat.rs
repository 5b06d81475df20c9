//! General medical conversation: text with history, or a single image question.

use super::{require_configured, AgentError, AgentReply, Outcome};
use crate::image::EncodedImage;
use crate::llm::Provider;
use crate::prompt;
use crate::protocol::ConversationTurn;
use std::sync::Arc;

pub const AGENT_NAME: &str = "Medical Conversation Agent";

pub struct MedicalChatAgent {
    provider: Arc<dyn Provider>,
}

impl MedicalChatAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub async fn process(
        &self,
        message: &str,
        history: &[ConversationTurn],
        image: Option<&EncodedImage>,
    ) -> Result<Outcome, AgentError> {
        require_configured(self.provider.as_ref())?;
        let text = match image {
            Some(image) => {
                let part = image.decode()?;
                let prompt = prompt::conversational_with_image(message);
                self.provider.generate(&prompt, Some(&part)).await?
            }
            None => {
                let prompt = prompt::conversational(history, message);
                self.provider.generate(&prompt, None).await?
            }
        };
        Ok(Outcome::Reply(AgentReply {
            requires_validation: Some(false),
            ..AgentReply::text(AGENT_NAME, text)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::StubProvider;

    #[tokio::test]
    async fn text_prompt_includes_history() {
        let stub = Arc::new(StubProvider::new().reply("Rest and fluids."));
        let agent = MedicalChatAgent::new(stub.clone());
        let history = vec![
            ConversationTurn::user("I have a cold"),
            ConversationTurn::assistant("Sorry to hear that.", Some(AGENT_NAME.to_string())),
        ];
        let out = agent.process("What helps?", &history, None).await.unwrap();
        let Outcome::Reply(reply) = out else {
            panic!("expected a reply");
        };
        assert_eq!(reply.response, "Rest and fluids.");
        assert_eq!(reply.requires_validation, Some(false));
        let call = &stub.calls()[0];
        assert!(call.prompt.contains("user: I have a cold\nassistant: Sorry to hear that.\n"));
        assert!(call.image.is_none());
    }

    #[tokio::test]
    async fn image_prompt_drops_history_and_attaches_image() {
        let stub = Arc::new(StubProvider::new().reply("Looks like mild eczema."));
        let agent = MedicalChatAgent::new(stub.clone());
        let history = vec![ConversationTurn::user("earlier question")];
        let image = EncodedImage::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]);
        agent
            .process("What is this rash?", &history, Some(&image))
            .await
            .unwrap();
        let call = &stub.calls()[0];
        assert!(!call.prompt.contains("earlier question"));
        assert!(call.prompt.contains("What is this rash?"));
        assert_eq!(call.image.as_ref().unwrap().mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn undecodable_image_fails_before_provider_call() {
        let stub = Arc::new(StubProvider::new());
        let agent = MedicalChatAgent::new(stub.clone());
        let image = EncodedImage::new("data:image/png;base64,%%%");
        let err = agent.process("what is this", &[], Some(&image)).await.unwrap_err();
        assert!(matches!(err, AgentError::Image(_)));
        assert_eq!(stub.call_count(), 0);
    }
}
