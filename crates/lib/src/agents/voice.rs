//! Spoken ordering commands ("add paracetamol 2 tablets") to structured command data.

use super::{require_configured, AgentError};
use crate::codec::{self, Decoded};
use crate::llm::Provider;
use crate::prompt;
use crate::protocol::VoiceCommand;
use std::sync::Arc;

pub struct VoiceCommandParser {
    provider: Arc<dyn Provider>,
}

impl VoiceCommandParser {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub async fn process(&self, utterance: &str) -> Result<Decoded<VoiceCommand>, AgentError> {
        require_configured(self.provider.as_ref())?;
        let text = self
            .provider
            .generate(&prompt::voice_command(utterance), None)
            .await?;
        let command = codec::decode_with_raw::<VoiceCommand>(&text)?;
        log::debug!("voice: intent {:?}", command.record.intent);
        Ok(command)
    }
}
