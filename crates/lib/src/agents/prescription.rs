//! Prescription image to structured prescription data.
//!
//! The extracted object is returned as the model produced it; `PrescriptionRecord` is only
//! used to check that it carries a `medications` list and to count the entries.

use super::{require_configured, AgentError, AgentReply, Outcome};
use crate::codec::{self, Decoded};
use crate::image::EncodedImage;
use crate::llm::Provider;
use crate::prompt;
use crate::protocol::PrescriptionRecord;
use std::sync::Arc;

pub const AGENT_NAME: &str = "Prescription Parser";

pub struct PrescriptionAgent {
    provider: Arc<dyn Provider>,
}

impl PrescriptionAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub async fn process(&self, image: &EncodedImage) -> Result<Outcome, AgentError> {
        require_configured(self.provider.as_ref())?;
        let part = image.decode()?;
        let text = self.provider.generate(prompt::prescription(), Some(&part)).await?;
        let Decoded { record, raw } = codec::decode_with_raw::<PrescriptionRecord>(&text)?;
        let count = record.medications.len();
        log::info!("prescription: parsed {} medication(s)", count);
        Ok(Outcome::Reply(AgentReply {
            data: Some(raw),
            ..AgentReply::text(
                AGENT_NAME,
                format!(
                    "Successfully parsed prescription. Found {} medication(s).",
                    count
                ),
            )
        }))
    }
}
