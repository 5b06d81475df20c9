//! Multi-agent mode: knowledge lookup, web search and image analysis sub-handlers.
//!
//! Web-search failures fall back to knowledge lookup; the caller only sees the
//! knowledge-lookup reply.

use super::{require_configured, AgentError, AgentReply, Outcome};
use crate::image::EncodedImage;
use crate::llm::Provider;
use crate::prompt;
use crate::routing::{self, SubHandler};
use std::sync::Arc;

pub const KNOWLEDGE_AGENT_NAME: &str = "Medical RAG Agent";
pub const KNOWLEDGE_SOURCE: &str = "Medical Knowledge Base";
pub const WEB_SEARCH_AGENT_NAME: &str = "Web Search Agent";
pub const WEB_SEARCH_SOURCE: &str = "Web Search";
pub const IMAGE_AGENT_NAME: &str = "Medical Image Analysis Agent";

const IMAGE_REQUIRED_MESSAGE: &str = "Please provide an image for analysis.";

pub struct MultiAgentSystem {
    provider: Arc<dyn Provider>,
}

impl MultiAgentSystem {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub async fn process(
        &self,
        message: &str,
        image: Option<&EncodedImage>,
    ) -> Result<Outcome, AgentError> {
        require_configured(self.provider.as_ref())?;
        let sub = routing::classify_sub_handler(message, image.is_some());
        log::debug!("multi-agent: sub-handler {:?}", sub);
        match sub {
            SubHandler::ImageAnalysis => self.image_analysis(message, image).await,
            SubHandler::WebSearch => self.web_search(message).await,
            SubHandler::KnowledgeLookup => self.knowledge_lookup(message).await,
        }
    }

    async fn knowledge_lookup(&self, query: &str) -> Result<Outcome, AgentError> {
        let text = self
            .provider
            .generate(&prompt::knowledge_lookup(query), None)
            .await?;
        Ok(Outcome::Reply(AgentReply {
            source: Some(KNOWLEDGE_SOURCE),
            ..AgentReply::text(KNOWLEDGE_AGENT_NAME, text)
        }))
    }

    async fn web_search(&self, query: &str) -> Result<Outcome, AgentError> {
        match self.provider.generate(&prompt::web_search(query), None).await {
            Ok(text) => Ok(Outcome::Reply(AgentReply {
                source: Some(WEB_SEARCH_SOURCE),
                ..AgentReply::text(WEB_SEARCH_AGENT_NAME, text)
            })),
            Err(e) => {
                log::warn!("web search failed, falling back to knowledge lookup: {}", e);
                self.knowledge_lookup(query).await
            }
        }
    }

    async fn image_analysis(
        &self,
        query: &str,
        image: Option<&EncodedImage>,
    ) -> Result<Outcome, AgentError> {
        let Some(image) = image else {
            return Ok(Outcome::NeedsInput(IMAGE_REQUIRED_MESSAGE.to_string()));
        };
        let part = image.decode()?;
        let text = self
            .provider
            .generate(&prompt::image_analysis(query), Some(&part))
            .await?;
        Ok(Outcome::Reply(AgentReply {
            requires_validation: Some(true),
            ..AgentReply::text(IMAGE_AGENT_NAME, text)
        }))
    }
}
