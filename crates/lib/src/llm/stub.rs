//! Scripted provider for tests: replays queued replies and records every call.

use super::{Provider, ProviderError};
use crate::image::ImagePart;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StubCall {
    pub prompt: String,
    pub image: Option<ImagePart>,
}

pub struct StubProvider {
    configured: bool,
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<StubCall>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            configured: true,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider with no credential; any call is a test failure.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(reason.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImagePart>,
    ) -> Result<String, ProviderError> {
        assert!(self.configured, "generate called on an unconfigured provider");
        self.calls.lock().unwrap().push(StubCall {
            prompt: prompt.to_string(),
            image: image.cloned(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ProviderError::Api(reason)),
            None => Err(ProviderError::Api("no scripted reply".to_string())),
        }
    }
}
