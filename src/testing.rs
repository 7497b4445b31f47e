//! Testing utilities: an in-memory [`VisionModel`].
//!
//! [`ScriptedVisionModel`] answers each call with the next queued reply
//! and records what it was asked, so extraction runs can be driven end to
//! end without network access or API keys.

use crate::config::{Provider, ProviderCredentials};
use crate::error::ExtractError;
use crate::pipeline::encode::ImagePayload;
use crate::pipeline::llm::VisionModel;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Record of one call made to the scripted model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub provider: Provider,
    pub mime_type: String,
    pub prompt: String,
    pub data_len: usize,
}

/// A vision model that replays queued replies in order.
///
/// Once the script runs out every further call fails with
/// [`ExtractError::Internal`].
#[derive(Debug, Default)]
pub struct ScriptedVisionModel {
    replies: Mutex<VecDeque<Result<String, ExtractError>>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedVisionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw text answer.
    pub fn with_text(self, raw: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Ok(raw.into()));
        self
    }

    /// Queue one JSON answer per value.
    pub fn with_json_pages(self, pages: impl IntoIterator<Item = serde_json::Value>) -> Self {
        {
            let mut replies = lock(&self.replies);
            for page in pages {
                replies.push_back(Ok(page.to_string()));
            }
        }
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ExtractError) -> Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// Queue a non-2xx answer from `provider`.
    pub fn with_http_error(self, provider: Provider, status: u16, body: impl Into<String>) -> Self {
        self.with_error(ExtractError::Transport {
            provider: provider.to_string(),
            status,
            body: body.into(),
        })
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        lock(&self.calls).clone()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl VisionModel for ScriptedVisionModel {
    async fn transcribe(
        &self,
        image: &ImagePayload,
        prompt: &str,
        credentials: &ProviderCredentials,
    ) -> Result<String, ExtractError> {
        lock(&self.calls).push(ScriptedCall {
            provider: credentials.provider,
            mime_type: image.mime_type.clone(),
            prompt: prompt.to_string(),
            data_len: image.data.len(),
        });
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(ExtractError::Internal("scripted replies exhausted".into())))
    }
}
