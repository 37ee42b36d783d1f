//! # Text Model Provider
//!
//! Adapts a prompt-in, text-out language model to the [`ContentProvider`] seam.

use crate::{ContentProvider, DifficultyHint, LevelPrompt, ProviderError, RawPayload};
use async_trait::async_trait;
use log::{debug, warn};

/// A language model endpoint.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Completes a prompt. Errors are raw messages from the transport.
    async fn complete(&self, prompt: &str) -> Result<String, String>;
}

/// Content provider backed by a [`TextModel`].
pub struct TextModelProvider<M> {
    model: M,
    prompt: LevelPrompt,
}

impl<M: TextModel> TextModelProvider<M> {
    /// Wraps a model.
    pub fn new(model: M) -> Self {
        Self {
            model,
            prompt: LevelPrompt::new(),
        }
    }
}

#[async_trait]
impl<M: TextModel> ContentProvider for TextModelProvider<M> {
    async fn request_level(
        &self,
        ordinal: u32,
        hint: &DifficultyHint,
    ) -> Result<RawPayload, ProviderError> {
        let prompt = self.prompt.render(hint);
        debug!("Requesting level {} ({} prompt bytes)", ordinal, prompt.len());

        let text = self
            .model
            .complete(&prompt)
            .await
            .map_err(ProviderError::classify)?;

        // A model that answers with garbage may answer properly next time
        RawPayload::from_json(&text).map_err(|e| {
            warn!("Model response for level {} did not parse: {}", ordinal, e);
            ProviderError::Recoverable(e.to_string())
        })
    }

    fn provider_name(&self) -> &'static str {
        "text-model"
    }
}
