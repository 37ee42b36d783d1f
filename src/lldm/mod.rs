//! # LLDM Module
//!
//! The content provider seam: where candidate levels come from.
//!
//! A provider is usually a language model ("LLM dungeon master") and is
//! treated as unreliable. It can fail transiently, run out of quota for the
//! rest of the session, or answer with a level that is structurally broken
//! or disconnected. Everything past this seam assumes the worst.

pub mod offline;
pub mod prompt;
pub mod text_model;

pub use offline::*;
pub use prompt::*;
pub use text_model::*;

use crate::RawPayload;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Failure reported by a content provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transient fault; retrying later may succeed
    #[error("recoverable provider fault: {0}")]
    Recoverable(String),
    /// The provider will refuse every request for the rest of the session
    #[error("provider quota exhausted: {0}")]
    QuotaExhausted(String),
}

impl ProviderError {
    /// Classifies a raw provider error message.
    ///
    /// Rate-limit responses (HTTP 429 or `RESOURCE_EXHAUSTED`) are quota
    /// exhaustion; anything else is treated as transient.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::ProviderError;
    ///
    /// assert!(ProviderError::classify("status 429: slow down").is_quota_exhausted());
    /// assert!(!ProviderError::classify("connection reset").is_quota_exhausted());
    /// ```
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
            ProviderError::QuotaExhausted(message)
        } else {
            ProviderError::Recoverable(message)
        }
    }

    /// Checks for the quota exhaustion class.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, ProviderError::QuotaExhausted(_))
    }
}

/// Source of raw candidate levels.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Requests one candidate level.
    async fn request_level(
        &self,
        ordinal: u32,
        hint: &DifficultyHint,
    ) -> Result<RawPayload, ProviderError>;

    /// Name used in logs.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<P: ContentProvider + ?Sized> ContentProvider for Arc<P> {
    async fn request_level(
        &self,
        ordinal: u32,
        hint: &DifficultyHint,
    ) -> Result<RawPayload, ProviderError> {
        (**self).request_level(ordinal, hint).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

/// Session-wide record that the provider's quota is gone.
///
/// Clones share the same flag. It only ever goes from clear to set, except
/// through an explicit [`QuotaFlag::reset`] by the owner of the session.
#[derive(Debug, Clone, Default)]
pub struct QuotaFlag {
    exhausted: Arc<AtomicBool>,
}

impl QuotaFlag {
    /// Creates a clear flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the provider has been marked exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Marks the provider exhausted.
    pub fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::Release);
    }

    /// Clears the flag, e.g. when a new session starts.
    pub fn reset(&self) {
        self.exhausted.store(false, Ordering::Release);
    }
}
