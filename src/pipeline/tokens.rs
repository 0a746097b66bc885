//! Token budget: estimate the request size before paying for it.
//!
//! Counts use `cl100k_base`, the GPT-4 encoding. DeepSeek's own tokenizer
//! differs slightly, so the figure is an estimate: the guard may fire a
//! little early or late relative to the server's enforcement.

use crate::error::Invoice2XmlError;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Token counter for the system + user messages of one request.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Load the `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self, Invoice2XmlError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Invoice2XmlError::Internal(format!("tokenizer: {e}")))?;
        Ok(Self { bpe })
    }

    /// Tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Tokens in the system message plus tokens in the user message.
    ///
    /// Chat framing tokens (role markers) are not included.
    pub fn count_message_tokens(&self, system: &str, user: &str) -> usize {
        let system_tokens = self.count(system);
        let user_tokens = self.count(user);
        debug!(
            "Token estimate: {} system + {} user",
            system_tokens, user_tokens
        );
        system_tokens + user_tokens
    }
}

/// Reject `count` when it exceeds `limit`. Equal to the limit is accepted.
pub fn check_budget(count: usize, limit: usize) -> Result<(), Invoice2XmlError> {
    if count > limit {
        return Err(Invoice2XmlError::TokenLimitExceeded { count, limit });
    }
    Ok(())
}
