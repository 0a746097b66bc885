//! Configuration for one invoice-to-XML run.
//!
//! Every path, credential and model knob lives in [`PipelineConfig`], built
//! through [`PipelineConfigBuilder`] and handed to [`crate::run::Pipeline`]
//! at construction time. Nothing is read from globals; the CLI maps its flags
//! and environment variables onto the builder.
//!
//! [`PipelineConfigBuilder::build`] does not look at the API key; that is the
//! Preflight stage ([`PipelineConfig::validate_credential`]), so a bad key is
//! printed and logged like any other stage failure.

use crate::error::Invoice2XmlError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use std::fmt;
use std::path::PathBuf;

/// Default file the model's XML is written to.
pub const DEFAULT_OUTPUT_PATH: &str = "factura_processed.xml";

/// Default append-only error log.
pub const DEFAULT_LOG_PATH: &str = "error.log";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Token ceiling shared by the input budget and the requested output size.
pub const DEFAULT_TOKEN_LIMIT: usize = 8192;

/// Marker every accepted API key must contain.
const CREDENTIAL_MARKER: &str = "sk-";

/// Configuration for a single invoice conversion.
///
/// # Example
/// ```rust
/// use invoice2xml::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .pdf_path("facturaPDF.pdf")
///     .prompt_path("prompt.txt")
///     .api_key("sk-test")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 8192);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Invoice PDF to convert.
    pub pdf_path: PathBuf,

    /// Plain-text instruction template prepended to the PDF text.
    pub prompt_path: PathBuf,

    /// Where the model's reply is written. Default: `factura_processed.xml`.
    pub output_path: PathBuf,

    /// Append-only error log. Default: `error.log`.
    pub log_path: PathBuf,

    /// Bearer token for the completion endpoint.
    pub api_key: Option<String>,

    /// Endpoint root; `/chat/completions` is appended. Default: `https://api.deepseek.com`.
    pub base_url: String,

    /// Model identifier sent in the request body. Default: `deepseek-chat`.
    pub model: String,

    /// System turn of the conversation.
    pub system_prompt: String,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    pub max_tokens: usize,

    /// Ceiling for the estimated system + user tokens. Default: 8192.
    ///
    /// Shares its default with `max_tokens`: the budget does not reserve
    /// room for the reply. The orchestrator warns when the two overlap.
    pub token_limit: usize,

    /// Per-request timeout in seconds. `None` keeps the HTTP client default.
    pub api_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::new(),
            prompt_path: PathBuf::new(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.1,
            max_tokens: DEFAULT_TOKEN_LIMIT,
            token_limit: DEFAULT_TOKEN_LIMIT,
            api_timeout_secs: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pdf_path", &self.pdf_path)
            .field("prompt_path", &self.prompt_path)
            .field("output_path", &self.output_path)
            .field("log_path", &self.log_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("token_limit", &self.token_limit)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Preflight: the key must be present and contain `sk-`.
    ///
    /// A superficial check only; the server is the authority on whether the
    /// key actually works.
    pub fn validate_credential(&self) -> Result<&str, Invoice2XmlError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() && key.contains(CREDENTIAL_MARKER) => Ok(key),
            _ => Err(Invoice2XmlError::InvalidCredential),
        }
    }

    /// `true` when the input budget plus the requested reply size exceed the ceiling.
    pub fn reply_budget_overlaps(&self, estimated_tokens: usize) -> bool {
        estimated_tokens.saturating_add(self.max_tokens) > self.token_limit
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf_path = path.into();
        self
    }

    pub fn prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.prompt_path = path.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn token_limit(mut self, n: usize) -> Self {
        self.config.token_limit = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Invoice2XmlError> {
        let c = &self.config;
        for (name, path) in [
            ("pdf_path", &c.pdf_path),
            ("prompt_path", &c.prompt_path),
            ("output_path", &c.output_path),
            ("log_path", &c.log_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Invoice2XmlError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
        }
        if c.base_url.trim().is_empty() {
            return Err(Invoice2XmlError::InvalidConfig(
                "base_url must not be empty".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Invoice2XmlError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 || c.token_limit == 0 {
            return Err(Invoice2XmlError::InvalidConfig(
                "max_tokens and token_limit must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineConfigBuilder {
        PipelineConfig::builder()
            .pdf_path("factura.pdf")
            .prompt_path("prompt.txt")
    }

    #[test]
    fn defaults_target_deepseek() {
        let c = base().build().unwrap();
        assert_eq!(c.output_path, PathBuf::from("factura_processed.xml"));
        assert_eq!(c.log_path, PathBuf::from("error.log"));
        assert_eq!(c.base_url, "https://api.deepseek.com");
        assert_eq!(c.model, "deepseek-chat");
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 8192);
        assert_eq!(c.token_limit, 8192);
        assert!(c.api_timeout_secs.is_none());
    }

    #[test]
    fn missing_pdf_path_rejected() {
        let err = PipelineConfig::builder()
            .prompt_path("prompt.txt")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pdf_path"));
    }

    #[test]
    fn temperature_is_clamped() {
        let c = base().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn credential_checks() {
        assert!(matches!(
            base().build().unwrap().validate_credential(),
            Err(Invoice2XmlError::InvalidCredential)
        ));
        assert!(base()
            .api_key("   ")
            .build()
            .unwrap()
            .validate_credential()
            .is_err());
        assert!(base()
            .api_key("not-a-key")
            .build()
            .unwrap()
            .validate_credential()
            .is_err());
        assert_eq!(
            base()
                .api_key("sk-abc123")
                .build()
                .unwrap()
                .validate_credential()
                .unwrap(),
            "sk-abc123"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let c = base().api_key("sk-very-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("very-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn default_budget_leaves_no_room_for_reply() {
        let c = base().build().unwrap();
        assert!(c.reply_budget_overlaps(1));
        let roomy = base().token_limit(16384).build().unwrap();
        assert!(!roomy.reply_budget_overlaps(100));
    }
}
