//! Configuration for the review pipeline.

use std::path::Path;
use std::time::Duration;

use redline_docx::{InjectionOptions, ParserConfig};
use redline_locator::GeminiLocator;
use redline_locator::gemini::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Suffix appended to the source file stem for the commented copy.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_commented";

/// Configuration for a review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Marker label in review text, as in `[paragraph 5]`.
    pub paragraph_label: String,

    /// Author written on injected comments.
    pub author: String,

    /// Initials written on injected comments.
    pub initials: String,

    /// Suffix for the default output file name.
    pub output_suffix: String,

    /// Keep a leading quoted target in the comment text.
    pub keep_quoted_target: bool,

    /// Comment locator configuration.
    pub locator: LocatorConfig,
}

impl ReviewConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        let injection = InjectionOptions::default();
        Self {
            paragraph_label: ParserConfig::default().label,
            author: injection.author,
            initials: injection.initials,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            keep_quoted_target: injection.keep_quoted_target,
            locator: LocatorConfig::default(),
        }
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<()> {
        if self.paragraph_label.trim().is_empty() {
            return Err(PipelineError::Config("paragraph_label is empty".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(PipelineError::Config("author is empty".to_string()));
        }
        if self.locator.enabled && self.locator.max_attempts == 0 {
            return Err(PipelineError::Config("locator.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Set the paragraph marker label.
    pub fn with_paragraph_label(mut self, label: impl Into<String>) -> Self {
        self.paragraph_label = label.into();
        self
    }

    /// Set the comment author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_initials(mut self, initials: impl Into<String>) -> Self {
        self.initials = initials.into();
        self
    }

    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    pub fn with_keep_quoted_target(mut self, keep: bool) -> Self {
        self.keep_quoted_target = keep;
        self
    }

    /// Set the locator configuration.
    pub fn with_locator(mut self, config: LocatorConfig) -> Self {
        self.locator = config;
        self
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig::default().with_label(self.paragraph_label.clone())
    }

    pub fn injection_options(&self) -> InjectionOptions {
        InjectionOptions::default()
            .with_author(self.author.clone())
            .with_initials(self.initials.clone())
            .with_keep_quoted_target(self.keep_quoted_target)
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the model-backed comment locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Whether to refine whole-paragraph comments at all.
    pub enabled: bool,

    /// API base URL.
    pub base_url: String,

    /// Model to use.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Per-request timeout (in seconds).
    pub timeout_secs: u64,

    /// Attempts per paragraph, including the first.
    pub max_attempts: u32,
}

impl LocatorConfig {
    /// A configuration that never calls out.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Build the Gemini locator this configuration describes.
    pub fn build(&self) -> GeminiLocator {
        GeminiLocator::from_env(&self.api_key_env)
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_attempts(self.max_attempts)
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: API_KEY_ENV.to_string(),
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}
