//! Engine configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! enabled: true
//! testIdHeader: x-scenarist-test-id
//! defaultTestId: local
//! unmatched: notImplemented      # or passthrough
//! errorBehaviors:
//!   noMockFound: warn            # throw | warn | ignore
//!   missingTestId: throw
//! logging:
//!   level: info
//!   format: json                 # or pretty
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TEST_ID_HEADER: &str = "x-scenarist-test-id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// A disabled engine passes every request through untouched
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Request header carrying the test id (case-insensitive)
    #[serde(default = "default_test_id_header")]
    pub test_id_header: String,

    /// Test id used when a request carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_test_id: Option<String>,

    #[serde(default)]
    pub unmatched: UnmatchedPolicy,

    #[serde(default)]
    pub error_behaviors: ErrorBehaviors,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_test_id_header() -> String {
    DEFAULT_TEST_ID_HEADER.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            test_id_header: default_test_id_header(),
            default_test_id: None,
            unmatched: UnmatchedPolicy::default(),
            error_behaviors: ErrorBehaviors::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML (or JSON) file and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.test_id_header.trim().is_empty() {
            anyhow::bail!("'testIdHeader' must not be empty");
        }
        if self.test_id_header.chars().any(|c| c.is_whitespace() || c == ':') {
            anyhow::bail!(
                "Invalid 'testIdHeader': '{}'. Header names cannot contain whitespace or ':'",
                self.test_id_header
            );
        }
        if let Some(id) = &self.default_test_id {
            if id.trim().is_empty() {
                anyhow::bail!("'defaultTestId' must not be empty when set");
            }
        }
        Ok(())
    }

    pub fn with_default_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.default_test_id = Some(test_id.into());
        self
    }

    pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    pub fn with_error_behaviors(mut self, behaviors: ErrorBehaviors) -> Self {
        self.error_behaviors = behaviors;
        self
    }
}

/// What the transport layer should do with a request no mock answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnmatchedPolicy {
    /// Forward the real request
    #[default]
    Passthrough,
    /// Answer with a synthesized 501
    NotImplemented,
}

/// How a request-time error is surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBehavior {
    /// Fail the request with the error
    #[default]
    Throw,
    /// Log a warning, then apply the unmatched policy
    Warn,
    /// Silently apply the unmatched policy
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBehaviors {
    #[serde(default)]
    pub no_mock_found: ErrorBehavior,
    #[serde(default)]
    pub missing_test_id: ErrorBehavior,
}

impl ErrorBehaviors {
    /// Behavior configured for an error. Registration errors always throw.
    pub fn for_error(&self, error: &EngineError) -> ErrorBehavior {
        match error {
            EngineError::NoMockFound { .. } | EngineError::NoStateMatch { .. } => {
                self.no_mock_found
            }
            EngineError::MissingTestId { .. } => self.missing_test_id,
            _ => ErrorBehavior::Throw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
