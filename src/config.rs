use serde::Deserialize;

use crate::chat::display::DEFAULT_COLLAPSE_THRESHOLD;

/// Default `generateContent` URL for the hosted model.
const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Supports ${ENV_VAR} substitution
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Send a short test prompt at startup and log the outcome
    #[serde(default)]
    pub probe_on_start: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    /// Subject the instructional prompt asks the model to teach
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,
}

/// Which answer wins when a completion fails and the question also
/// matches one of the canned answers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// The canned answer replaces the diagnostic message for any failure.
    #[default]
    CannedFirst,
    /// Canned answers only cover undecodable responses; remote and
    /// transport errors always surface their guidance.
    DiagnosticFirst,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Assistant messages longer than this (in chars) render collapsed
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_subject() -> String {
    "quantum computing".to_string()
}

fn default_welcome_message() -> String {
    "Hello! I'm your Quantum Learning Assistant. Ask me anything about quantum computing, \
     or type /topics to pick a topic to get started!"
        .to_string()
}

fn default_collapse_threshold() -> usize {
    DEFAULT_COLLAPSE_THRESHOLD
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            welcome_message: default_welcome_message(),
            fallback_policy: FallbackPolicy::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: default_collapse_threshold(),
        }
    }
}

impl LlmConfig {
    /// Builds a config with default generation parameters and the given key.
    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: api_key.to_string(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_on_start: false,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${GEMINI_API_KEY}
        let expanded = shellexpand::env(&content)?;
        Self::parse(&expanded)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.llm.api_key.trim().is_empty() {
            anyhow::bail!("llm.api_key must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ── parse tests ─────────────────────────────────────

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config = Config::parse("[llm]\napi_key = \"test-key\"\n").unwrap();
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.top_p, 0.95);
        assert_eq!(config.llm.top_k, 40);
        assert_eq!(config.llm.max_output_tokens, 2048);
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert!(!config.llm.probe_on_start);
        assert_eq!(config.assistant.subject, "quantum computing");
        assert_eq!(config.assistant.fallback_policy, FallbackPolicy::CannedFirst);
        assert_eq!(config.display.collapse_threshold, 1000);
    }

    #[test]
    fn test_parse_overrides() {
        let toml = r#"
[llm]
endpoint = "http://localhost:8080/generate"
api_key = "k"
temperature = 0.2
top_k = 8
max_output_tokens = 512
probe_on_start = true

[assistant]
subject = "linear algebra"
fallback_policy = "diagnostic_first"

[display]
collapse_threshold = 200
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.llm.endpoint, "http://localhost:8080/generate");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.top_k, 8);
        assert_eq!(config.llm.max_output_tokens, 512);
        assert!(config.llm.probe_on_start);
        assert_eq!(config.assistant.subject, "linear algebra");
        assert_eq!(
            config.assistant.fallback_policy,
            FallbackPolicy::DiagnosticFirst
        );
        assert_eq!(config.display.collapse_threshold, 200);
    }

    #[test]
    fn test_parse_rejects_empty_api_key() {
        let result = Config::parse("[llm]\napi_key = \"  \"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("api_key"));
    }

    #[test]
    fn test_parse_rejects_missing_llm_section() {
        assert!(Config::parse("[display]\ncollapse_threshold = 10\n").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        let toml = "[llm]\napi_key = \"k\"\n[assistant]\nfallback_policy = \"random\"\n";
        assert!(Config::parse(toml).is_err());
    }

    // ── load tests ──────────────────────────────────────

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("QTALK_TEST_API_KEY", "from-env");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\napi_key = \"${{QTALK_TEST_API_KEY}}\"").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.llm.api_key, "from-env");
    }

    #[test]
    fn test_load_missing_env_var_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\napi_key = \"${{QTALK_TEST_UNSET_VARIABLE}}\"").unwrap();
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/nonexistent/qtalk.toml").is_err());
    }

    #[test]
    fn test_with_api_key_defaults() {
        let llm = LlmConfig::with_api_key("abc");
        assert_eq!(llm.api_key, "abc");
        assert_eq!(llm.top_p, 0.95);
        assert_eq!(llm.max_output_tokens, 2048);
    }
}
