use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RelayError, Result};

/// Top-level configuration for the relay.
///
/// Loaded from `~/.helpdesk-relay/config.toml` by default, then overlaid with
/// the conventional environment variables (see [`RelayConfig::apply_env`]).
/// Each section corresponds to one collaborator or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub zendesk: ZendeskConfig,
    #[serde(default)]
    pub sunshine: SunshineConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RelayError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ZENDESK_SUBDOMAIN") {
            self.zendesk.subdomain = v;
        }
        if let Some(v) = get("ZENDESK_EMAIL") {
            self.zendesk.email = v;
        }
        if let Some(v) = get("ZENDESK_API_KEY") {
            self.zendesk.api_key = v;
        }
        if let Some(v) = get("ZENDESK_KB_CATEGORY") {
            self.zendesk.kb_category = v;
        }
        if let Some(v) = get("SUNSHINE_SUBDOMAIN") {
            self.sunshine.subdomain = v;
        }
        if let Some(v) = get("SUNSHINE_KEY_ID") {
            self.sunshine.key_id = v;
        }
        if let Some(v) = get("SUNSHINE_SECRET_KEY") {
            self.sunshine.secret_key = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai.model = v;
        }
        if let Some(v) = get("ZENDESK_WEBHOOK_SECRET") {
            self.webhook.secret = Some(v);
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %v, "Ignoring invalid PORT"),
            }
        }
    }

    /// Names of the required credentials that are not set.
    ///
    /// An empty list means every collaborator can be constructed.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let required = [
            ("ZENDESK_SUBDOMAIN", &self.zendesk.subdomain),
            ("ZENDESK_EMAIL", &self.zendesk.email),
            ("ZENDESK_API_KEY", &self.zendesk.api_key),
            ("OPENAI_API_KEY", &self.openai.api_key),
            ("SUNSHINE_KEY_ID", &self.sunshine.key_id),
            ("SUNSHINE_SECRET_KEY", &self.sunshine.secret_key),
        ];
        required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_configured(&self) -> bool {
        self.missing_credentials().is_empty()
    }

    /// Webhook secret, if one is set and non-empty.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite event log.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.helpdesk-relay/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Zendesk Support / Help Center credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZendeskConfig {
    /// Account subdomain (`<subdomain>.zendesk.com`).
    pub subdomain: String,
    /// Agent email used for API token auth.
    pub email: String,
    pub api_key: String,
    /// Help Center category whose articles form the knowledge base.
    pub kb_category: String,
}

impl Default for ZendeskConfig {
    fn default() -> Self {
        Self {
            subdomain: String::new(),
            email: String::new(),
            api_key: String::new(),
            kb_category: "360004211092".to_string(),
        }
    }
}

/// Sunshine Conversations credentials used to send replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SunshineConfig {
    /// Subdomain hosting the messaging API. Falls back to the Zendesk one.
    pub subdomain: String,
    pub key_id: String,
    pub secret_key: String,
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Overrides the built-in persona prompt when set.
    pub persona_prompt: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 500,
            persona_prompt: None,
        }
    }
}

/// Inbound webhook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Signature checks are skipped when unset.
    pub secret: Option<String>,
}

/// Escalation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Keyword score above which a message escalates even without an
    /// explicit human request.
    pub score_threshold: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
        }
    }
}

/// Knowledge retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Articles retrieved per inbound message.
    pub top_k: usize,
    /// Results at or below this cosine similarity are dropped.
    pub min_similarity: f64,
    /// Vocabulary size cap.
    pub max_features: usize,
    /// Characters of body kept in each search hit.
    pub excerpt_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_similarity: 0.1,
            max_features: 500,
            excerpt_chars: 500,
        }
    }
}

/// Outbound HTTP settings shared by every collaborator client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn configured() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.zendesk.subdomain = "acme".into();
        config.zendesk.email = "bot@acme.com".into();
        config.zendesk.api_key = "zk".into();
        config.openai.api_key = "sk".into();
        config.sunshine.key_id = "app_123".into();
        config.sunshine.secret_key = "shh".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.knowledge.top_k, 3);
        assert_eq!(config.knowledge.max_features, 500);
        assert!((config.knowledge.min_similarity - 0.1).abs() < f64::EPSILON);
        assert!((config.escalation.score_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.openai.max_tokens, 500);
        assert_eq!(config.http.timeout_secs, 10);
        assert!(config.webhook_secret().is_none());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[server]
port = 8080

[zendesk]
subdomain = "acme"
kb_category = "42"
"#;
        let file = create_temp_config(content);
        let config = RelayConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.zendesk.subdomain, "acme");
        assert_eq!(config.zendesk.kb_category, "42");
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[server\nport = ");
        let err = RelayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = RelayConfig::load_or_default(Path::new("/nonexistent/relay.toml"));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RelayConfig::default();
        config.webhook.secret = Some("s3cret".into());
        config.save(&path).unwrap();

        let reloaded = RelayConfig::load(&path).unwrap();
        assert_eq!(reloaded.webhook_secret(), Some("s3cret"));
        assert_eq!(reloaded.knowledge.excerpt_chars, 500);
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ZENDESK_SUBDOMAIN", "acme"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ZENDESK_WEBHOOK_SECRET", "hook"),
            ("PORT", "9090"),
            ("ZENDESK_EMAIL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = RelayConfig::default();
        config.zendesk.email = "keep@acme.com".into();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.zendesk.subdomain, "acme");
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.webhook_secret(), Some("hook"));
        assert_eq!(config.server.port, 9090);
        // Empty values do not clobber existing ones.
        assert_eq!(config.zendesk.email, "keep@acme.com");
    }

    #[test]
    fn test_apply_env_invalid_port_ignored() {
        let mut config = RelayConfig::default();
        config.apply_env_from(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_missing_credentials() {
        let config = RelayConfig::default();
        let missing = config.missing_credentials();
        assert!(missing.contains(&"OPENAI_API_KEY"));
        assert!(missing.contains(&"ZENDESK_SUBDOMAIN"));
        assert!(!config.is_configured());

        assert!(configured().missing_credentials().is_empty());
        assert!(configured().is_configured());
    }

    #[test]
    fn test_empty_webhook_secret_is_none() {
        let mut config = RelayConfig::default();
        config.webhook.secret = Some(String::new());
        assert!(config.webhook_secret().is_none());
    }
}
