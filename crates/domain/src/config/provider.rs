use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote inference endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Maximum tokens requested per completion.
    #[serde(default = "d_4096")]
    pub max_tokens: u32,
    #[serde(default = "d_120000u")]
    pub timeout_ms: u64,
    /// A single call whose usage total crosses this fires a cost warning.
    #[serde(default = "d_50000")]
    pub usage_warn_threshold: u64,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            max_tokens: 4_096,
            timeout_ms: 120_000,
            usage_warn_threshold: 50_000,
            auth: AuthConfig::default(),
        }
    }
}

/// How the API key is resolved.  Checked in declaration order: `key`
/// (plaintext, discouraged), `env`, then keychain `service` + `account`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Direct key (for config-only setups; prefer env or keychain).
    #[serde(default)]
    pub key: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Keychain service name (e.g. "scribe").
    #[serde(default)]
    pub service: Option<String>,
    /// Keychain account name (e.g. "anthropic-api-key").
    #[serde(default)]
    pub account: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn d_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn d_4096() -> u32 {
    4_096
}
fn d_120000u() -> u64 {
    120_000
}
fn d_50000() -> u64 {
    50_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.base_url, "https://api.anthropic.com");
        assert_eq!(cfg.max_tokens, 4_096);
        assert_eq!(cfg.usage_warn_threshold, 50_000);
        assert!(cfg.auth.key.is_none());
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: ProviderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.model, "claude-sonnet-4-20250514");
        assert_eq!(cfg.timeout_ms, 120_000);
    }
}
