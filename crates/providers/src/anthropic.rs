//! Anthropic-wire completion client.
//!
//! Speaks the Messages API subset the pipeline needs: plain-text turns in,
//! plain text out.  Non-success statuses and explicit error payloads map to
//! the shared error taxonomy; a response with no text block is a soft-empty
//! completion, logged but never escalated.

use std::time::Instant;

use serde_json::Value;

use scribe_domain::config::ProviderConfig;
use scribe_domain::error::{Error, Result};
use scribe_domain::trace::TraceEvent;
use scribe_domain::turn::{Role, TokenUsage, Turn};

use crate::traits::{Completion, CompletionClient, CompletionRequest};
use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upper bound on the response body we are willing to buffer.
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    default_model: String,
    default_max_tokens: u32,
    usage_warn_threshold: u64,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client from the provider config.  Fails with `Error::Auth`
    /// when no credential is resolvable: a missing key fails session start,
    /// it is never discovered mid-stream.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            default_max_tokens: cfg.max_tokens,
            usage_warn_threshold: cfg.usage_warn_threshold,
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire body
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `{model, max_tokens, messages: [{role, content}]}`.
///
/// Anything that is not an assistant turn goes out as a user message.
fn build_messages_body(request: &CompletionRequest, model: &str, max_tokens: u32) -> Value {
    let messages: Vec<Value> = request.turns.iter().map(turn_to_message).collect();
    serde_json::json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": messages,
    })
}

fn turn_to_message(turn: &Turn) -> Value {
    let role = match turn.role {
        Role::Assistant => "assistant",
        _ => "user",
    };
    serde_json::json!({
        "role": role,
        "content": turn.text,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_response(body: &Value, provider: &str) -> Result<Completion> {
    // An explicit error payload beats whatever else is in the body.
    if let Some(err) = body.get("error") {
        let kind = err.get("type").and_then(|v| v.as_str()).unwrap_or("error");
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown provider error");
        return Err(Error::Provider {
            provider: provider.to_owned(),
            message: format!("{kind}: {message}"),
        });
    }

    let mut text_parts: Vec<&str> = Vec::new();
    if let Some(blocks) = body.get("content").and_then(|v| v.as_array()) {
        for block in blocks {
            let block_type = block.get("type").and_then(|v| v.as_str()).unwrap_or("");
            if block_type == "text" {
                if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(t);
                }
            }
        }
    }

    let usage = body
        .get("usage")
        .map(|u| TokenUsage {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        })
        .unwrap_or_default();

    let text = text_parts.concat();
    if text.is_empty() {
        tracing::debug!(provider = provider, "response carried no text block");
    }

    Ok(Completion { text, usage })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/v1/messages", self.base_url);
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        let body = build_messages_body(&request, model, max_tokens);

        tracing::debug!(url = %url, model = %model, turns = request.turns.len(), "messages request");

        let start = Instant::now();
        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                message: resp_text,
            });
        }
        if resp_text.len() > MAX_RESPONSE_BYTES {
            return Err(Error::Other(format!(
                "response body of {} bytes exceeds the {} byte cap",
                resp_text.len(),
                MAX_RESPONSE_BYTES
            )));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let completion = parse_response(&resp_json, self.label())?;

        TraceEvent::CompletionCall {
            model: model.to_owned(),
            duration_ms: start.elapsed().as_millis() as u64,
            input_tokens: completion.usage.input_tokens,
            output_tokens: completion.usage.output_tokens,
        }
        .emit();

        warn_on_high_usage(completion.usage, self.usage_warn_threshold);

        Ok(completion)
    }

    fn label(&self) -> &str {
        "anthropic"
    }
}

/// Cost warning only; control flow is unchanged.
fn warn_on_high_usage(usage: TokenUsage, threshold: u64) -> bool {
    let total = usage.total();
    if total <= threshold {
        return false;
    }
    tracing::warn!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total = total,
        threshold = threshold,
        "completion usage above high-water mark"
    );
    TraceEvent::HighUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total,
        threshold,
    }
    .emit();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── body building ───────────────────────────────────────────────

    #[test]
    fn body_has_model_max_tokens_and_messages() {
        let request = CompletionRequest {
            turns: vec![Turn::user("hello"), Turn::assistant("hi")],
            model: None,
            max_tokens: None,
        };
        let body = build_messages_body(&request, "claude-sonnet-4-20250514", 4096);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 4096);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hello");
        assert_eq!(messages[1]["role"], "assistant");
    }

    // ── response parsing ────────────────────────────────────────────

    #[test]
    fn parse_joins_text_blocks_and_reads_usage() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "part one "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "part two"}
            ],
            "usage": {"input_tokens": 120000, "output_tokens": 3000}
        });
        let completion = parse_response(&body, "anthropic").unwrap();
        assert_eq!(completion.text, "part one part two");
        assert_eq!(completion.usage.input_tokens, 120_000);
        assert_eq!(completion.usage.output_tokens, 3_000);
    }

    #[test]
    fn parse_missing_usage_defaults_to_zero() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "reply"}]
        });
        let completion = parse_response(&body, "anthropic").unwrap();
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[test]
    fn parse_no_text_block_is_soft_empty() {
        let body = serde_json::json!({
            "content": [{"type": "tool_use", "id": "x"}],
            "usage": {"input_tokens": 10, "output_tokens": 1}
        });
        let completion = parse_response(&body, "anthropic").unwrap();
        assert!(completion.text.is_empty());
        assert_eq!(completion.usage.input_tokens, 10);
    }

    #[test]
    fn parse_error_payload_is_provider_error() {
        let body = serde_json::json!({
            "error": {"type": "overloaded_error", "message": "try later"}
        });
        let err = parse_response(&body, "anthropic").unwrap_err();
        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "anthropic");
                assert!(message.contains("overloaded_error"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    // ── high-usage warning ──────────────────────────────────────────

    #[test]
    fn usage_above_threshold_warns() {
        let usage = TokenUsage {
            input_tokens: 120_000,
            output_tokens: 3_000,
        };
        assert!(warn_on_high_usage(usage, 50_000));
    }

    #[test]
    fn usage_at_or_below_threshold_does_not() {
        let usage = TokenUsage {
            input_tokens: 40_000,
            output_tokens: 10_000,
        };
        assert!(!warn_on_high_usage(usage, 50_000));
    }
}
