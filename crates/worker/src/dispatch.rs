//! Per-item dispatch policy.
//!
//! Classifies a pending item and renders its prompt through the external
//! builders, or decides to skip it.  Pure control flow: no network, no
//! storage.

use scribe_domain::item::PendingItem;
use scribe_sessions::Session;

use crate::hooks::{PromptBuilders, PromptContext};

/// A prompt ready to submit, plus the item metadata that travels with it.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub text: String,
    pub kind: &'static str,
    /// Epoch milliseconds of the originating observation, when there is one.
    pub created_at_epoch: Option<i64>,
    pub cwd: Option<String>,
}

/// Classify one item.  `None` means skip (unhandled kind).
///
/// An observation carrying a prompt number advances the session's
/// `last_prompt_number` *before* rendering; that is what keeps numbering
/// continuous for the next session resumption.
pub fn classify(
    item: &PendingItem,
    session: &Session,
    builders: &dyn PromptBuilders,
    ctx: &PromptContext,
) -> Option<RenderedPrompt> {
    match item {
        PendingItem::Observation(obs) => {
            if let Some(n) = obs.prompt_number {
                session.advance_prompt_number(n);
            }
            Some(RenderedPrompt {
                text: builders.observation(ctx, obs),
                kind: item.kind(),
                created_at_epoch: Some(obs.created_at_epoch),
                cwd: obs.cwd.clone(),
            })
        }
        PendingItem::Summarize {
            last_assistant_message,
        } => Some(RenderedPrompt {
            text: builders.summary(ctx, last_assistant_message),
            kind: item.kind(),
            created_at_epoch: None,
            cwd: None,
        }),
        PendingItem::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_domain::item::ObservationItem;

    struct StubBuilders;

    impl PromptBuilders for StubBuilders {
        fn session_opening(&self, ctx: &PromptContext) -> String {
            format!("open {}", ctx.project)
        }
        fn continuation(&self, ctx: &PromptContext) -> String {
            format!("continue {}", ctx.project)
        }
        fn observation(&self, _ctx: &PromptContext, item: &ObservationItem) -> String {
            format!("observe {}", item.tool_name)
        }
        fn summary(&self, _ctx: &PromptContext, last: &str) -> String {
            format!("summarize after: {last}")
        }
    }

    fn observation(prompt_number: Option<u64>) -> PendingItem {
        PendingItem::Observation(ObservationItem {
            tool_name: "Bash".into(),
            tool_input: serde_json::json!({"command": "ls"}),
            tool_output: serde_json::json!("ok"),
            created_at_epoch: 1_722_945_600_000,
            cwd: Some("/work".into()),
            prompt_number,
        })
    }

    #[test]
    fn observation_renders_and_advances_prompt_number() {
        let session = Session::new("s1");
        let ctx = PromptContext::default();

        let rendered = classify(&observation(Some(12)), &session, &StubBuilders, &ctx).unwrap();
        assert_eq!(rendered.text, "observe Bash");
        assert_eq!(rendered.kind, "observation");
        assert_eq!(rendered.created_at_epoch, Some(1_722_945_600_000));
        assert_eq!(rendered.cwd.as_deref(), Some("/work"));
        assert_eq!(session.last_prompt_number(), 12);
    }

    #[test]
    fn observation_without_number_leaves_counter() {
        let session = Session::new("s1");
        session.advance_prompt_number(4);
        let ctx = PromptContext::default();

        classify(&observation(None), &session, &StubBuilders, &ctx).unwrap();
        assert_eq!(session.last_prompt_number(), 4);
    }

    #[test]
    fn summarize_renders_with_last_message() {
        let session = Session::new("s1");
        let item = PendingItem::Summarize {
            last_assistant_message: "did the thing".into(),
        };
        let rendered = classify(&item, &session, &StubBuilders, &PromptContext::default()).unwrap();
        assert_eq!(rendered.text, "summarize after: did the thing");
        assert!(rendered.created_at_epoch.is_none());
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let session = Session::new("s1");
        let out = classify(
            &PendingItem::Unknown,
            &session,
            &StubBuilders,
            &PromptContext::default(),
        );
        assert!(out.is_none());
    }
}
