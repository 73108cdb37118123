//! Output recovery: turn a possibly malformed model reply into a proposal.
//!
//! Techniques run in order, each only if the previous one failed:
//!
//! 1. strict parse
//! 2. largest `{...}` substring
//! 3. structural repair (quotes, trailing commas, unbalanced brackets)
//! 4. one re-ask of the backend with a format reminder
//! 5. give up: no proposal this cycle
//!
//! Parse failures never escape this module.

use autoclaw_core::message::Message;
use autoclaw_core::proposal::AssistantProposal;
use autoclaw_core::provider::{Provider, ProviderRequest};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::prompt::RESPONSE_FORMAT;

/// Which technique produced the proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    Strict,
    Extracted,
    Repaired,
    Reasked,
    /// Nothing worked
    Fallback,
}

/// The outcome of [`recover`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    /// `None` means no actionable command this cycle.
    pub proposal: Option<AssistantProposal>,
    pub technique: Technique,
}

impl Recovered {
    fn empty() -> Self {
        Self {
            proposal: None,
            technique: Technique::Fallback,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proposal.is_none()
    }

    /// The recovered object, `{}` when empty.
    pub fn to_value(&self) -> Value {
        self.proposal
            .as_ref()
            .map(AssistantProposal::to_value)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Recover a proposal from raw backend output.
///
/// With a `backend`, a reply that cannot be parsed or misses required
/// fields is sent back once with the response format; the answer goes
/// through the offline techniques again.
pub async fn recover(raw: &str, backend: Option<&dyn Provider>, model: &str) -> Recovered {
    let mut reason = match recover_offline_with(raw) {
        Some((object, technique)) => match AssistantProposal::from_value(&Value::Object(object)) {
            Ok(proposal) => {
                debug!(?technique, "Recovered proposal");
                return Recovered {
                    proposal: Some(proposal),
                    technique,
                };
            }
            Err(violation) => violation.to_string(),
        },
        None => "reply is not valid JSON".to_string(),
    };

    if let Some(backend) = backend {
        debug!(%reason, "Re-asking backend for a well-formed reply");
        match reask(backend, raw, &reason, model).await {
            Ok(reply) => {
                if let Some((object, _)) = recover_offline_with(&reply) {
                    match AssistantProposal::from_value(&Value::Object(object)) {
                        Ok(proposal) => {
                            return Recovered {
                                proposal: Some(proposal),
                                technique: Technique::Reasked,
                            };
                        }
                        Err(violation) => reason = violation.to_string(),
                    }
                }
            }
            Err(e) => reason = e.to_string(),
        }
    }

    warn!(%reason, "Could not recover a proposal from the reply");
    Recovered::empty()
}

/// Techniques 1 to 3 only; never touches the network.
///
/// Returns the first JSON object any technique yields, without schema
/// validation.
pub fn recover_offline(raw: &str) -> Option<Map<String, Value>> {
    recover_offline_with(raw).map(|(object, _)| object)
}

fn recover_offline_with(raw: &str) -> Option<(Map<String, Value>, Technique)> {
    if let Some(object) = parse_object(raw) {
        return Some((object, Technique::Strict));
    }

    if let Some(object) = extract_braced(raw).and_then(parse_object) {
        return Some((object, Technique::Extracted));
    }

    let start = raw.find('{')?;
    let normalized = normalize_quotes(&raw[start..]);
    if let Some(object) = parse_object(&repair(&normalized)) {
        return Some((object, Technique::Repaired));
    }
    // Replies written entirely with single quotes
    if !normalized.contains('"') {
        return parse_object(&repair(&normalized.replace('\'', "\""))).map(|o| (o, Technique::Repaired));
    }
    None
}

async fn reask(
    backend: &dyn Provider,
    raw: &str,
    reason: &str,
    model: &str,
) -> Result<String, autoclaw_core::error::ProviderError> {
    let prompt = format!(
        "Your previous reply could not be used ({reason}).\n\nPrevious reply:\n{raw}\n\n\
         Respond again with only a JSON object in exactly this format, with no other text:\n{RESPONSE_FORMAT}"
    );
    let request = ProviderRequest::new(model, vec![Message::user(prompt)]);
    Ok(backend.complete(request).await?.content)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// The span from the first `{` to the last `}`.
fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Drop trailing commas and stray closers, close an unterminated string and
/// any brackets left open.
fn repair(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                open.push(if c == '{' { '}' } else { ']' });
                out.push(c);
            }
            '}' | ']' => {
                if open.last() != Some(&c) {
                    continue;
                }
                open.pop();
                strip_trailing_comma(&mut out);
                out.push(c);
                if open.is_empty() {
                    // Anything after the outermost object is prose
                    return out;
                }
            }
            _ => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    strip_trailing_comma(&mut out);
    // A dangling key or colon cannot be completed
    let trimmed = out.trim_end();
    if trimmed.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = open.pop() {
        strip_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

fn strip_trailing_comma(out: &mut String) {
    let kept = out.trim_end().len();
    if out[..kept].ends_with(',') {
        out.truncate(kept - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, valid_reply};

    #[test]
    fn valid_object_unchanged() {
        let raw = valid_reply("list_files", serde_json::json!({"directory": ""}));
        let expected: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(Value::Object(recover_offline(&raw).unwrap()), expected);
    }

    #[test]
    fn extracts_object_from_prose() {
        let raw = "Sure! Here is my answer:\n```json\n{\"a\": {\"b\": 1}}\n```\nHope it helps.";
        let object = recover_offline(raw).unwrap();
        assert_eq!(object["a"]["b"], 1);
    }

    #[test]
    fn repairs_truncated_reply() {
        let raw = r#"{"thoughts": {"text": "hi", "plan": ["a", "b""#;
        let object = recover_offline(raw).unwrap();
        assert_eq!(object["thoughts"]["text"], "hi");
        assert_eq!(object["thoughts"]["plan"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn repairs_trailing_commas_and_smart_quotes() {
        let raw = "{\u{201C}command\u{201D}: {\"name\": \"do_nothing\", \"args\": {},},}";
        let object = recover_offline(raw).unwrap();
        assert_eq!(object["command"]["name"], "do_nothing");
    }

    #[test]
    fn repairs_single_quoted_reply() {
        let object = recover_offline("{'command': {'name': 'do_nothing'}}").unwrap();
        assert_eq!(object["command"]["name"], "do_nothing");
    }

    #[test]
    fn unterminated_string_is_closed() {
        let object = recover_offline(r#"{"text": "half a thou"#).unwrap();
        assert_eq!(object["text"], "half a thou");
    }

    #[test]
    fn hopeless_input_yields_none() {
        assert!(recover_offline("I refuse to answer in JSON").is_none());
        assert!(recover_offline("").is_none());
    }

    #[tokio::test]
    async fn not_json_without_backend_is_empty() {
        let recovered = recover("{not json", None, "gpt-4").await;
        assert!(recovered.is_empty());
        assert_eq!(recovered.technique, Technique::Fallback);
        assert_eq!(recovered.to_value(), serde_json::json!({}));
    }

    #[tokio::test]
    async fn schema_violation_without_backend_is_empty() {
        let recovered = recover(r#"{"command": {"name": "x"}}"#, None, "gpt-4").await;
        assert!(recovered.is_empty());
    }

    #[tokio::test]
    async fn valid_reply_is_strict() {
        let raw = valid_reply("do_nothing", serde_json::json!({}));
        let recovered = recover(&raw, None, "gpt-4").await;
        assert_eq!(recovered.technique, Technique::Strict);
        assert_eq!(recovered.proposal.unwrap().command.name, "do_nothing");
    }

    #[tokio::test]
    async fn reask_happens_once() {
        let backend = SequentialMockProvider::from_texts(&["still not json", "nor this"]);
        let recovered = recover("{not json", Some(&backend), "gpt-4").await;
        assert!(recovered.is_empty());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn reask_can_fix_reply() {
        let fixed = valid_reply("read_file", serde_json::json!({"filename": "a.txt"}));
        let backend = SequentialMockProvider::from_texts(&[&fixed]);
        let recovered = recover("{\"thoughts\": ", Some(&backend), "gpt-4").await;
        assert_eq!(recovered.technique, Technique::Reasked);
        assert_eq!(recovered.proposal.unwrap().command.name, "read_file");
    }
}
