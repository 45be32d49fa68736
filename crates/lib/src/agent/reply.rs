//! Reply text extraction from an arbitrary agent JSON document.

use serde_json::Value;

/// One accepted reply shape: a name for logs and a projector that returns the text if the shape matches.
pub struct ReplyRule {
    pub name: &'static str,
    pub project: fn(&Value) -> Option<&str>,
}

/// Accepted reply shapes, highest priority first.
pub const REPLY_RULES: &[ReplyRule] = &[
    ReplyRule {
        name: "newMessage.parts[0].text",
        project: new_message_first_part,
    },
    ReplyRule {
        name: "response",
        project: response_string,
    },
    ReplyRule {
        name: "response.text",
        project: response_text,
    },
    ReplyRule {
        name: "text",
        project: top_level_text,
    },
    ReplyRule {
        name: "message",
        project: top_level_message,
    },
];

fn new_message_first_part(v: &Value) -> Option<&str> {
    v.get("newMessage")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}

fn response_string(v: &Value) -> Option<&str> {
    v.get("response")?.as_str()
}

fn response_text(v: &Value) -> Option<&str> {
    v.get("response")?.as_object()?.get("text")?.as_str()
}

fn top_level_text(v: &Value) -> Option<&str> {
    v.get("text")?.as_str()
}

fn top_level_message(v: &Value) -> Option<&str> {
    v.get("message")?.as_str()
}

/// Apply [`REPLY_RULES`] in order and return the first non-empty string. `None` when no shape matches.
pub fn extract_reply_text(reply: &Value) -> Option<String> {
    REPLY_RULES.iter().find_map(|rule| {
        let text = (rule.project)(reply).filter(|s| !s.is_empty())?;
        log::debug!("agent reply matched {}", rule.name);
        Some(text.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(v: Value) -> Option<String> {
        extract_reply_text(&v)
    }

    #[test]
    fn each_shape_is_accepted() {
        let hi = Some("hi".to_string());
        assert_eq!(extract(json!({"newMessage": {"parts": [{"text": "hi"}]}})), hi);
        assert_eq!(extract(json!({"response": "hi"})), hi);
        assert_eq!(extract(json!({"response": {"text": "hi"}})), hi);
        assert_eq!(extract(json!({"text": "hi"})), hi);
        assert_eq!(extract(json!({"message": "hi"})), hi);
    }

    #[test]
    fn unknown_shape_is_absent() {
        assert_eq!(extract(json!({"foo": "bar"})), None);
        assert_eq!(extract(json!({})), None);
    }

    #[test]
    fn new_message_beats_response() {
        assert_eq!(
            extract(json!({
                "newMessage": {"parts": [{"text": "from parts"}]},
                "response": "from response"
            })),
            Some("from parts".to_string())
        );
    }

    #[test]
    fn priority_follows_rule_order() {
        assert_eq!(
            extract(json!({"message": "m", "text": "t"})),
            Some("t".to_string())
        );
        assert_eq!(
            extract(json!({"text": "t", "response": {"text": "r"}})),
            Some("r".to_string())
        );
    }

    #[test]
    fn empty_or_mistyped_values_fall_through() {
        assert_eq!(
            extract(json!({"newMessage": {"parts": []}, "text": "t"})),
            Some("t".to_string())
        );
        assert_eq!(
            extract(json!({"newMessage": {"parts": [{"text": ""}]}, "message": "m"})),
            Some("m".to_string())
        );
        assert_eq!(
            extract(json!({"newMessage": "oops", "response": 5, "text": ["x"], "message": "m"})),
            Some("m".to_string())
        );
        assert_eq!(
            extract(json!({"response": {"text": 1}, "text": null})),
            None
        );
    }

    #[test]
    fn non_object_top_level_is_absent() {
        assert_eq!(extract(json!("hi")), None);
        assert_eq!(extract(json!([{"text": "hi"}])), None);
        assert_eq!(extract(json!(null)), None);
        assert_eq!(extract(json!(42)), None);
    }

    #[test]
    fn rule_names_are_in_priority_order() {
        let names: Vec<&str> = REPLY_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "newMessage.parts[0].text",
                "response",
                "response.text",
                "text",
                "message"
            ]
        );
    }
}
