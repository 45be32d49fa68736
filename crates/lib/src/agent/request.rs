//! Agent request body.

use crate::channels::CanonicalMessage;
use serde::Serialize;

/// Role sent for every inbound user message.
const USER_ROLE: &str = "user";

/// Body POSTed to the agent:
/// `{"appName", "userId", "sessionId", "newMessage": {"role": "user", "parts": [{"text"}]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub app_name: String,
    pub user_id: String,
    /// Same as `user_id`: one flat session per sender.
    pub session_id: String,
    pub new_message: AgentMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentMessage {
    pub role: String,
    pub parts: Vec<AgentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentPart {
    pub text: String,
}

/// Build the agent request for a message. Pure; empty text is passed through as-is.
pub fn format_request(message: &CanonicalMessage, app_name: &str) -> AgentRequest {
    AgentRequest {
        app_name: app_name.to_string(),
        user_id: message.sender_id.clone(),
        session_id: message.sender_id.clone(),
        new_message: AgentMessage {
            role: USER_ROLE.to_string(),
            parts: vec![AgentPart {
                text: message.text.clone(),
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(text: &str) -> CanonicalMessage {
        CanonicalMessage {
            sender_id: "56994962184".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn serializes_to_agent_wire_shape() {
        let req = format_request(&message("Hola"), "alma");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "appName": "alma",
                "userId": "56994962184",
                "sessionId": "56994962184",
                "newMessage": {"role": "user", "parts": [{"text": "Hola"}]}
            })
        );
    }

    #[test]
    fn formatting_is_deterministic() {
        let a = serde_json::to_vec(&format_request(&message("Hola"), "alma")).unwrap();
        let b = serde_json::to_vec(&format_request(&message("Hola"), "alma")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_passes_through() {
        let req = format_request(&message(""), "other");
        assert_eq!(req.app_name, "other");
        assert_eq!(req.new_message.parts[0].text, "");
    }
}
