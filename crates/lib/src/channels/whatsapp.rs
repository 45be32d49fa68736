//! WhatsApp Business channel: webhook payload model, text-message extraction, and sendMessage via the Cloud API.

use crate::channels::inbound::CanonicalMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value of the top-level `object` field on WhatsApp Business webhooks.
pub const WHATSAPP_BUSINESS_OBJECT: &str = "whatsapp_business_account";

const MESSAGES_FIELD: &str = "messages";
const TEXT_TYPE: &str = "text";

/// Webhook POST body (`entry[].changes[].value`). Every field is optional so status callbacks and
/// unrelated change fields deserialize cleanly and simply yield no message.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: WebhookValue,
}

/// Messages stay untyped here and are decoded one by one, so a malformed sibling does not hide a valid message.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
    #[serde(default)]
    pub text: Option<WebhookText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookText {
    #[serde(default)]
    pub body: Option<String>,
}

impl WebhookMessage {
    /// Sender and body when this is a text message with both present and non-empty.
    fn as_canonical(&self) -> Option<CanonicalMessage> {
        if self.message_type.as_deref() != Some(TEXT_TYPE) {
            return None;
        }
        let sender_id = self.from.as_deref().filter(|s| !s.is_empty())?;
        let text = self
            .text
            .as_ref()
            .and_then(|t| t.body.as_deref())
            .filter(|s| !s.is_empty())?;
        Some(CanonicalMessage {
            sender_id: sender_id.to_string(),
            text: text.to_string(),
        })
    }
}

impl WebhookPayload {
    /// All decodable messages under `changes` whose field is "messages", in payload order.
    fn messages(&self) -> impl Iterator<Item = WebhookMessage> + '_ {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .filter(|c| {
                let is_messages = c.field.as_deref() == Some(MESSAGES_FIELD);
                if !is_messages {
                    log::debug!("ignoring webhook change with field {:?}", c.field);
                }
                is_messages
            })
            .flat_map(|c| c.value.messages.iter())
            .filter_map(|raw| match WebhookMessage::deserialize(raw) {
                Ok(m) => Some(m),
                Err(e) => {
                    log::debug!("skipping malformed webhook message: {}", e);
                    None
                }
            })
    }
}

/// Pull the first text message out of a WhatsApp webhook body.
///
/// Returns `None` for anything that is not an actionable text message: status callbacks, non-text
/// media, empty bodies, or a body that does not follow the webhook schema at all.
pub fn extract_message(payload: &serde_json::Value) -> Option<CanonicalMessage> {
    let payload = match WebhookPayload::deserialize(payload) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("webhook body does not match the WhatsApp schema: {}", e);
            return None;
        }
    };
    if payload.object.as_deref() != Some(WHATSAPP_BUSINESS_OBJECT) {
        log::warn!(
            "webhook object is not {}: {:?}",
            WHATSAPP_BUSINESS_OBJECT,
            payload.object
        );
    }
    let mut found: Option<CanonicalMessage> = None;
    let mut dropped = 0usize;
    for msg in payload.messages() {
        match msg.as_canonical() {
            Some(m) if found.is_none() => found = Some(m),
            Some(_) => dropped += 1,
            None => log::debug!(
                "ignoring message type {:?} from {:?}",
                msg.message_type,
                msg.from
            ),
        }
    }
    if dropped > 0 {
        // One callback normally carries one message; anything beyond the first is not forwarded.
        log::warn!(
            "webhook carried {} additional text message(s); only the first is forwarded",
            dropped
        );
    }
    found
}

/// Cloud API send-message body for a plain text reply.
#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: SendTextBody<'a>,
}

#[derive(Debug, Serialize)]
struct SendTextBody<'a> {
    body: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("whatsapp api error: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// WhatsApp Cloud API client used to relay agent replies back to the user.
#[derive(Clone)]
pub struct WhatsAppChannel {
    api_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    /// `api_url` is the full messages endpoint (`.../<phone-number-id>/messages`).
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WhatsAppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            access_token: access_token.into(),
            client,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// POST a text message to `to` (phone number with country code, no `+`).
    pub async fn send_message(&self, to: &str, text: &str) -> Result<(), WhatsAppError> {
        let body = SendTextRequest {
            messaging_product: "whatsapp",
            to,
            message_type: TEXT_TYPE,
            text: SendTextBody { body: text },
        };
        log::debug!("whatsapp sendMessage to {}", to);
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WhatsAppError::Status { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn webhook(messages: serde_json::Value) -> serde_json::Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1234",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550000000", "phone_number_id": "42"},
                        "contacts": [{"profile": {"name": "Ana"}, "wa_id": "56994962184"}],
                        "messages": messages
                    }
                }]
            }]
        })
    }

    #[test]
    fn extracts_sender_and_text() {
        let body = webhook(json!([{
            "from": "56994962184",
            "id": "wamid.1",
            "timestamp": "1700000000",
            "type": "text",
            "text": {"body": "Hola"}
        }]));
        let msg = extract_message(&body).expect("text message");
        assert_eq!(msg.sender_id, "56994962184");
        assert_eq!(msg.text, "Hola");
    }

    #[test]
    fn text_is_not_trimmed_or_rewritten() {
        let body = webhook(json!([{
            "from": "1", "type": "text", "text": {"body": "  ¿qué tal?\n"}
        }]));
        assert_eq!(extract_message(&body).unwrap().text, "  ¿qué tal?\n");
    }

    #[test]
    fn status_callback_has_no_message() {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"field": "messages", "value": {
                "statuses": [{"id": "wamid.1", "status": "delivered", "recipient_id": "569"}]
            }}]}]
        });
        assert!(extract_message(&body).is_none());
    }

    #[test]
    fn non_text_messages_are_ignored() {
        let body = webhook(json!([
            {"from": "569", "type": "image", "image": {"id": "media-1"}},
            {"from": "569", "type": "location", "location": {"latitude": 1.0}}
        ]));
        assert!(extract_message(&body).is_none());
    }

    #[test]
    fn empty_body_or_sender_is_ignored() {
        let body = webhook(json!([
            {"from": "569", "type": "text", "text": {"body": ""}},
            {"from": "", "type": "text", "text": {"body": "hi"}},
            {"type": "text", "text": {"body": "hi"}}
        ]));
        assert!(extract_message(&body).is_none());
    }

    #[test]
    fn first_text_message_wins() {
        let body = webhook(json!([
            {"from": "111", "type": "audio", "audio": {"id": "a"}},
            {"from": "222", "type": "text", "text": {"body": "first"}},
            {"from": "333", "type": "text", "text": {"body": "second"}}
        ]));
        let msg = extract_message(&body).unwrap();
        assert_eq!(msg.sender_id, "222");
        assert_eq!(msg.text, "first");
    }

    #[test]
    fn non_message_fields_are_skipped() {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [
                {"field": "account_update", "value": {"messages": [
                    {"from": "1", "type": "text", "text": {"body": "nope"}}
                ]}},
                {"field": "messages", "value": {"messages": [
                    {"from": "2", "type": "text", "text": {"body": "yes"}}
                ]}}
            ]}]
        });
        assert_eq!(extract_message(&body).unwrap().sender_id, "2");
    }

    #[test]
    fn malformed_sibling_does_not_hide_text_message() {
        let body = webhook(json!([
            {"from": "111", "type": "text", "text": "not an object"},
            {"from": 42, "type": "text", "text": {"body": "numeric sender"}},
            {"from": "222", "type": "text", "text": {"body": "valid"}}
        ]));
        let msg = extract_message(&body).expect("valid message after malformed ones");
        assert_eq!(msg.sender_id, "222");
        assert_eq!(msg.text, "valid");
    }

    #[test]
    fn foreign_object_is_still_processed() {
        let mut body = webhook(json!([{"from": "7", "type": "text", "text": {"body": "x"}}]));
        body["object"] = json!("page");
        assert_eq!(extract_message(&body).unwrap().sender_id, "7");
    }

    #[test]
    fn missing_path_or_wrong_shape_has_no_message() {
        assert!(extract_message(&json!({})).is_none());
        assert!(extract_message(&json!({"entry": []})).is_none());
        assert!(extract_message(&json!({"entry": [{"changes": []}]})).is_none());
        assert!(extract_message(&json!({"entry": "nope"})).is_none());
        assert!(extract_message(&json!([1, 2])).is_none());
        assert!(extract_message(&json!("text")).is_none());
    }

    #[test]
    fn send_body_matches_cloud_api() {
        let body = SendTextRequest {
            messaging_product: "whatsapp",
            to: "56994962184",
            message_type: TEXT_TYPE,
            text: SendTextBody { body: "hola" },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "56994962184",
                "type": "text",
                "text": {"body": "hola"}
            })
        );
    }
}
