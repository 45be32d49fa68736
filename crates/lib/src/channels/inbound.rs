//! Canonical inbound message: what the gateway hands to the agent after normalizing a channel event.

/// One text message from a channel user, normalized from the platform's webhook shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    /// Platform user id (WhatsApp: digits only, country code first, no leading `+`). Never empty.
    pub sender_id: String,
    /// Message body, passed through verbatim.
    pub text: String,
}
