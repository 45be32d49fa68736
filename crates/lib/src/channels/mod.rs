//! Communication channels (WhatsApp Business).
//!
//! Inbound webhook payloads are normalized into a [`CanonicalMessage`]; replies go
//! back out through the channel's send-message API.

mod inbound;
mod whatsapp;

pub use inbound::CanonicalMessage;
pub use whatsapp::{
    extract_message, WebhookPayload, WhatsAppChannel, WhatsAppError, WHATSAPP_BUSINESS_OBJECT,
};
