//! WhatsApp inbound orchestrator: normalizes WhatsApp Business webhook events, relays the text to a
//! conversational agent, and optionally sends the agent's reply back to the user.

pub mod agent;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
