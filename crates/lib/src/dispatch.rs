//! Dispatch: inbound webhook body → agent → optional WhatsApp reply.
//!
//! Every downstream failure is logged and folded into a [`DispatchOutcome`]; nothing here fails the
//! webhook acknowledgment.

use crate::agent::{self, AgentClient};
use crate::channels::{self, CanonicalMessage, WhatsAppChannel};
use crate::config::Settings;
use anyhow::{Context, Result};

/// Result of the reply relay step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Reply accepted by the WhatsApp API.
    Sent,
    /// WhatsApp API URL or access token not configured.
    Skipped,
    /// Transport error, timeout or non-2xx from the WhatsApp API.
    Failed(String),
}

/// Where processing of one webhook event ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No actionable text message in the event.
    NoOp,
    /// Message extracted but no agent URL configured; logged only.
    AgentSkipped(CanonicalMessage),
    /// Agent call failed (transport, timeout, non-2xx, or unparsable body).
    AgentFailed(String),
    /// Agent answered but no reply text could be extracted.
    NoReply,
    /// Reply text extracted; relay attempted or skipped.
    Relayed { reply: String, relay: RelayOutcome },
}

/// Runs the inbound → agent → relay pipeline. Holds no per-request state; clone freely.
#[derive(Clone, Default)]
pub struct Dispatcher {
    agent: Option<AgentClient>,
    relay: Option<WhatsAppChannel>,
}

impl Dispatcher {
    pub fn new(agent: Option<AgentClient>, relay: Option<WhatsAppChannel>) -> Self {
        Self { agent, relay }
    }

    /// Build the agent client and relay channel from resolved settings. Missing pieces disable that stage.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let agent = match settings.agent_url.as_deref() {
            Some(url) => Some(
                AgentClient::new(url, &settings.agent_app_name, settings.agent_timeout)
                    .context("building agent client")?,
            ),
            None => None,
        };
        let relay = match (
            settings.whatsapp_api_url.as_deref(),
            settings.whatsapp_access_token.as_deref(),
        ) {
            (Some(url), Some(token)) => Some(
                WhatsAppChannel::new(url, token, settings.whatsapp_timeout)
                    .context("building whatsapp client")?,
            ),
            _ => None,
        };
        Ok(Self::new(agent, relay))
    }

    pub fn relay_configured(&self) -> bool {
        self.relay.is_some()
    }

    /// Process one webhook body. `event_id` only tags log lines.
    pub async fn process(&self, event_id: &str, payload: &serde_json::Value) -> DispatchOutcome {
        // The extractor only yields messages with a non-empty sender and body.
        let Some(message) = channels::extract_message(payload) else {
            log::info!("[{}] no text message in webhook payload", event_id);
            return DispatchOutcome::NoOp;
        };
        log::info!("[{}] message from {}: {}", event_id, message.sender_id, message.text);

        let Some(ref agent) = self.agent else {
            log::info!("[{}] agent url not configured; message logged only", event_id);
            return DispatchOutcome::AgentSkipped(message);
        };

        let request = agent::format_request(&message, agent.app_name());
        log::debug!("[{}] agent request to {}: {:?}", event_id, agent.url(), request);
        let reply = match agent.send(&request).await {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    log::warn!("[{}] agent call timed out: {}", event_id, e);
                } else {
                    log::warn!("[{}] agent call failed: {}", event_id, e);
                }
                return DispatchOutcome::AgentFailed(e.to_string());
            }
        };
        log::debug!("[{}] agent reply: {}", event_id, reply);

        let Some(text) = agent::extract_reply_text(&reply) else {
            log::warn!(
                "[{}] could not extract text from agent reply: {}",
                event_id,
                reply
            );
            return DispatchOutcome::NoReply;
        };
        log::info!("[{}] agent reply for {}: {}", event_id, message.sender_id, text);

        let relay = self.relay_reply(event_id, &message.sender_id, &text).await;
        DispatchOutcome::Relayed { reply: text, relay }
    }

    /// Send the reply back to the sender. Failures are reported in the outcome, never raised.
    async fn relay_reply(&self, event_id: &str, to: &str, text: &str) -> RelayOutcome {
        let Some(ref relay) = self.relay else {
            log::debug!("[{}] whatsapp relay not configured; reply not sent", event_id);
            return RelayOutcome::Skipped;
        };
        log::debug!("[{}] relaying reply to {}", event_id, relay.api_url());
        match relay.send_message(to, text).await {
            Ok(()) => {
                log::info!("[{}] reply sent to whatsapp for {}", event_id, to);
                RelayOutcome::Sent
            }
            Err(e) => {
                log::warn!("[{}] whatsapp relay to {} failed: {}", event_id, to, e);
                RelayOutcome::Failed(e.to_string())
            }
        }
    }
}
