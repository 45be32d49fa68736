//! Downstream conversational agent: request formatting, the HTTP call, and reply text extraction.
//!
//! Agent replies come back in several shapes; [`extract_reply_text`] tries a fixed, ordered list of
//! rules and returns the first non-empty string.

mod client;
mod reply;
mod request;

pub use client::{AgentClient, AgentError};
pub use reply::{extract_reply_text, ReplyRule, REPLY_RULES};
pub use request::{format_request, AgentMessage, AgentPart, AgentRequest};
