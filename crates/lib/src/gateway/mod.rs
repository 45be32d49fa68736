//! Gateway: HTTP server for the WhatsApp webhook.
//!
//! Serves the Meta subscription handshake (GET), inbound events (POST), and a health check on one port.

mod server;

pub use server::{router, run_gateway, GatewayState, SERVICE_NAME};
