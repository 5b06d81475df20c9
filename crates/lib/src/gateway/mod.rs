//! Gateway: HTTP surface over the handlers.
//!
//! Single port, JSON in and out. Every handler outcome leaves as a `ResultEnvelope`;
//! only precondition failures use a non-200 status.

mod server;

pub use server::{router, run_gateway, GatewayState};
