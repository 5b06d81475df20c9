//! Medigate core library: intent routing, prompt building, model-reply decoding and the
//! HTTP gateway that forwards medical chat, prescription and voice requests to the model.

pub mod agents;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod gateway;
pub mod image;
pub mod init;
pub mod llm;
pub mod prompt;
pub mod protocol;
pub mod routing;
