//! A transport and schema-normalization layer for multi-provider AI APIs.
//!
//! The crate is split along the boundary the vendors force on us: a neutral
//! data model ([`models`]), pure per-provider schema adapters and the clients
//! that drive them ([`providers`]), and a provider-agnostic network layer
//! ([`transport`]) that handles retries, streaming, polling, and
//! cancellation.
pub mod errors;
pub mod models;
pub mod providers;
pub mod transport;

pub use errors::{Error, Result};
pub use models::content::{Content, ContentPart, ImageRef};
pub use models::message::{ChatMessage, ChatRole};
pub use providers::{ChatCompletion, ChatRequest, Provider};
