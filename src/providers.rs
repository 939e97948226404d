//! Provider clients and their schema adapters.
//!
//! Each provider file pairs a pure [`base::SchemaAdapter`] (the bidirectional
//! mapping between the neutral content model and that provider's wire JSON)
//! with a client that drives it over the transport layer. Wire quirks live
//! inside the adapter that owns them, never in shared code.
pub mod base;
pub mod configs;
pub mod elevenlabs;
pub mod factory;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod openrouter;
pub mod utils;

pub use base::{
    ChatCompletion, ChatOptions, ChatRequest, ImageGeneration, ImageRequest, ImageResponse,
    Provider, SchemaAdapter, SpeechGeneration, SpeechRequest, SpeechResponse, VoiceSettings,
};
pub use factory::get_provider;
