//! The provider-agnostic data model passed through the transport layer.
//!
//! Every vendor API speaks a different dialect: different role vocabularies,
//! different content-part shapes, different usage accounting. Calls are built
//! against these types and converted at the provider boundary by the schema
//! adapters, so provider shape never leaks into calling code. All values here
//! are created per exchange and dropped by the caller; this layer keeps no
//! history.
pub mod capability;
pub mod content;
pub mod message;
pub mod tool;
pub mod usage;
