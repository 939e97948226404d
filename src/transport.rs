//! The network side of the crate: request descriptors, the retrying
//! executor, the SSE streaming decoder, and the long-running-job poller.
//!
//! Everything here is provider-neutral. Provider shape lives in the schema
//! adapters; this layer only moves bytes, categorizes failures, and honors
//! cancellation at every suspension point.
pub mod executor;
pub mod poller;
pub mod request;
pub mod sse;

pub use executor::{Executor, TransportResponse};
pub use poller::{poll_until, PollSpec};
pub use request::{FormField, FormValue, Method, RequestBody, RequestSpec};
pub use sse::{decode_sse, ChatDelta, ChatStream, StreamEvent, ToolCallDelta};
