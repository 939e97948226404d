use std::pin::Pin;

use async_stream::stream;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::errors::{Error, Result};
use crate::models::usage::Usage;

/// Literal frame payload signaling end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A run of this many consecutive undecodable frames aborts the stream.
const MAX_CONSECUTIVE_MALFORMED: u32 = 5;

/// One incremental piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDelta {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

/// A fragment of a tool call arriving over several frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// An item of a [`ChatStream`]. `Done` and `Error` are terminal; a stream
/// yields at most one of them and nothing afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(ChatDelta),
    Done,
    Error(Error),
}

pub type ChatStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Maps one parsed JSON frame into a delta. Each schema adapter supplies its
/// own; the state machine around it is shared.
pub type FrameDecoder = fn(&serde_json::Value) -> Result<ChatDelta>;

/// Drive the SSE state machine over a raw byte stream.
///
/// Frames are split on event boundaries and inspected in arrival order: the
/// `[DONE]` sentinel terminates, an embedded `error` envelope yields exactly
/// one terminal error event, anything else is decoded into a delta. Malformed
/// frames are skipped unless too many arrive consecutively. Cancellation
/// stops iteration at once and drops the connection. Not restartable.
pub fn decode_sse<S, E>(bytes: S, decode_frame: FrameDecoder, cancel: CancellationToken) -> ChatStream
where
    S: Stream<Item = std::result::Result<Vec<u8>, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    Box::pin(stream! {
        let mut events = Box::pin(bytes.eventsource());
        let mut malformed: u32 = 0;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("stream cancelled");
                    break;
                }
                next = events.next() => next,
            };

            let Some(event) = next else { break };

            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    yield StreamEvent::Error(Error::Network(format!("stream failed: {err}")));
                    break;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                yield StreamEvent::Done;
                break;
            }

            let frame: serde_json::Value = match serde_json::from_str(data) {
                Ok(frame) => frame,
                Err(err) => {
                    malformed += 1;
                    trace!(%err, malformed, "skipping malformed frame");
                    if malformed > MAX_CONSECUTIVE_MALFORMED {
                        yield StreamEvent::Error(Error::Parsing(format!(
                            "{malformed} consecutive malformed frames: {err}"
                        )));
                        break;
                    }
                    continue;
                }
            };
            malformed = 0;

            if let Some(envelope) = frame.get("error") {
                let message = envelope
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| envelope.to_string());
                yield StreamEvent::Error(Error::provider(message, None));
                break;
            }

            match decode_frame(&frame) {
                Ok(delta) => yield StreamEvent::Delta(delta),
                Err(err) => {
                    trace!(%err, malformed, "frame did not decode, skipping");
                    malformed += 1;
                    if malformed > MAX_CONSECUTIVE_MALFORMED {
                        yield StreamEvent::Error(Error::Parsing(format!(
                            "{malformed} consecutive undecodable frames: {err}"
                        )));
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usage::UsageKind;
    use futures_util::stream;

    fn frame_decoder(frame: &serde_json::Value) -> Result<ChatDelta> {
        let content = frame["choices"][0]["delta"]["content"]
            .as_str()
            .map(str::to_string);
        if content.is_none() && frame["usage"].is_null() {
            return Err(Error::Parsing("no delta".into()));
        }
        let mut delta = ChatDelta {
            content,
            ..Default::default()
        };
        if let Some(tokens) = frame["usage"]["completion_tokens"].as_f64() {
            delta.usage = Some(Usage::new().with(UsageKind::OutputTokens, tokens));
        }
        Ok(delta)
    }

    fn byte_stream(
        raw: &str,
    ) -> impl Stream<Item = std::result::Result<Vec<u8>, std::io::Error>> + Send {
        // Split mid-frame to exercise re-assembly across chunks
        let chunks: Vec<Vec<u8>> = raw
            .as_bytes()
            .chunks(17)
            .map(|chunk| chunk.to_vec())
            .collect();
        stream::iter(chunks.into_iter().map(Ok))
    }

    async fn collect(raw: &str) -> Vec<StreamEvent> {
        decode_sse(byte_stream(raw), frame_decoder, CancellationToken::new())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_deltas_in_arrival_order() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                   data: [DONE]\n\n";
        let events = collect(raw).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], StreamEvent::Delta(d) if d.content.as_deref() == Some("Hel")));
        assert!(matches!(&events[1], StreamEvent::Delta(d) if d.content.as_deref() == Some("lo")));
        assert_eq!(events[2], StreamEvent::Done);
    }

    #[tokio::test]
    async fn test_done_sentinel_terminates_even_with_trailing_frames() {
        let raw = "data: [DONE]\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n";
        let events = collect(raw).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_error_envelope_yields_single_terminal_error() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                   data: {\"error\":{\"message\":\"overloaded\"}}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n";
        let events = collect(raw).await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            StreamEvent::Error(Error::Provider { message, .. }) => {
                assert_eq!(message, "overloaded")
            }
            other => panic!("Expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_malformed_frame_skipped() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                   data: not json at all\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n\
                   data: [DONE]\n\n";
        let events = collect(raw).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], StreamEvent::Delta(d) if d.content.as_deref() == Some("b")));
    }

    #[tokio::test]
    async fn test_malformed_run_aborts_stream() {
        let mut raw = String::new();
        for _ in 0..7 {
            raw.push_str("data: %%garbage%%\n\n");
        }
        let events = collect(&raw).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error(Error::Parsing(_))));
    }

    #[tokio::test]
    async fn test_usage_delta_extracted() {
        let raw = "data: {\"choices\":[{\"delta\":{}}],\"usage\":{\"completion_tokens\":42}}\n\n\
                   data: [DONE]\n\n";
        let events = collect(raw).await;
        match &events[0] {
            StreamEvent::Delta(delta) => {
                let usage = delta.usage.as_ref().unwrap();
                assert_eq!(usage.get(UsageKind::OutputTokens), Some(42.0));
            }
            other => panic!("Expected delta, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_iteration() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pending =
            stream::pending::<std::result::Result<Vec<u8>, std::io::Error>>();
        let events: Vec<_> = decode_sse(pending, frame_decoder, cancel).collect().await;
        assert!(events.is_empty());
    }
}
