//! Server-sent event decoding
//!
//! Turns the raw body of a `text/event-stream` response into discrete
//! events. Chunk boundaries from the network are arbitrary, so partial
//! lines (including split UTF-8 sequences) are held until completed.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::TryStreamExt;
use futures_util::stream::{self, Stream, StreamExt};
use tracing::trace;

use crate::error::{ClientError, Result};

/// A boxed stream of decoded server-sent events
pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseEvent>> + Send>>;

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type, if the server named one
    pub event: Option<String>,
    /// Data payload; multiple `data:` lines are joined with `\n`
    pub data: String,
    /// Last event id seen on the stream
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    after_cr: bool,
    data: Vec<String>,
    event: Option<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of body bytes, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut dispatched = Vec::new();

        for &byte in chunk {
            // "\r\n" is a single line terminator even when split across chunks
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' => self.end_line(&mut dispatched),
                b'\r' => {
                    self.after_cr = true;
                    self.end_line(&mut dispatched);
                }
                _ => self.line.push(byte),
            }
        }

        dispatched
    }

    fn end_line(&mut self, dispatched: &mut Vec<SseEvent>) {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                dispatched.push(event);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            other => trace!("Ignoring SSE field: {}", other),
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();

        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

/// Decodes a stream of body chunks into server-sent events
///
/// The returned stream ends when the body ends; a transport error is
/// yielded as an `Err` item.
pub fn decode_stream<S, B, E>(chunks: S) -> SseStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = (Box::pin(chunks), SseDecoder::new(), VecDeque::new());

    let events = stream::unfold(state, |(mut chunks, mut decoder, mut ready)| async move {
        loop {
            if let Some(event) = ready.pop_front() {
                return Some((Ok(event), (chunks, decoder, ready)));
            }

            match chunks.next().await {
                Some(Ok(chunk)) => ready.extend(decoder.feed(chunk.as_ref())),
                Some(Err(e)) => {
                    let error: ClientError = e.into();
                    return Some((Err(error), (chunks, decoder, ready)));
                }
                None => return None,
            }
        }
    });

    Box::pin(events)
}

/// Adapts a streaming HTTP response into server-sent events
///
/// Body read failures surface as `ClientError::Stream`.
pub fn event_stream(response: reqwest::Response) -> SseStream {
    decode_stream(
        response
            .bytes_stream()
            .map_err(|e| ClientError::Stream(e.to_string())),
    )
}
