//! Incremental decoder for the generation response body.
//!
//! The body is a sequence of concatenated JSON values (not an array), arriving
//! in arbitrary chunks over an unbounded amount of time. Values are yielded as
//! soon as their last byte is buffered; nothing waits for the end of the body.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::StreamDecodeError;
use crate::events::StreamEvent;

/// Response body as delivered by a [`crate::client::GenerationService`].
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Scan state of the top-level value currently being buffered.
#[derive(Debug, Clone, Copy)]
enum ScanKind {
    /// Object or array; only structural bytes outside strings count.
    Nested {
        depth: usize,
        in_string: bool,
        escape: bool,
    },
    /// Top-level string.
    Text { escape: bool },
    /// Number or literal; ends at the first whitespace or delimiter.
    Scalar,
}

#[derive(Debug, Clone, Copy)]
struct ValueScan {
    start: usize,
    kind: ScanKind,
}

/// Splits a growing byte buffer into complete JSON values.
///
/// Every byte is scanned once: the cursor and nesting state survive across
/// [`push`](Self::push) calls, and the deserializer only runs on a value whose
/// closing byte has arrived.
#[derive(Debug, Default)]
pub struct JsonSplitter {
    buf: Vec<u8>,
    /// Start of the bytes not yet handed out.
    head: usize,
    /// Next byte to scan.
    pos: usize,
    /// Bytes dropped from the front of `buf`, for error positions.
    dropped: usize,
    value: Option<ValueScan>,
    eof: bool,
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'[' | b']' | b'"' | b',' | b':')
}

impl JsonSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.head > 0 {
            self.buf.drain(..self.head);
            self.dropped += self.head;
            self.pos -= self.head;
            if let Some(scan) = self.value.as_mut() {
                scan.start -= self.head;
            }
            self.head = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// No more bytes will be pushed.
    pub fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// Next complete value, or `Ok(None)` when more bytes are needed (or, after
    /// [`mark_eof`](Self::mark_eof), when the buffer holds only whitespace).
    pub fn next_value(&mut self) -> Result<Option<Value>, StreamDecodeError> {
        let Some(end) = self.scan() else {
            return match self.value {
                Some(scan) if self.eof => Err(StreamDecodeError::Truncated {
                    pending: self.buf.len() - scan.start,
                }),
                _ => Ok(None),
            };
        };

        let start = self.value.take().map_or(self.head, |scan| scan.start);
        self.head = end;
        serde_json::from_slice(&self.buf[start..end])
            .map(Some)
            .map_err(|source| StreamDecodeError::Malformed {
                value_start: self.dropped + start,
                source,
            })
    }

    /// Advance the cursor; returns the end of a value once it has closed.
    fn scan(&mut self) -> Option<usize> {
        while self.pos < self.buf.len() {
            let b = self.buf[self.pos];
            match self.value {
                None => {
                    self.pos += 1;
                    if b.is_ascii_whitespace() {
                        self.head = self.pos;
                        continue;
                    }
                    let kind = match b {
                        b'{' | b'[' => ScanKind::Nested {
                            depth: 1,
                            in_string: false,
                            escape: false,
                        },
                        b'"' => ScanKind::Text { escape: false },
                        _ => ScanKind::Scalar,
                    };
                    self.value = Some(ValueScan {
                        start: self.pos - 1,
                        kind,
                    });
                    // A stray `}` or `,` is handed to the deserializer to fail.
                    if matches!(kind, ScanKind::Scalar) && is_delimiter(b) {
                        return Some(self.pos);
                    }
                }
                Some(ValueScan { ref mut kind, .. }) => match kind {
                    ScanKind::Nested {
                        depth,
                        in_string,
                        escape,
                    } => {
                        self.pos += 1;
                        if *in_string {
                            if *escape {
                                *escape = false;
                            } else if b == b'\\' {
                                *escape = true;
                            } else if b == b'"' {
                                *in_string = false;
                            }
                            continue;
                        }
                        match b {
                            b'"' => *in_string = true,
                            b'{' | b'[' => *depth += 1,
                            b'}' | b']' => {
                                *depth -= 1;
                                if *depth == 0 {
                                    return Some(self.pos);
                                }
                            }
                            _ => {}
                        }
                    }
                    ScanKind::Text { escape } => {
                        self.pos += 1;
                        if *escape {
                            *escape = false;
                        } else if b == b'\\' {
                            *escape = true;
                        } else if b == b'"' {
                            return Some(self.pos);
                        }
                    }
                    ScanKind::Scalar => {
                        if is_delimiter(b) {
                            return Some(self.pos);
                        }
                        self.pos += 1;
                    }
                },
            }
        }

        match self.value {
            Some(ValueScan {
                kind: ScanKind::Scalar,
                ..
            }) if self.eof => Some(self.pos),
            _ => None,
        }
    }
}

struct DecodeState {
    body: ByteStream,
    splitter: JsonSplitter,
    exhausted: bool,
}

/// Lazily decode `body` into events, in arrival order.
///
/// The stream ends cleanly when the body ends on a value boundary. Any decode
/// or read failure is yielded once as an `Err` and ends the stream.
pub fn decode_events(body: ByteStream) -> impl Stream<Item = Result<StreamEvent, StreamDecodeError>> {
    let state = DecodeState {
        body,
        splitter: JsonSplitter::new(),
        exhausted: false,
    };

    futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            match state.splitter.next_value() {
                Ok(Some(value)) => {
                    return Some((Ok(StreamEvent::from_value(&value)), Some(state)));
                }
                Ok(None) if state.exhausted => return None,
                Ok(None) => {}
                Err(e) => return Some((Err(e), None)),
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.splitter.push(&chunk),
                Some(Err(e)) => return Some((Err(StreamDecodeError::Io(e)), None)),
                None => {
                    state.exhausted = true;
                    state.splitter.mark_eof();
                }
            }
        }
    })
}
