//! Incremental decoding of `{"rows": [...]}` response bodies.
//!
//! [`RowScanner`] walks the body one byte at a time. The root object and the
//! `rows` array are checked token by token; every other value (each row, and
//! each member besides `rows`) is captured whole and handed to `serde_json`
//! as soon as it ends, so rows become available long before the body is
//! complete.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::transport::{Body, SqlResponse};

/// One result row.
pub type Row = Map<String, Value>;

const ROWS_KEY: &str = "rows";

/// Where the scanner is in the root object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    /// Nothing but whitespace seen.
    #[default]
    Start,
    /// After `{`: a member name or `}`.
    FirstKey,
    /// After `,`: a member name.
    Key,
    Colon,
    Value,
    /// After a member value: `,` or `}`.
    AfterValue,
    /// After `"rows": [`: a row or `]`.
    FirstRow,
    /// After `,` in `rows`: a row.
    Row,
    /// After a row: `,` or `]`.
    AfterRow,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Key,
    Value,
    Row,
}

enum Progress {
    Pending,
    /// The byte closed the value.
    Complete,
    /// The value ended before the byte, which still needs handling.
    Ended,
}

/// Bytes of one JSON value, collected until the value is complete.
#[derive(Debug, Default)]
struct Capture {
    buf: Vec<u8>,
    stack: Vec<u8>,
    in_string: bool,
    escaped: bool,
}

impl Capture {
    fn push(&mut self, byte: u8) -> Result<Progress> {
        if self.in_string {
            self.buf.push(byte);
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
                if self.stack.is_empty() {
                    return Ok(Progress::Complete);
                }
            }
            return Ok(Progress::Pending);
        }

        // A bare scalar runs until a delimiter.
        if !self.buf.is_empty() && self.stack.is_empty() {
            if byte.is_ascii_whitespace() || matches!(byte, b',' | b'}' | b']') {
                return Ok(Progress::Ended);
            }
            self.buf.push(byte);
            return Ok(Progress::Pending);
        }

        self.buf.push(byte);
        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.stack.push(byte),
            b'}' | b']' => {
                let open = if byte == b'}' { b'{' } else { b'[' };
                if self.stack.pop() != Some(open) {
                    return Err(decode_error("unbalanced brackets in response"));
                }
                if self.stack.is_empty() {
                    return Ok(Progress::Complete);
                }
            }
            b',' | b':' if self.stack.is_empty() => {
                return Err(decode_error("expected a value in response object"));
            }
            _ => {}
        }
        Ok(Progress::Pending)
    }
}

/// Byte-level scanner for a streamed result document.
#[derive(Debug, Default)]
pub struct RowScanner {
    state: State,
    capture: Option<(Target, Capture)>,
    /// Name of the member whose value comes next.
    member: String,
    ready: VecDeque<Row>,
}

impl RowScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the next chunk of the body.
    ///
    /// Rows completed by this chunk are queued for [`next_row`](Self::next_row),
    /// including those that precede an error.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] when the bytes cannot be part of a valid document.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        for &byte in chunk {
            self.step(byte)?;
        }
        Ok(())
    }

    /// Pops the oldest completed row.
    pub fn next_row(&mut self) -> Option<Row> {
        self.ready.pop_front()
    }

    /// Checks that the body ended on a complete document.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] for an empty or truncated body.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::Start => Err(decode_error("empty response body")),
            State::Done => Ok(()),
            _ => Err(decode_error("response body ended mid-document")),
        }
    }

    fn step(&mut self, byte: u8) -> Result<()> {
        if let Some((_, capture)) = self.capture.as_mut() {
            return match capture.push(byte)? {
                Progress::Pending => Ok(()),
                Progress::Complete => self.complete(),
                Progress::Ended => {
                    self.complete()?;
                    self.step(byte)
                }
            };
        }
        if byte.is_ascii_whitespace() {
            return Ok(());
        }

        self.state = match (self.state, byte) {
            (State::Start, b'{') => State::FirstKey,
            (State::Start, _) => return Err(decode_error("response root is not an object")),
            (State::FirstKey | State::Key, b'"') => return self.begin(Target::Key, byte),
            (State::FirstKey | State::AfterValue, b'}') => State::Done,
            (State::FirstKey | State::Key, _) => {
                return Err(decode_error("expected a member name in response object"));
            }
            (State::Colon, b':') => State::Value,
            (State::Colon, _) => return Err(decode_error("expected `:` after member name")),
            (State::Value, b'[') if self.member == ROWS_KEY => State::FirstRow,
            (State::Value, _) => return self.begin(Target::Value, byte),
            (State::AfterValue, b',') => State::Key,
            (State::AfterValue, _) => {
                return Err(decode_error("expected `,` or `}` in response object"));
            }
            (State::FirstRow | State::Row, b'{') => return self.begin(Target::Row, byte),
            (State::FirstRow | State::AfterRow, b']') => State::AfterValue,
            (State::FirstRow | State::Row, _) => return Err(decode_error("row is not an object")),
            (State::AfterRow, b',') => State::Row,
            (State::AfterRow, _) => return Err(decode_error("expected `,` or `]` in rows")),
            (State::Done, _) => {
                return Err(decode_error("trailing data after response document"));
            }
        };
        Ok(())
    }

    fn begin(&mut self, target: Target, byte: u8) -> Result<()> {
        let mut capture = Capture::default();
        let progress = capture.push(byte)?;
        self.capture = Some((target, capture));
        match progress {
            Progress::Complete => self.complete(),
            Progress::Pending | Progress::Ended => Ok(()),
        }
    }

    fn complete(&mut self) -> Result<()> {
        let Some((target, capture)) = self.capture.take() else {
            return Ok(());
        };
        match target {
            Target::Key => {
                self.member = serde_json::from_slice(&capture.buf)
                    .map_err(|e| decode_error(&format!("invalid member name: {e}")))?;
                self.state = State::Colon;
            }
            Target::Value => {
                serde_json::from_slice::<IgnoredAny>(&capture.buf).map_err(|e| {
                    decode_error(&format!("invalid value for \"{}\": {e}", self.member))
                })?;
                self.state = State::AfterValue;
            }
            Target::Row => {
                let row = serde_json::from_slice::<Row>(&capture.buf)
                    .map_err(|e| decode_error(&format!("invalid row: {e}")))?;
                self.ready.push_back(row);
                self.state = State::AfterRow;
            }
        }
        Ok(())
    }
}

fn decode_error(message: &str) -> Error {
    Error::Decode(String::from(message))
}

struct DecodeState {
    body: Body,
    scanner: RowScanner,
    error: Option<Error>,
    done: bool,
}

/// Rows of a streamed result, decoded as the body arrives.
///
/// Forward-only; the first error ends the stream. The status and headers of
/// the response stay available while the rows are read.
pub struct RowStream {
    status: StatusCode,
    headers: HeaderMap,
    inner: BoxStream<'static, Result<Row>>,
}

impl RowStream {
    /// Decodes rows from a response.
    pub fn new(response: SqlResponse) -> Self {
        let SqlResponse {
            status,
            headers,
            body,
        } = response;
        Self {
            status,
            headers,
            ..Self::from_body(body)
        }
    }

    /// Decodes rows from a bare body, reported as `200 OK` without headers.
    pub fn from_body(body: Body) -> Self {
        let state = DecodeState {
            body,
            scanner: RowScanner::new(),
            error: None,
            done: false,
        };
        let inner = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(row) = state.scanner.next_row() {
                    return Some((Ok(row), state));
                }
                if let Some(err) = state.error.take() {
                    return Some((Err(err), state));
                }
                if state.done {
                    return None;
                }
                match state.body.next().await {
                    Some(Ok(chunk)) => {
                        if let Err(err) = state.scanner.feed(&chunk) {
                            state.error = Some(err);
                            state.done = true;
                        }
                    }
                    Some(Err(err)) => {
                        state.error = Some(err);
                        state.done = true;
                    }
                    None => {
                        state.error = state.scanner.finish().err();
                        state.done = true;
                    }
                }
            }
        });
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            inner: inner.boxed(),
        }
    }

    /// A stream over rows that are already in memory.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            inner: stream::iter(rows.into_iter().map(Ok)).boxed(),
        }
    }

    /// Reads every row now, keeping the response status and headers.
    ///
    /// # Errors
    ///
    /// The first error of the body.
    pub async fn buffered(self) -> Result<Self> {
        let Self {
            status,
            headers,
            inner,
        } = self;
        let rows: Vec<Row> = inner.try_collect().await?;
        Ok(Self {
            status,
            headers,
            ..Self::from_rows(rows)
        })
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Stream for RowStream {
    type Item = Result<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
