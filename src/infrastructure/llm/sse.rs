//! Server-sent events decoding over a byte stream
//!
//! Lines are split on `\n` (a trailing `\r` is dropped), `data:` fields are joined with
//! newlines, and a blank line dispatches the event. Events may span network chunks.

use std::collections::VecDeque;

use futures::{stream, Stream, StreamExt};

use super::http_client::ByteStream;
use crate::domain::LlmError;

#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Option<String>,
    ready: VecDeque<String>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            self.process_line(&line);
        }
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            self.dispatch();
            return;
        }

        // comment
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
    }

    fn dispatch(&mut self) {
        if let Some(data) = self.data.take() {
            self.ready.push_back(data);
        }
    }

    /// Flush whatever is left once the byte stream ends
    fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(line.trim_end_matches('\r'));
        }
        self.dispatch();
    }
}

struct State {
    bytes: ByteStream,
    decoder: SseDecoder,
    finished: bool,
}

/// Turn a response body into the `data` payloads of its events.
pub fn sse_events(bytes: ByteStream) -> impl Stream<Item = Result<String, LlmError>> + Send {
    let state = State {
        bytes,
        decoder: SseDecoder::default(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.decoder.ready.pop_front() {
                return Some((Ok(data), state));
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.decoder.feed(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    state.decoder.finish();
                }
            }
        }
    })
}
