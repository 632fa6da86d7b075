use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;

use crate::error::OllamaError;
use crate::types::{ApiErrorBody, GenerateChunk, PullChunk};

/// A streamed generation, pulled one chunk at a time
///
/// The final chunk has `done: true` and carries the completion statistics. A daemon failure part
/// way through surfaces as [OllamaError::Api] and ends the stream.
pub struct GenerateStream {
    inner: NdJsonStream,
}

impl GenerateStream {
    pub(crate) fn new(inner: NdJsonStream) -> Self {
        Self { inner }
    }

    /// The next chunk, or `None` once the stream is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<GenerateChunk>, OllamaError> {
        self.inner.next_value().await
    }
}

/// A streamed model pull, pulled one progress chunk at a time
pub struct PullStream {
    inner: NdJsonStream,
}

impl PullStream {
    pub(crate) fn new(inner: NdJsonStream) -> Self {
        Self { inner }
    }

    /// The next progress chunk, or `None` once the stream is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<PullChunk>, OllamaError> {
        self.inner.next_value().await
    }
}

/// Pull-based reader over a newline-delimited JSON response body
///
/// Network chunks do not align with lines, so incoming bytes are buffered and handed back one
/// parsed object at a time, in arrival order.
pub(crate) struct NdJsonStream {
    response: reqwest::Response,
    lines: LineBuffer,
    body_finished: bool,
}

impl NdJsonStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            lines: LineBuffer::default(),
            body_finished: false,
        }
    }

    pub(crate) async fn next_value<T: DeserializeOwned>(
        &mut self,
    ) -> Result<Option<T>, OllamaError> {
        loop {
            if let Some(line) = self.lines.next_line() {
                return parse_line(&line).map(Some);
            }

            if self.body_finished {
                // The last object may not be newline-terminated.
                return match self.lines.take_remainder() {
                    Some(line) => parse_line(&line).map(Some),
                    None => Ok(None),
                };
            }

            match self.response.chunk().await? {
                Some(chunk) => self.lines.push(&chunk),
                None => self.body_finished = true,
            }
        }
    }
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, OllamaError> {
    // A failure mid-stream arrives as an error object on its own line.
    if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(line) {
        return Err(OllamaError::Api {
            message: body.error,
        });
    }

    Ok(serde_json::from_slice(line)?)
}

/// Splits buffered bytes into complete lines, skipping blank ones
#[derive(Default)]
struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// The next complete line in the buffer, without its terminator
    fn next_line(&mut self) -> Option<Bytes> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(line.freeze());
        }
        None
    }

    /// Whatever remains once the body has ended, if it is not just whitespace
    fn take_remainder(&mut self) -> Option<Bytes> {
        let rest = self.buffer.split();
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest.freeze())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect_lines(buffer: &mut LineBuffer) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = buffer.next_line() {
            lines.push(String::from_utf8(line.to_vec()).unwrap());
        }
        lines
    }

    #[test]
    fn lines_split_across_network_chunks() {
        let mut buffer = LineBuffer::default();

        buffer.push(b"{\"response\":\"The\",\"done\"");
        assert_eq!(Vec::<String>::new(), collect_lines(&mut buffer));

        buffer.push(b":false}\n{\"response\":\" cat\",\"done\":false}\n");
        assert_eq!(
            vec![
                r#"{"response":"The","done":false}"#.to_string(),
                r#"{"response":" cat","done":false}"#.to_string(),
            ],
            collect_lines(&mut buffer)
        );
    }

    #[test]
    fn blank_lines_are_skipped_and_remainder_flushed() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"\n  \n{\"done\":true}");

        assert_eq!(Vec::<String>::new(), collect_lines(&mut buffer));
        let rest = buffer.take_remainder().expect("remainder should be kept");
        assert_eq!(br#"{"done":true}"#.to_vec(), rest.to_vec());
        assert!(buffer.take_remainder().is_none());
    }

    #[test]
    fn error_lines_map_to_api_errors() {
        let result: Result<GenerateChunk, _> = parse_line(br#"{"error":"model not found"}"#);

        match result {
            Err(OllamaError::Api { message }) => assert_eq!("model not found", message),
            other => panic!("Expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn regular_lines_parse_as_chunks() {
        let chunk: GenerateChunk = parse_line(br#"{"response":"hi","done":false}"#).unwrap();
        assert_eq!("hi", chunk.response);
    }
}
