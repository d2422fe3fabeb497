//! Chunk-to-line reassembly.
//!
//! Byte chunks from the transport are decoded as UTF-8 and appended to a
//! trailing buffer; every `\n`-terminated line is handed back and the
//! unterminated remainder is kept for the next chunk.

use crate::types::StreamError;
use std::str::Utf8Error;
use tracing::warn;

/// Accumulates raw chunks and yields complete lines.
///
/// Invariant: `trailing` never contains `\n`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    trailing: String,
    /// Bytes of a multi-byte character cut off at the end of the last chunk.
    partial_char: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the lines it completed, in order.
    ///
    /// Empty lines are preserved. An `Err` entry marks bytes that were not
    /// valid UTF-8 and were dropped; the buffered partial line is left as it
    /// was. If the character carried over from the previous chunk turns out
    /// to be invalid, it is reported first and this chunk is decoded on its
    /// own.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<Result<String, StreamError>> {
        let mut out = Vec::new();
        let carried = std::mem::take(&mut self.partial_char);

        let joined;
        let bytes = if carried.is_empty() {
            chunk
        } else {
            let mut buf = carried.clone();
            buf.extend_from_slice(chunk);
            let carried_invalid = match std::str::from_utf8(&buf) {
                Err(e) if e.error_len().is_some() && e.valid_up_to() < carried.len() => Some(e),
                _ => None,
            };
            match carried_invalid {
                Some(e) => {
                    warn!(
                        "Dropping {} carried bytes of an unfinished UTF-8 sequence: {}",
                        carried.len(),
                        e
                    );
                    out.push(Err(StreamError::UnknownEncoding(e)));
                    chunk
                }
                None => {
                    joined = buf;
                    &joined[..]
                }
            }
        };

        let (text, tail) = match decode_prefix(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Dropping chunk of {} bytes with invalid UTF-8: {}", chunk.len(), e);
                out.push(Err(StreamError::UnknownEncoding(e)));
                return out;
            }
        };
        self.partial_char = tail.to_vec();
        self.trailing.push_str(text);

        let Some(last_newline) = self.trailing.rfind('\n') else {
            return out;
        };
        let rest = self.trailing.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.trailing, rest);

        out.extend(
            complete[..complete.len() - 1]
                .split('\n')
                .map(|line| Ok(line.to_owned())),
        );
        out
    }

    /// The unterminated line carried over from previous chunks.
    pub fn trailing(&self) -> &str {
        &self.trailing
    }

    pub fn clear(&mut self) {
        self.trailing.clear();
        self.partial_char.clear();
    }
}

/// Decode the longest valid prefix, allowing an incomplete character at the
/// very end. Anything else that fails to decode is an error.
fn decode_prefix(bytes: &[u8]) -> Result<(&str, &[u8]), Utf8Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((text, &bytes[bytes.len()..])),
        Err(e) if e.error_len().is_none() => {
            let (valid, tail) = bytes.split_at(e.valid_up_to());
            Ok((std::str::from_utf8(valid)?, tail))
        }
        Err(e) => Err(e),
    }
}
