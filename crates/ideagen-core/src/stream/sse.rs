//! SSE (Server-Sent Events) decoding
//!
//! Turns raw byte chunks from the idea stream into frames. Chunks may split
//! lines (or multi-byte characters) anywhere; the incomplete tail is carried
//! over to the next chunk.

use std::time::Instant;
use tracing::{debug, info};

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if present
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Value of the `id:` field, if present
    pub id: Option<String>,
}

/// Incremental SSE decoder
pub struct SseDecoder {
    /// Bytes of the line still being received
    partial_line: Vec<u8>,
    /// Previous chunk ended on `\r`; a leading `\n` belongs to it
    skip_lf: bool,
    /// Fields of the frame being assembled
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
    /// When decoding started
    stream_start: Instant,
    /// Frame counter for logging
    frame_count: usize,
    /// Bytes received counter
    bytes_received: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            partial_line: Vec::new(),
            skip_lf: false,
            event: None,
            data: None,
            id: None,
            stream_start: Instant::now(),
            frame_count: 0,
            bytes_received: 0,
        }
    }

    /// Feed a chunk of bytes, returning every frame it completes
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.bytes_received += bytes.len();
        debug!(
            "SSE chunk received: {} bytes (total: {} bytes)",
            bytes.len(),
            self.bytes_received
        );
        self.partial_line.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut line_start = 0;
        let mut idx = 0;

        while idx < self.partial_line.len() {
            let byte = self.partial_line[idx];

            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    idx += 1;
                    line_start = idx;
                    continue;
                }
            }

            if byte == b'\n' || byte == b'\r' {
                // Line terminators never occur inside a UTF-8 sequence
                let line = String::from_utf8_lossy(&self.partial_line[line_start..idx]).into_owned();
                self.skip_lf = byte == b'\r';
                idx += 1;
                line_start = idx;
                if let Some(frame) = self.process_line(&line) {
                    frames.push(frame);
                }
            } else {
                idx += 1;
            }
        }

        self.partial_line.drain(..line_start);
        frames
    }

    /// End of stream: flush a trailing line and any frame left undispatched
    pub fn finish(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        if !self.partial_line.is_empty() {
            let line = String::from_utf8_lossy(&self.partial_line).into_owned();
            self.partial_line.clear();
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        if let Some(frame) = self.dispatch() {
            frames.push(frame);
        }

        info!(
            "SSE decoder finishing: {:?} elapsed, {} frames, {} bytes total",
            self.stream_start.elapsed(),
            self.frame_count,
            self.bytes_received
        );
        frames
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        // Blank line ends the current event
        if line.is_empty() {
            return self.dispatch();
        }

        // SSE comment (often used as keep-alive)
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" => debug!("Ignoring SSE retry hint: {}", value),
            _ => debug!("Ignoring unknown SSE field: {}", field),
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        // Events without data carry no fragment
        let data = self.data.take()?;

        self.frame_count += 1;
        debug!(
            "SSE frame #{} at {:?}: {} chars",
            self.frame_count,
            self.stream_start.elapsed(),
            data.len()
        );
        Some(SseFrame { event, data, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_of(frames: &[SseFrame]) -> Vec<&str> {
        frames.iter().map(|f| f.data.as_str()).collect()
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: Idea: \n\n");
        assert_eq!(data_of(&frames), vec!["Idea: "]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: A market").is_empty());
        assert!(decoder.push(b"place \n").is_empty());
        let frames = decoder.push(b"\ndata: for\n\n");
        assert_eq!(data_of(&frames), vec!["A marketplace ", "for"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        // Split inside the two-byte e-acute
        let split = bytes.iter().position(|b| *b == 0xc3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let frames = decoder.push(&bytes[split..]);
        assert_eq!(data_of(&frames), vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: # Title\ndata:\ndata: body\n\n");
        assert_eq!(data_of(&frames), vec!["# Title\n\nbody"]);
    }

    #[test]
    fn test_crlf_and_cr_terminators() {
        let mut decoder = SseDecoder::new();
        let mut frames = decoder.push(b"data: one\r");
        frames.extend(decoder.push(b"\n\r\ndata: two\r\r"));
        assert_eq!(data_of(&frames), vec!["one", "two"]);
    }

    #[test]
    fn test_comments_and_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\nevent: idea\nid: 7\nretry: 100\ndata:x\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("idea".to_string()),
                data: "x".to_string(),
                id: Some("7".to_string()),
            }]
        );
    }

    #[test]
    fn test_only_one_leading_space_is_stripped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data:  indented\n\n");
        assert_eq!(data_of(&frames), vec![" indented"]);
    }

    #[test]
    fn test_event_without_data_is_dropped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: ping\n\n").is_empty());
        let frames = decoder.push(b"data: after\n\n");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: first\n\ndata: last");
        assert_eq!(data_of(&frames), vec!["first"]);
        let frames = decoder.finish();
        assert_eq!(data_of(&frames), vec!["last"]);
        assert_eq!(decoder.frame_count(), 2);
    }
}
