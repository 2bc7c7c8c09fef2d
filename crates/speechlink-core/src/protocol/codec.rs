//! Line-delimited frame codec.
//!
//! The relay stream is a sequence of UTF-8 JSON objects separated by `\n`,
//! tolerating `\r\n` from peers with Windows line endings.  TLS reads hand
//! the codec arbitrary byte chunks; the codec buffers partial lines across
//! reads and yields only complete frames.
//!
//! No escaping is performed inside frames: a frame must not contain `\n`,
//! which JSON string encoding already guarantees for well-formed senders.

use tracing::warn;

/// Accumulates raw received bytes and splits them into newline-terminated
/// frames.
///
/// # Examples
///
/// ```rust
/// use speechlink_core::protocol::codec::LineCodec;
///
/// let mut codec = LineCodec::new();
/// codec.push(b"{\"type\":\"cancel\"}\n{\"type\":");
/// assert_eq!(codec.drain_frames(), vec!["{\"type\":\"cancel\"}".to_string()]);
/// codec.push(b"\"channel_joined\"}\r\n");
/// assert_eq!(codec.drain_frames(), vec!["{\"type\":\"channel_joined\"}".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Creates an empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Extracts every complete frame currently buffered, in arrival order.
    ///
    /// Each frame is trimmed of a single trailing `\r`; empty segments (bare
    /// newlines or `\r\n` keep-alives) are dropped.  Bytes after the last
    /// newline stay buffered for the next call.  A frame that is not valid
    /// UTF-8 is logged and dropped rather than failing the stream.
    pub fn drain_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            match String::from_utf8(line) {
                Ok(frame) => frames.push(frame),
                Err(e) => warn!(error = %e, "dropping frame with invalid UTF-8"),
            }
        }
        frames
    }

    /// Appends the wire terminator to an outbound frame.
    pub fn encode(frame: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(frame.len() + 1);
        bytes.extend_from_slice(frame.as_bytes());
        bytes.push(b'\n');
        bytes
    }

    /// Number of buffered bytes awaiting a newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_yields_every_frame_in_a_multi_frame_chunk() {
        let mut codec = LineCodec::new();
        codec.push(b"one\ntwo\r\nthree\n");
        assert_eq!(codec.drain_frames(), vec!["one", "two", "three"]);
        assert_eq!(codec.pending_len(), 0);
    }

    #[test]
    fn test_partial_frame_is_buffered_across_pushes() {
        let mut codec = LineCodec::new();
        codec.push(b"{\"type\":\"spe");
        assert!(codec.drain_frames().is_empty());
        codec.push(b"ak\"}\n");
        assert_eq!(codec.drain_frames(), vec!["{\"type\":\"speak\"}"]);
    }

    #[test]
    fn test_single_trailing_carriage_return_is_stripped() {
        let mut codec = LineCodec::new();
        codec.push(b"frame\r\r\n");
        // Only one \r is stripped; an interior \r is payload.
        assert_eq!(codec.drain_frames(), vec!["frame\r"]);
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let mut codec = LineCodec::new();
        codec.push(b"\n\r\na\n\n");
        assert_eq!(codec.drain_frames(), vec!["a"]);
    }

    #[test]
    fn test_invalid_utf8_frame_is_dropped_without_poisoning_the_stream() {
        let mut codec = LineCodec::new();
        codec.push(&[0xFF, 0xFE, b'\n', b'o', b'k', b'\n']);
        assert_eq!(codec.drain_frames(), vec!["ok"]);
    }

    #[test]
    fn test_encode_appends_newline() {
        assert_eq!(LineCodec::encode("{}"), b"{}\n");
    }

    #[test]
    fn test_byte_at_a_time_delivery_reassembles_frames() {
        let mut codec = LineCodec::new();
        let mut frames = Vec::new();
        for byte in b"ab\ncd\n" {
            codec.push(&[*byte]);
            frames.extend(codec.drain_frames());
        }
        assert_eq!(frames, vec!["ab", "cd"]);
    }
}
