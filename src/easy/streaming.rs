//! Incremental body consumption.
//!
//! While a scheduler-driven transfer is running, the body buffer keeps
//! growing. The controller remembers how much of it has been handed out so
//! each [`StreamingController::drain`] returns only the new bytes. An empty
//! chunk means "nothing new yet", never end of stream; completion is reported
//! by the scheduler.

use crate::easy::buffer::ResponseBuffer;
use bytes::Bytes;

/// Offset-tracking reader over a body buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingController {
    enabled: bool,
    read_offset: usize,
}

impl StreamingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch between buffered and streaming consumption.
    ///
    /// Entering streaming mode rewinds the read offset.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.read_offset = 0;
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    /// Whether `body` holds bytes past the read offset.
    pub fn has_pending(&self, body: &ResponseBuffer) -> bool {
        body.len() > self.read_offset
    }

    /// Copy everything past the read offset and advance it to the end.
    pub fn drain(&mut self, body: &ResponseBuffer) -> Bytes {
        let chunk = body.copy_from(self.read_offset);
        // A truncated buffer restarts the offset with it.
        self.read_offset = body.len();
        chunk
    }

    /// Rewind for another transfer without touching buffer content.
    pub fn reset(&mut self) {
        self.read_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_sequence() {
        let mut body = ResponseBuffer::body();
        let mut stream = StreamingController::new();
        stream.set_enabled(true);

        body.append(b"abc").unwrap();
        assert!(stream.has_pending(&body));
        assert_eq!(&stream.drain(&body)[..], b"abc");
        assert_eq!(stream.read_offset(), 3);

        assert!(!stream.has_pending(&body));
        assert!(stream.drain(&body).is_empty());

        body.append(b"de").unwrap();
        assert_eq!(&stream.drain(&body)[..], b"de");
        assert_eq!(stream.read_offset(), 5);
    }

    #[test]
    fn test_chunks_concatenate_to_snapshot() {
        let mut body = ResponseBuffer::body();
        let mut stream = StreamingController::new();
        stream.set_enabled(true);

        let mut collected = Vec::new();
        for i in 0..200u32 {
            body.append(format!("chunk-{i};").as_bytes()).unwrap();
            if i % 7 == 0 {
                collected.extend_from_slice(&stream.drain(&body));
            }
        }
        collected.extend_from_slice(&stream.drain(&body));
        assert_eq!(collected, body.snapshot().to_vec());
    }

    #[test]
    fn test_enable_rewinds_offset() {
        let mut body = ResponseBuffer::body();
        body.append(b"xyz").unwrap();
        let mut stream = StreamingController::new();
        stream.drain(&body);
        assert_eq!(stream.read_offset(), 3);

        stream.set_enabled(true);
        assert_eq!(stream.read_offset(), 0);
        assert!(stream.is_enabled());
    }

    #[test]
    fn test_reset_keeps_buffer() {
        let mut body = ResponseBuffer::body();
        body.append(b"keep").unwrap();
        let mut stream = StreamingController::new();
        stream.set_enabled(true);
        stream.drain(&body);

        stream.reset();
        assert_eq!(stream.read_offset(), 0);
        assert_eq!(&body.snapshot()[..], b"keep");
        assert_eq!(&stream.drain(&body)[..], b"keep");
    }

    #[test]
    fn test_truncated_buffer_restarts_offset() {
        let mut body = ResponseBuffer::body();
        let mut stream = StreamingController::new();
        body.append(b"old transfer").unwrap();
        stream.drain(&body);

        body.truncate();
        assert!(stream.drain(&body).is_empty());
        body.append(b"new").unwrap();
        assert_eq!(&stream.drain(&body)[..], b"new");
    }
}
