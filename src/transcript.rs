use std::sync::RwLock;

use crate::transcribe::TranscriptSegment;

/// Single-writer, append-only transcript buffer.
///
/// Only the transcription session's receive path appends; the lifecycle
/// controller reads snapshots and clears outside RECORDING.
pub struct TranscriptAccumulator {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    text: String,
    segments: Vec<TranscriptSegment>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Appends the segment's text, space-joined, in arrival order.
    ///
    /// Every delivered segment is appended, interim and final alike; a
    /// service that re-sends corrected final text for an already-delivered
    /// interim span will duplicate words. De-duplication is a service-level
    /// contract, not applied here.
    pub fn append(&self, segment: TranscriptSegment) {
        let mut inner = self.inner.write().unwrap();
        if !inner.text.is_empty() {
            inner.text.push(' ');
        }
        inner.text.push_str(&segment.text);
        inner.segments.push(segment);
    }

    /// Current full text; readers always see a consistent prefix.
    pub fn snapshot(&self) -> String {
        self.inner.read().unwrap().text.clone()
    }

    /// Segments received so far, in arrival order
    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.inner.read().unwrap().segments.clone()
    }

    pub fn segment_count(&self) -> usize {
        self.inner.read().unwrap().segments.len()
    }

    pub fn char_count(&self) -> usize {
        self.inner.read().unwrap().text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().text.is_empty()
    }

    /// Resets the buffer. Only called when no recording is active.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.text.clear();
        inner.segments.clear();
    }
}

impl Default for TranscriptAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
