use std::ops::Range;

use cadenza_core::StreamId;
use parking_lot::RwLock;

/// A buffered span of media and the stream it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferedSegment {
    pub stream: StreamId,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl BufferedSegment {
    pub fn new(stream: StreamId, start_secs: f64, end_secs: f64) -> Self {
        Self {
            stream,
            start_secs,
            end_secs,
        }
    }

    fn overlaps(&self, range: &Range<f64>) -> bool {
        self.start_secs < range.end && self.end_secs > range.start
    }
}

/// Read access to the segment bookkeeping of a media buffer.
pub trait BufferQuery {
    /// Distinct streams with buffered media overlapping `range`, in
    /// first-seen order.
    fn buffered_streams(&self, range: Range<f64>) -> Vec<StreamId>;
}

impl BufferQuery for [BufferedSegment] {
    fn buffered_streams(&self, range: Range<f64>) -> Vec<StreamId> {
        let mut streams: Vec<StreamId> = Vec::new();
        for segment in self.iter().filter(|s| s.overlaps(&range)) {
            if !streams.contains(&segment.stream) {
                streams.push(segment.stream.clone());
            }
        }
        streams
    }
}

impl BufferQuery for Vec<BufferedSegment> {
    fn buffered_streams(&self, range: Range<f64>) -> Vec<StreamId> {
        self.as_slice().buffered_streams(range)
    }
}

/// Bookkeeping updated by the buffer while quality streams read it.
impl<B: BufferQuery + ?Sized> BufferQuery for RwLock<B> {
    fn buffered_streams(&self, range: Range<f64>) -> Vec<StreamId> {
        self.read().buffered_streams(range)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn id(representation: &str) -> StreamId {
        StreamId::from_parts("p", "a", representation)
    }

    fn segments() -> Vec<BufferedSegment> {
        vec![
            BufferedSegment::new(id("low"), 0.0, 4.0),
            BufferedSegment::new(id("mid"), 4.0, 8.0),
            BufferedSegment::new(id("low"), 8.0, 12.0),
        ]
    }

    #[rstest]
    #[case(1.0..2.0, vec!["low"])]
    #[case(3.0..5.0, vec!["low", "mid"])]
    #[case(4.0..8.0, vec!["mid"])]
    #[case(7.0..9.0, vec!["mid", "low"])]
    #[case(0.0..12.0, vec!["low", "mid"])]
    #[case(20.0..21.0, vec![])]
    fn streams_overlapping_range(#[case] range: Range<f64>, #[case] expected: Vec<&str>) {
        let expected: Vec<_> = expected.into_iter().map(id).collect();
        assert_eq!(segments().buffered_streams(range), expected);
    }

    #[test]
    fn locked_bookkeeping_reads_current_state() {
        let buffer = RwLock::new(segments());
        assert_eq!(buffer.buffered_streams(5.0..6.0), vec![id("mid")]);

        buffer.write().clear();
        assert!(buffer.buffered_streams(5.0..6.0).is_empty());
    }
}
