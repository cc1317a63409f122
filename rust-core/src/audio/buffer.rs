//! Lock-free sample feed between a capture callback and the analyzer
//!
//! Capture callbacks deliver blocks of whatever size the device picks. The
//! feed collects them and hands out fixed-size frames, so `consume` always
//! sees the same power-of-two length.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Single-producer single-consumer sample queue
pub struct SampleFeed {
    writer: SampleWriter,
    reader: SampleReader,
}

impl SampleFeed {
    /// Create a feed holding up to `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<f32>::new(capacity.max(1));
        let (producer, consumer) = rb.split();

        Self {
            writer: SampleWriter { producer },
            reader: SampleReader { consumer },
        }
    }

    /// Split into the capture-side writer and analysis-side reader
    pub fn split(self) -> (SampleWriter, SampleReader) {
        (self.writer, self.reader)
    }
}

/// Capture-side end of a [`SampleFeed`]
pub struct SampleWriter {
    producer: HeapProducer<f32>,
}

impl SampleWriter {
    /// Queue samples without blocking
    ///
    /// # Arguments
    /// * `samples` - Captured samples in arrival order
    ///
    /// # Returns
    /// How many were accepted; the rest are dropped when the feed is full
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Free slots
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }
}

/// Analysis-side end of a [`SampleFeed`]
pub struct SampleReader {
    consumer: HeapConsumer<f32>,
}

impl SampleReader {
    /// Fill `frame` completely if enough samples are queued
    ///
    /// Leaves the queue untouched and returns false otherwise.
    pub fn next_frame(&mut self, frame: &mut [f32]) -> bool {
        if self.consumer.len() < frame.len() {
            return false;
        }
        self.consumer.pop_slice(frame) == frame.len()
    }

    /// Drop the oldest samples so that at most `keep` remain queued
    ///
    /// Lets a slow reader catch up to live input instead of drawing stale
    /// frames. Returns the number discarded.
    pub fn discard_backlog(&mut self, keep: usize) -> usize {
        let excess = self.consumer.len().saturating_sub(keep);
        self.consumer.skip(excess)
    }

    /// Queued samples
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
