//! Bounded PCM accumulator.
//!
//! Raw PCM arrives from the remote endpoint in small, irregular chunks.
//! Consumers want fewer, larger buffers, so chunks are collected until the
//! buffer holds a fixed *duration* of audio:
//!
//! ```text
//! threshold = sample_rate × channels × bytes_per_sample × target_seconds
//! ```
//!
//! Every chunk handed out is exactly one threshold long.  Bytes past the
//! threshold stay buffered for the next chunk, and a single large push may
//! yield several chunks.  A partial buffer is never flushed: when the session
//! ends it is simply dropped, so consumers see audio at a fixed granularity
//! and up to one threshold of trailing audio may be lost.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// PCM stream layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: u16,
}

impl AudioFormat {
    /// Bytes per sample frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bytes_per_sample)
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.frame_size()
    }

    /// Byte count holding `duration` of audio, rounded down to whole sample
    /// frames and never less than one frame.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let frame = self.frame_size().max(1);
        let raw = (self.bytes_per_second() as u128 * duration.as_millis() / 1000) as usize;
        (raw / frame).max(1) * frame
    }
}

impl Default for AudioFormat {
    /// 44.1 kHz, stereo, signed 16-bit.
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bytes_per_sample: 2,
        }
    }
}

/// Collects PCM bytes until a fixed-duration threshold is reached.
#[derive(Debug, Clone)]
pub struct AudioAccumulator {
    buffer: Vec<u8>,
    threshold: usize,
}

impl AudioAccumulator {
    pub fn new(format: AudioFormat, target: Duration) -> Self {
        Self::with_threshold(format.bytes_for(target))
    }

    /// Creates an accumulator with an explicit byte threshold (at least 1).
    pub fn with_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            buffer: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Appends `pcm` and returns every complete threshold-sized chunk, in
    /// stream order.  The remainder stays buffered.
    pub fn push(&mut self, pcm: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(pcm);
        let mut chunks = Vec::new();
        while self.buffer.len() >= self.threshold {
            let rest = self.buffer.split_off(self.threshold);
            chunks.push(std::mem::replace(&mut self.buffer, rest));
        }
        chunks
    }

    /// Discards any pending partial buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
