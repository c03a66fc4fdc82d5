//! Rolling window of pressure samples

use crate::core::reading::Reading;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of samples kept (ten minutes at one sample per second)
pub const DEFAULT_WINDOW: usize = 600;

/// Lower plot margin applied to the window minimum
const LOWER_MARGIN: f64 = 0.98;
/// Upper plot margin applied to the window maximum
const UPPER_MARGIN: f64 = 1.02;

/// One successful poll
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Sample {
    /// Poll number, counting failed polls too
    pub index: u64,
    /// Wall-clock time of the poll
    pub timestamp: DateTime<Local>,
    /// Gauge that was read
    pub gauge: u8,
    /// Decoded reading
    pub reading: Reading,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn now(index: u64, gauge: u8, reading: Reading) -> Self {
        Self {
            index,
            timestamp: Local::now(),
            gauge,
            reading,
        }
    }
}

/// Bounded history of samples, oldest dropped first
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
    failures: u64,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SampleWindow {
    /// Create a window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    /// Add a sample
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Count a poll that produced no sample
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Failed polls so far
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Samples in the window
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Min and max pressure in the window
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.samples.iter().map(|s| s.reading.value).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
    }

    /// Axis limits with a 2% margin on both ends
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.value_range()
            .map(|(min, max)| (min * LOWER_MARGIN, max * UPPER_MARGIN))
    }

    /// Samples whose status was not okay
    pub fn warnings(&self) -> usize {
        self.samples.iter().filter(|s| !s.reading.is_okay()).count()
    }
}
