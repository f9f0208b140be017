//! Trailing-window time buckets.
//!
//! A window of length D ending at the stable "now" is split into K
//! half-open buckets `[start, end)`. Bucket bounds are computed in integer
//! milliseconds so adjacent buckets share their boundary exactly and every
//! in-window timestamp lands in exactly one bucket. Timestamps outside the
//! window are dropped, never clipped into an edge bucket.

use chrono::Duration;
use serde::Serialize;

use crate::clock::StableClock;
use crate::error::CoreError;
use crate::metrics::rates::percent;
use crate::thresholds::TrendWindow;
use crate::types::Timestamp;

/// What an entity contributes to its bucket besides the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Finished,
    Error,
    Other,
}

/// One bucket of a trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub start: Timestamp,
    pub end: Timestamp,
    pub total: u64,
    pub finished: u64,
    pub error: u64,
    /// `finished / total`, absent for an empty bucket.
    pub rate: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBuckets {
    start: Timestamp,
    span_ms: i64,
    count: usize,
}

impl TimeBuckets {
    /// `window.buckets` buckets covering `[now - window, now)`.
    pub fn trailing(clock: &StableClock, window: TrendWindow) -> Result<Self, CoreError> {
        if window.buckets == 0 {
            return Err(CoreError::Validation(
                "a trend needs at least one bucket".to_string(),
            ));
        }
        if window.minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "trend window must be positive, got {} minutes",
                window.minutes
            )));
        }
        let span = window.duration();
        Ok(Self {
            start: clock.window_start(span),
            span_ms: span.num_milliseconds(),
            count: window.buckets,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Offset of boundary `i` from the window start, in milliseconds.
    fn boundary_ms(&self, i: usize) -> i64 {
        (i128::from(self.span_ms) * i as i128 / self.count as i128) as i64
    }

    /// `[start, end)` of bucket `i`.
    pub fn bounds(&self, i: usize) -> (Timestamp, Timestamp) {
        (
            self.start + Duration::milliseconds(self.boundary_ms(i)),
            self.start + Duration::milliseconds(self.boundary_ms(i + 1)),
        )
    }

    /// Index of the bucket containing `ts`, if it falls inside the window.
    pub fn index_of(&self, ts: Timestamp) -> Option<usize> {
        let offset = ts.signed_duration_since(self.start).num_milliseconds();
        if offset < 0 || offset >= self.span_ms {
            return None;
        }
        let mut idx = (i128::from(offset) * self.count as i128 / i128::from(self.span_ms)) as usize;
        // Integer division can land one off near a boundary; nudge into place.
        while idx > 0 && offset < self.boundary_ms(idx) {
            idx -= 1;
        }
        while idx + 1 < self.count && offset >= self.boundary_ms(idx + 1) {
            idx += 1;
        }
        Some(idx)
    }

    /// Accumulate `items` into a series.
    ///
    /// `timestamp` picks the instant that places an item; items without
    /// one are skipped. `tally` decides which sub-count an item feeds.
    pub fn series<T>(
        &self,
        items: &[T],
        timestamp: impl Fn(&T) -> Option<Timestamp>,
        tally: impl Fn(&T) -> Tally,
    ) -> Vec<BucketCount> {
        let mut out: Vec<BucketCount> = (0..self.count)
            .map(|i| {
                let (start, end) = self.bounds(i);
                BucketCount {
                    start,
                    end,
                    total: 0,
                    finished: 0,
                    error: 0,
                    rate: None,
                }
            })
            .collect();

        for item in items {
            let Some(idx) = timestamp(item).and_then(|ts| self.index_of(ts)) else {
                continue;
            };
            let bucket = &mut out[idx];
            bucket.total += 1;
            match tally(item) {
                Tally::Finished => bucket.finished += 1,
                Tally::Error => bucket.error += 1,
                Tally::Other => {}
            }
        }

        for bucket in &mut out {
            bucket.rate = percent(bucket.finished, bucket.total);
        }
        out
    }
}
