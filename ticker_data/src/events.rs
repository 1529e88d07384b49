//! Random annotation markers for the last month of data.

use chrono::{DateTime, Duration, Utc};
use rand::{SeedableRng, rngs::StdRng};
use shared_utils::numeric::random_int_in_range;

use crate::models::event::EventMarker;

pub const MIN_EVENTS: i64 = 2;
pub const MAX_EVENTS: i64 = 4;
/// Markers land at most this many days before the end date.
pub const MAX_OFFSET_DAYS: i64 = 31;

/// Generates event markers, memoized on the end date they were drawn for.
pub struct EventSampler {
    rng: StdRng,
    last_end_date: Option<DateTime<Utc>>,
    markers: Vec<EventMarker>,
}

impl EventSampler {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            last_end_date: None,
            markers: Vec::new(),
        }
    }

    /// Markers for `end_date`.
    ///
    /// Calling again with the same end date returns the previous draw
    /// unchanged; a different end date draws a fresh set.
    pub fn markers_for(&mut self, end_date: DateTime<Utc>) -> &[EventMarker] {
        if self.last_end_date != Some(end_date) {
            self.markers = self.draw(end_date);
            self.last_end_date = Some(end_date);
        }
        &self.markers
    }

    fn draw(&mut self, end_date: DateTime<Utc>) -> Vec<EventMarker> {
        let count = random_int_in_range(&mut self.rng, MIN_EVENTS, MAX_EVENTS);
        let mut offsets: Vec<i64> = (0..count)
            .map(|_| random_int_in_range(&mut self.rng, 0, MAX_OFFSET_DAYS))
            .collect();
        // oldest first, so titles count up towards the end date
        offsets.sort_unstable_by(|a, b| b.cmp(a));

        offsets
            .into_iter()
            .zip(1u32..)
            .map(|(offset, title)| EventMarker::new(end_date - Duration::days(offset), title))
            .collect()
    }
}

impl Default for EventSampler {
    fn default() -> Self {
        Self::new()
    }
}
