//! Fabricated daily bars that keep a stale series looking live.
//!
//! Each new bar is a bounded random walk from its predecessor's high and
//! volume. Prices are not clamped at zero, so a long walk from a low base can
//! go negative.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::Rng;
use shared_utils::numeric::{random_float_in_range, random_int_in_range, round3};

use crate::models::{bar::Bar, moving_average::MovingAveragePeriods, record::TickerRecord};

/// UTC midnight of the day before `now`. Synthetic bars never go past it.
pub fn yesterday(now: DateTime<Utc>) -> DateTime<Utc> {
    (now - Duration::days(1))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// One fabricated bar dated `timestamp`, derived from `prev`.
///
/// - high: `[prev.high - 9.5, prev.high + 10)`
/// - low: `[high - 8, high - 2)`
/// - open, close: `[low, high)`, drawn independently
/// - volume: `[0.8 * prev.volume, 1.25 * prev.volume)`
pub fn synthesize_bar<R: Rng + ?Sized>(prev: &Bar, timestamp: DateTime<Utc>, rng: &mut R) -> Bar {
    let high = random_float_in_range(rng, prev.high - 9.5, prev.high + 10.0);
    let low = random_float_in_range(rng, high - 8.0, high - 2.0);
    let open = random_float_in_range(rng, low, high);
    let close = random_float_in_range(rng, low, high);
    let volume = random_float_in_range(rng, prev.volume * 0.8, prev.volume * 1.25);

    Bar {
        timestamp,
        open: round3(open),
        high: round3(high),
        low: round3(low),
        close: round3(close),
        volume: round3(volume),
    }
}

/// Appends one synthetic bar per missing day up to and including yesterday.
///
/// Returns how many bars were appended. Volume and moving averages are
/// rebuilt from scratch when anything was added. Empty series are left alone
/// since there is no bar to walk from.
pub fn extend_to_yesterday<R: Rng + ?Sized>(
    record: &mut TickerRecord,
    now: DateTime<Utc>,
    periods: &MovingAveragePeriods,
    rng: &mut R,
) -> usize {
    let limit = yesterday(now);
    let mut appended = 0;

    while let Some(prev) = record.series.bars.last() {
        let next = prev.timestamp + Duration::days(1);
        if next > limit {
            break;
        }
        let bar = synthesize_bar(prev, next, rng);
        record.series.bars.push(bar);
        appended += 1;
    }

    if appended > 0 {
        record.recompute(periods);
    }
    appended
}

/// Randomized pause between live-simulation ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSchedule {
    pub min_delay: std::time::Duration,
    pub max_delay: std::time::Duration,
}

impl SimulationSchedule {
    pub fn new(min_delay: std::time::Duration, max_delay: std::time::Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Uniform delay in `[min_delay, max_delay]`, millisecond resolution.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> std::time::Duration {
        let ms = random_int_in_range(
            rng,
            self.min_delay.as_millis() as i64,
            self.max_delay.as_millis() as i64,
        );
        std::time::Duration::from_millis(ms.max(0) as u64)
    }
}

impl Default for SimulationSchedule {
    fn default() -> Self {
        Self::new(
            std::time::Duration::from_secs(5),
            std::time::Duration::from_secs(15),
        )
    }
}
