use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Windows used when nothing else is configured.
pub const DEFAULT_MOVING_AVERAGE_PERIODS: [u32; 4] = [10, 25, 100, 200];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MovingAveragePeriodsError {
    #[error("at least one moving average window is required")]
    Empty,

    #[error("moving average windows must be at least one day long")]
    ZeroWindow,
}

/// A `(timestamp, value)` chart point, used for volume and averaged closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// The configured set of moving-average window lengths, in days.
///
/// Always non-empty, free of zeros and duplicates, and sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct MovingAveragePeriods(Vec<u32>);

impl MovingAveragePeriods {
    pub fn new(periods: impl IntoIterator<Item = u32>) -> Result<Self, MovingAveragePeriodsError> {
        let mut periods: Vec<u32> = periods.into_iter().collect();
        if periods.is_empty() {
            return Err(MovingAveragePeriodsError::Empty);
        }
        if periods.contains(&0) {
            return Err(MovingAveragePeriodsError::ZeroWindow);
        }
        periods.sort_unstable();
        periods.dedup();
        Ok(Self(periods))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Default for MovingAveragePeriods {
    fn default() -> Self {
        Self(DEFAULT_MOVING_AVERAGE_PERIODS.to_vec())
    }
}

impl TryFrom<Vec<u32>> for MovingAveragePeriods {
    type Error = MovingAveragePeriodsError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MovingAveragePeriods> for Vec<u32> {
    fn from(value: MovingAveragePeriods) -> Self {
        value.0
    }
}

/// Averaged closes keyed by window length.
///
/// Holds one entry per configured window, including windows longer than the
/// series (those map to an empty sequence).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageSet(IndexMap<u32, Vec<SeriesPoint>>);

impl MovingAverageSet {
    /// An entry with no points for every window in `periods`.
    pub fn empty(periods: &MovingAveragePeriods) -> Self {
        Self(periods.iter().map(|p| (p, Vec::new())).collect())
    }

    pub fn get(&self, period: u32) -> Option<&[SeriesPoint]> {
        self.0.get(&period).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[SeriesPoint])> {
        self.0.iter().map(|(p, pts)| (*p, pts.as_slice()))
    }

    pub fn periods(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub(crate) fn push(&mut self, period: u32, point: SeriesPoint) {
        self.0.entry(period).or_default().push(point);
    }
}
