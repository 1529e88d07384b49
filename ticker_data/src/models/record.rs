use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    bar::{Bar, BarSeries},
    moving_average::{MovingAveragePeriods, MovingAverageSet, SeriesPoint},
};
use crate::processor::compute_moving_averages;

/// Display name shown while a symbol has no real data yet.
pub const PLACEHOLDER_NAME: &str = "Loading...";

/// Number of filler days in a placeholder record.
pub const PLACEHOLDER_DAYS: i64 = 7;

/// Everything the chart needs for one symbol: the bars, the derived volume
/// sub-series, and the moving averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub series: BarSeries,
    pub volume: Vec<SeriesPoint>,
    pub moving: MovingAverageSet,
    /// Set only on filler records; never saved.
    #[serde(skip)]
    placeholder: bool,
}

impl TickerRecord {
    /// Derives the volume sub-series and moving averages from `series`.
    ///
    /// The series is assumed to be ordered; nothing here re-validates it.
    pub fn from_series(series: BarSeries, periods: &MovingAveragePeriods) -> Self {
        let volume = volume_points(&series.bars);
        let moving = compute_moving_averages(&series.bars, periods);
        Self {
            series,
            volume,
            moving,
            placeholder: false,
        }
    }

    /// Filler record shown before a symbol's first successful load.
    ///
    /// One flat week of bars ending on the day the WIKI dataset stopped
    /// updating, so consumers always have something well-formed to draw.
    pub fn placeholder(symbol: &str, periods: &MovingAveragePeriods) -> Self {
        let end = placeholder_end();
        let bars = (0..PLACEHOLDER_DAYS)
            .rev()
            .map(|back| Bar {
                timestamp: end - Duration::days(back),
                open: 100.0,
                high: 150.0,
                low: 50.0,
                close: 100.0,
                volume: 100.0,
            })
            .collect();
        Self {
            placeholder: true,
            ..Self::from_series(BarSeries::new(symbol, PLACEHOLDER_NAME, bars), periods)
        }
    }

    /// Rebuilds the derived data after bars were appended in place.
    pub fn recompute(&mut self, periods: &MovingAveragePeriods) {
        self.volume = volume_points(&self.series.bars);
        self.moving = compute_moving_averages(&self.series.bars, periods);
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series.last_timestamp()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

fn volume_points(bars: &[Bar]) -> Vec<SeriesPoint> {
    bars.iter()
        .map(|b| SeriesPoint::new(b.timestamp, b.volume))
        .collect()
}

fn placeholder_end() -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(2018, 3, 27).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}
