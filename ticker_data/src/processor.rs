//! Turns a raw feed dataset into a [`TickerRecord`].
//!
//! Parsing is all-or-nothing: the first malformed row aborts the symbol and no
//! partial series escapes. Moving averages are computed in one forward pass
//! with a running sum per window.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use shared_utils::numeric::round3;

use crate::errors::{InvalidDateError, MalformedRecordError};
use crate::models::{
    bar::{Bar, BarSeries},
    dataset::RawDataset,
    moving_average::{MovingAveragePeriods, MovingAverageSet, SeriesPoint},
    record::TickerRecord,
};

/// Numeric columns that follow the date in every row, in wire order.
/// Columns past these (adjusted prices, split ratios) are ignored.
pub const NUMERIC_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Parses a `YYYY-MM-DD` trading date into UTC midnight.
pub fn parse_trading_date(value: &str) -> Result<DateTime<Utc>, InvalidDateError> {
    let parts: Vec<&str> = value.trim().split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(InvalidDateError::ComponentCount { found: parts.len() });
    };

    let year: i32 = parse_component(year)?;
    let month: u32 = parse_component(month)?;
    let day: u32 = parse_component(day)?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(InvalidDateError::OutOfRange { year, month, day })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_component<T: std::str::FromStr>(component: &str) -> Result<T, InvalidDateError> {
    component
        .parse()
        .map_err(|_| InvalidDateError::NotInteger {
            component: component.to_string(),
        })
}

/// Builds the full record (bars, volume, moving averages) for `symbol`.
pub fn process_dataset(
    symbol: &str,
    raw: &RawDataset,
    periods: &MovingAveragePeriods,
) -> Result<TickerRecord, MalformedRecordError> {
    let bars = parse_rows(&raw.dataset.data)?;
    let series = BarSeries::new(symbol, raw.dataset.name.clone(), bars);
    Ok(TickerRecord::from_series(series, periods))
}

/// Parses every row, enforcing strictly increasing timestamps.
pub fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<Bar>, MalformedRecordError> {
    let mut bars: Vec<Bar> = Vec::with_capacity(rows.len());
    for (row, entry) in rows.iter().enumerate() {
        let bar = parse_row(row, entry)?;
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(MalformedRecordError::OutOfOrder {
                    row,
                    timestamp: bar.timestamp,
                });
            }
        }
        bars.push(bar);
    }
    Ok(bars)
}

fn parse_row(row: usize, entry: &[Value]) -> Result<Bar, MalformedRecordError> {
    if entry.len() < 1 + NUMERIC_FIELDS.len() {
        return Err(MalformedRecordError::MissingColumns {
            row,
            expected: NUMERIC_FIELDS.len(),
            found: entry.len(),
        });
    }

    let date = entry[0]
        .as_str()
        .ok_or(MalformedRecordError::DateNotString { row })?;
    let timestamp =
        parse_trading_date(date).map_err(|source| MalformedRecordError::InvalidDate {
            row,
            value: date.to_string(),
            source,
        })?;

    let mut values = [0.0; NUMERIC_FIELDS.len()];
    for (slot, (field, value)) in values
        .iter_mut()
        .zip(NUMERIC_FIELDS.iter().zip(&entry[1..]))
    {
        *slot = value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(MalformedRecordError::NonNumeric { row, field: *field })?;
    }
    let [open, high, low, close, volume] = values;

    if volume < 0.0 {
        return Err(MalformedRecordError::NegativeVolume { row, volume });
    }

    Ok(Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Sliding-window averages of the close, one running sum per window.
///
/// Point `i` of the `p`-window sequence sits at `bars[i + p - 1].timestamp`;
/// windows longer than the series produce no points.
pub fn compute_moving_averages(bars: &[Bar], periods: &MovingAveragePeriods) -> MovingAverageSet {
    let mut set = MovingAverageSet::empty(periods);
    let mut sums: Vec<(u32, f64)> = periods.iter().map(|p| (p, 0.0)).collect();

    for (i, bar) in bars.iter().enumerate() {
        for (period, sum) in sums.iter_mut() {
            let p = *period as usize;
            *sum += bar.close;
            if i >= p {
                *sum -= bars[i - p].close;
            }
            if i + 1 >= p {
                let avg = round3(*sum / p as f64);
                set.push(*period, SeriesPoint::new(bar.timestamp, avg));
            }
        }
    }

    set
}
