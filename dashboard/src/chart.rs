//! Typed chart options and the plain-data view handed to a renderer.
//!
//! Nothing here draws anything. [`ChartOptions::build_view`] assembles the
//! series a stock chart needs (price, volume, event flags, one line per
//! moving-average window) from a [`TickerRecord`], using millisecond epoch
//! timestamps so the output can be serialized straight to a charting
//! library.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_utils::numeric::round3;
use thiserror::Error;
use ticker_data::{Bar, EventMarker, MovingAveragePeriods, SeriesPoint, TickerRecord};

/// Id of the price series; event flags are pinned onto it.
pub const PRICE_SERIES_ID: &str = "ohlcseries";
pub const VOLUME_SERIES_NAME: &str = "Vol";
pub const EVENTS_SERIES_NAME: &str = "Events";
/// Axis and tooltip date format.
pub const DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("at least one range button is required")]
    NoRanges,

    #[error("selected range {selected} is out of bounds ({available} available)")]
    RangeOutOfBounds { selected: usize, available: usize },

    #[error("unknown chart type '{0}' (expected 'ohlc' or 'candlestick')")]
    UnknownChartType(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Ohlc,
    Candlestick,
}

impl ChartType {
    pub fn label(self) -> &'static str {
        match self {
            ChartType::Ohlc => "OHLC",
            ChartType::Candlestick => "Candlestick",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ChartType::Ohlc => "ohlc",
            ChartType::Candlestick => "candlestick",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ohlc" => Ok(ChartType::Ohlc),
            "candlestick" => Ok(ChartType::Candlestick),
            _ => Err(ChartError::UnknownChartType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    Week,
    Month,
    Ytd,
    Year,
    All,
}

/// One zoom preset of the range selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeButton {
    pub unit: RangeUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    pub text: String,
}

impl RangeButton {
    pub fn new(unit: RangeUnit, count: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            unit,
            count,
            text: text.into(),
        }
    }
}

/// 1w, 1m, 3m, 6m, YTD, 1y, All.
pub fn default_range_buttons() -> Vec<RangeButton> {
    vec![
        RangeButton::new(RangeUnit::Week, Some(1), "1w"),
        RangeButton::new(RangeUnit::Month, Some(1), "1m"),
        RangeButton::new(RangeUnit::Month, Some(3), "3m"),
        RangeButton::new(RangeUnit::Month, Some(6), "6m"),
        RangeButton::new(RangeUnit::Ytd, None, "YTD"),
        RangeButton::new(RangeUnit::Year, Some(1), "1y"),
        RangeButton::new(RangeUnit::All, None, "All"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    chart_type: ChartType,
    ranges: Vec<RangeButton>,
    selected_range: usize,
    periods: MovingAveragePeriods,
}

impl ChartOptions {
    pub fn new(
        chart_type: ChartType,
        ranges: Vec<RangeButton>,
        selected_range: usize,
        periods: MovingAveragePeriods,
    ) -> Result<Self, ChartError> {
        check_range(&ranges, selected_range)?;
        Ok(Self {
            chart_type,
            ranges,
            selected_range,
            periods,
        })
    }

    /// OHLC, default buttons, first range selected.
    pub fn with_periods(periods: MovingAveragePeriods) -> Self {
        Self {
            chart_type: ChartType::default(),
            ranges: default_range_buttons(),
            selected_range: 0,
            periods,
        }
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
    }

    pub fn ranges(&self) -> &[RangeButton] {
        &self.ranges
    }

    pub fn selected_range(&self) -> usize {
        self.selected_range
    }

    pub fn select_range(&mut self, index: usize) -> Result<(), ChartError> {
        check_range(&self.ranges, index)?;
        self.selected_range = index;
        Ok(())
    }

    pub fn periods(&self) -> &MovingAveragePeriods {
        &self.periods
    }

    /// Assembles the series for `symbol` from `record` and `events`.
    ///
    /// Windows missing from the record produce an empty series rather than
    /// being skipped, so the legend stays stable across symbols.
    pub fn build_view(&self, symbol: &str, record: &TickerRecord, events: &[EventMarker]) -> ChartView {
        let moving_averages = self
            .periods
            .iter()
            .map(|p| LineSeries {
                name: format!("{p}d MA"),
                data: record.moving.get(p).map(points).unwrap_or_default(),
            })
            .collect();

        ChartView {
            title: record.series.name.clone(),
            y_axis_title: self.chart_type.label().to_string(),
            loading: record.is_placeholder(),
            selected_range: self.selected_range,
            ranges: self.ranges.clone(),
            price: PriceSeries {
                id: PRICE_SERIES_ID.to_string(),
                name: symbol.to_string(),
                series_type: self.chart_type,
                data: record.series.bars.iter().map(OhlcPoint::from).collect(),
            },
            volume: LineSeries {
                name: VOLUME_SERIES_NAME.to_string(),
                data: points(&record.volume),
            },
            events: FlagSeries {
                name: EVENTS_SERIES_NAME.to_string(),
                on_series: PRICE_SERIES_ID.to_string(),
                data: events.to_vec(),
            },
            moving_averages,
        }
    }
}

fn check_range(ranges: &[RangeButton], selected: usize) -> Result<(), ChartError> {
    if ranges.is_empty() {
        return Err(ChartError::NoRanges);
    }
    if selected >= ranges.len() {
        return Err(ChartError::RangeOutOfBounds {
            selected,
            available: ranges.len(),
        });
    }
    Ok(())
}

fn points(series: &[SeriesPoint]) -> Vec<(i64, f64)> {
    series
        .iter()
        .map(|p| (p.timestamp.timestamp_millis(), p.value))
        .collect()
}

/// `[t, open, high, low, close]`, the array layout OHLC charts take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OhlcPoint(pub i64, pub f64, pub f64, pub f64, pub f64);

impl From<&Bar> for OhlcPoint {
    fn from(b: &Bar) -> Self {
        OhlcPoint(b.timestamp.timestamp_millis(), b.open, b.high, b.low, b.close)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub series_type: ChartType,
    pub data: Vec<OhlcPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub data: Vec<(i64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSeries {
    pub name: String,
    pub on_series: String,
    pub data: Vec<EventMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub title: String,
    pub y_axis_title: String,
    /// Set while the record is still the placeholder.
    pub loading: bool,
    pub selected_range: usize,
    pub ranges: Vec<RangeButton>,
    pub price: PriceSeries,
    pub volume: LineSeries,
    pub events: FlagSeries,
    pub moving_averages: Vec<LineSeries>,
}

/// Midpoint shown between high and low in the price tooltip.
pub fn tooltip_mid(high: f64, low: f64) -> f64 {
    round3((high + low) / 2.0)
}

/// Multi-line price tooltip for one bar of `series_name`.
pub fn price_tooltip(series_name: &str, bar: &Bar) -> String {
    format!(
        "{series_name} ({})\nOpen: {}\nHigh: {}\nMid: {}\nLow: {}\nClose: {}",
        bar.timestamp.format(DATE_FORMAT),
        bar.open,
        bar.high,
        tooltip_mid(bar.high, bar.low),
        bar.low,
        bar.close,
    )
}

/// Header "last updated" text; empty until an end date is known.
pub fn last_updated_label(end_date: Option<DateTime<Utc>>) -> String {
    end_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ticker_data::BarSeries;

    fn sample_record() -> TickerRecord {
        let t0 = Utc.with_ymd_and_hms(2018, 3, 23, 0, 0, 0).unwrap();
        let bars = vec![
            Bar { timestamp: t0, open: 10.0, high: 12.0, low: 8.0, close: 10.0, volume: 100.0 },
            Bar { timestamp: t0 + chrono::Duration::days(3), open: 11.0, high: 13.0, low: 9.0, close: 11.0, volume: 200.0 },
            Bar { timestamp: t0 + chrono::Duration::days(4), open: 12.0, high: 14.0, low: 10.0, close: 12.0, volume: 150.0 },
        ];
        TickerRecord::from_series(
            BarSeries::new("AAPL", "Apple Inc. Prices", bars),
            &MovingAveragePeriods::new([2]).unwrap(),
        )
    }

    #[test]
    fn options_validate_range_selection() {
        let periods = MovingAveragePeriods::default();
        assert_eq!(
            ChartOptions::new(ChartType::Ohlc, vec![], 0, periods.clone()),
            Err(ChartError::NoRanges)
        );
        assert_eq!(
            ChartOptions::new(ChartType::Ohlc, default_range_buttons(), 7, periods.clone()),
            Err(ChartError::RangeOutOfBounds { selected: 7, available: 7 })
        );
        let mut opts = ChartOptions::new(ChartType::Candlestick, default_range_buttons(), 6, periods).unwrap();
        assert!(opts.select_range(9).is_err());
        assert_eq!(opts.selected_range(), 6);
    }

    #[test]
    fn view_names_series_after_symbol_and_windows() {
        let opts = ChartOptions::with_periods(MovingAveragePeriods::new([2, 10]).unwrap());
        let rec = sample_record();
        let markers = [EventMarker::new(rec.last_timestamp().unwrap(), 1)];
        let view = opts.build_view("AAPL", &rec, &markers);

        assert_eq!(view.title, "Apple Inc. Prices");
        assert_eq!(view.y_axis_title, "OHLC");
        assert!(!view.loading);
        assert_eq!(view.price.name, "AAPL");
        assert_eq!(view.price.data.len(), 3);
        assert_eq!(view.volume.name, "Vol");
        assert_eq!(view.volume.data[1].1, 200.0);
        assert_eq!(view.events.on_series, PRICE_SERIES_ID);
        assert_eq!(view.events.data.len(), 1);

        let names: Vec<_> = view.moving_averages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["2d MA", "10d MA"]);
        let ma2: Vec<f64> = view.moving_averages[0].data.iter().map(|p| p.1).collect();
        assert_eq!(ma2, [10.5, 11.5]);
        // the record was built without a 10-day window
        assert!(view.moving_averages[1].data.is_empty());
    }

    #[test]
    fn placeholder_view_is_loading() {
        let periods = MovingAveragePeriods::default();
        let opts = ChartOptions::with_periods(periods.clone());
        let view = opts.build_view("GE", &TickerRecord::placeholder("GE", &periods), &[]);
        assert!(view.loading);
        assert_eq!(view.title, "Loading...");
    }

    #[test]
    fn view_serializes_in_chart_layout() {
        let mut opts = ChartOptions::with_periods(MovingAveragePeriods::new([2]).unwrap());
        opts.set_chart_type(ChartType::Candlestick);
        let json = serde_json::to_value(opts.build_view("AAPL", &sample_record(), &[])).unwrap();
        assert_eq!(json["price"]["type"], "candlestick");
        assert_eq!(json["price"]["data"][0][0], 1_521_763_200_000i64);
        assert_eq!(json["events"]["onSeries"], "ohlcseries");
        assert_eq!(json["yAxisTitle"], "Candlestick");
    }

    #[test]
    fn tooltip_and_labels() {
        assert_eq!(tooltip_mid(13.0, 9.5), 11.25);
        assert_eq!(tooltip_mid(1.0005, 1.0), 1.0);
        assert_eq!(last_updated_label(None), "");
        let d = Utc.with_ymd_and_hms(2018, 3, 27, 0, 0, 0).unwrap();
        assert_eq!(last_updated_label(Some(d)), "03/27/18");

        let bar = sample_record().series.bars[0];
        let text = price_tooltip("AAPL", &bar);
        assert!(text.starts_with("AAPL (03/23/18)"));
        assert!(text.contains("Mid: 10"));
    }

    #[test]
    fn chart_type_parsing() {
        assert_eq!("Candlestick".parse::<ChartType>(), Ok(ChartType::Candlestick));
        assert_eq!(ChartType::Ohlc.to_string(), "OHLC");
        assert!("line".parse::<ChartType>().is_err());
    }
}
