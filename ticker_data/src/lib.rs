//! Daily market data for the dashboard: the bar model, the feed boundary, and
//! the series pipeline (parsing, moving averages, synthetic extension, event
//! markers).

pub mod errors;
pub mod events;
pub mod models;
pub mod processor;
pub mod providers;
pub mod synthetic;

pub use errors::{LoadError, MalformedRecordError};
pub use models::{
    bar::{Bar, BarSeries},
    event::EventMarker,
    moving_average::{MovingAveragePeriods, MovingAverageSet, SeriesPoint},
    record::TickerRecord,
};
