use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use shared_utils::numeric::round3;
use ticker_data::{
    Bar, MovingAveragePeriods,
    processor::compute_moving_averages,
};

fn bars_from_closes(closes: &[u32]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2017, 6, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let close = f64::from(*c);
            Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn window_length_and_values_match_naive_mean(
        closes in proptest::collection::vec(0u32..10_000, 0..120),
        windows in proptest::collection::vec(1u32..40, 1..5),
    ) {
        let bars = bars_from_closes(&closes);
        let periods = MovingAveragePeriods::new(windows).unwrap();
        let set = compute_moving_averages(&bars, &periods);

        for p in periods.iter() {
            let points = set.get(p).unwrap();
            let p = p as usize;
            if bars.len() < p {
                prop_assert!(points.is_empty());
                continue;
            }
            prop_assert_eq!(points.len(), bars.len() - p + 1);
            for (i, point) in points.iter().enumerate() {
                let window = &bars[i..i + p];
                let mean = window.iter().map(|b| b.close).sum::<f64>() / p as f64;
                prop_assert_eq!(point.timestamp, bars[i + p - 1].timestamp);
                prop_assert_eq!(point.value, round3(mean));
            }
        }
    }
}
