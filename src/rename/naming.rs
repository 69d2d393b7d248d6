//! Fabricated timestamp names for the bulk renamer.

use chrono::{DateTime, Months, Utc};
use rand::Rng;

use crate::config::RenameConfig;
use crate::scanner::ScannedFile;

/// Half-open range of millisecond timestamps, `start_ms..end_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// Window between `oldest_months_ago` and `newest_months_ago` before `now`.
    /// Bounds given the wrong way round are swapped.
    pub fn from_config(config: &RenameConfig, now: DateTime<Utc>) -> Self {
        let newest = months_before(now, config.newest_months_ago);
        let oldest = months_before(now, config.oldest_months_ago);
        Self {
            start_ms: oldest.min(newest),
            end_ms: oldest.max(newest),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        if self.start_ms >= self.end_ms {
            return self.start_ms;
        }
        rng.random_range(self.start_ms..self.end_ms)
    }
}

fn months_before(now: DateTime<Utc>, months: u32) -> i64 {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .timestamp_millis()
}

/// `count` random timestamps from `window`, sorted and strictly increasing.
pub fn ordered_timestamps<R: Rng + ?Sized>(
    count: usize,
    window: &TimeWindow,
    rng: &mut R,
) -> Vec<i64> {
    let mut timestamps: Vec<i64> = (0..count).map(|_| window.sample(rng)).collect();
    timestamps.sort_unstable();

    // Equal draws would give two files the same name
    for i in 1..timestamps.len() {
        if timestamps[i] <= timestamps[i - 1] {
            timestamps[i] = timestamps[i - 1] + 1;
        }
    }
    timestamps
}

/// `<timestamp>` followed by the original extension, case preserved.
pub fn timestamp_file_name(old_name: &str, timestamp: i64) -> String {
    match old_name.rsplit_once('.') {
        Some((_, ext)) => format!("{}.{}", timestamp, ext),
        None => timestamp.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRename {
    pub old_name: String,
    pub new_name: String,
}

impl PlannedRename {
    pub fn is_noop(&self) -> bool {
        self.old_name == self.new_name
    }
}

/// Pairs the n-th scanned file with the n-th smallest timestamp, so scan
/// order and name order agree while the values themselves are random.
pub fn plan_renames<R: Rng + ?Sized>(
    scanned: &[ScannedFile],
    window: &TimeWindow,
    rng: &mut R,
) -> Vec<PlannedRename> {
    let timestamps = ordered_timestamps(scanned.len(), window, rng);
    scanned
        .iter()
        .zip(timestamps)
        .map(|(file, timestamp)| PlannedRename {
            old_name: file.file_name.clone(),
            new_name: timestamp_file_name(&file.file_name, timestamp),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_window_bounds() {
        let window = TimeWindow::from_config(&RenameConfig::default(), now());
        let year_ago = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let three_months_ago = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();

        assert_eq!(window.start_ms, year_ago.timestamp_millis());
        assert_eq!(window.end_ms, three_months_ago.timestamp_millis());
    }

    #[test]
    fn test_inverted_window_is_swapped() {
        let inverted = RenameConfig {
            newest_months_ago: 12,
            oldest_months_ago: 3,
        };
        assert_eq!(
            TimeWindow::from_config(&inverted, now()),
            TimeWindow::from_config(&RenameConfig::default(), now())
        );
    }

    #[test]
    fn test_samples_stay_in_window() {
        let window = TimeWindow::from_config(&RenameConfig::default(), now());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let t = window.sample(&mut rng);
            assert!(t >= window.start_ms && t < window.end_ms);
        }
    }

    #[test]
    fn test_empty_window_returns_start() {
        let window = TimeWindow {
            start_ms: 42,
            end_ms: 42,
        };
        assert_eq!(window.sample(&mut StdRng::seed_from_u64(1)), 42);
        assert_eq!(ordered_timestamps(3, &window, &mut StdRng::seed_from_u64(1)), vec![42, 43, 44]);
    }

    #[test]
    fn test_ordered_timestamps_strictly_increase() {
        let window = TimeWindow {
            start_ms: 0,
            end_ms: 5,
        };
        let timestamps = ordered_timestamps(50, &window, &mut StdRng::seed_from_u64(3));
        assert_eq!(timestamps.len(), 50);
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_timestamp_file_name_keeps_extension() {
        assert_eq!(timestamp_file_name("cat.PNG", 1700000000000), "1700000000000.PNG");
        assert_eq!(timestamp_file_name("a.b.webm", 5), "5.webm");
        assert_eq!(timestamp_file_name("plain", 5), "5");
    }
}
