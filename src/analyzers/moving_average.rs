//! Trailing-window moving averages over daily buckets.
//!
//! For each platform the buckets form a sparse, date-ordered series. A
//! two-pointer window slides over it keeping running totals, so every window
//! size costs one linear pass regardless of how many posts each day holds.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::analyzers::aggregate::{DailyBuckets, DayBucket};
use crate::analyzers::types::MovingAverage;
use crate::analyzers::utility::round2;
use crate::model::Platform;

/// Moving averages for every platform and window, ordered by platform,
/// then window, then date.
pub fn moving_averages(buckets: &DailyBuckets, windows: &[u32]) -> Vec<MovingAverage> {
    let mut series: BTreeMap<Platform, Vec<(NaiveDate, &DayBucket)>> = BTreeMap::new();
    for (&(date, platform), bucket) in buckets {
        series.entry(platform).or_default().push((date, bucket));
    }

    let mut out = Vec::new();
    for (platform, days) in &series {
        for &window_days in windows {
            out.extend(window_series(*platform, days, window_days));
        }
    }
    out
}

/// Averages for one platform's date-ordered buckets over a `window_days`
/// trailing window, inclusive of the target date.
fn window_series(
    platform: Platform,
    days: &[(NaiveDate, &DayBucket)],
    window_days: u32,
) -> Vec<MovingAverage> {
    let span = u64::from(window_days.max(1) - 1);
    let mut out = Vec::with_capacity(days.len());

    let mut start = 0;
    let mut engagement: u128 = 0;
    let mut posts: u64 = 0;

    for &(date, bucket) in days {
        engagement += u128::from(bucket.engagement);
        posts += bucket.posts;

        let earliest = date.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
        while days[start].0 < earliest {
            engagement -= u128::from(days[start].1.engagement);
            posts -= days[start].1.posts;
            start += 1;
        }

        // Every bucket holds at least one post, so the window is never empty.
        out.push(MovingAverage {
            platform,
            date,
            window_days,
            average_engagement: round2(engagement as f64 / posts as f64),
            post_count: posts,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::bucket_by_day;
    use crate::model::Post;
    use crate::model::fixtures::post;

    fn series(posts: &[Post], window: u32) -> Vec<(String, f64, u64)> {
        let buckets = bucket_by_day(posts).unwrap();
        moving_averages(&buckets, &[window])
            .into_iter()
            .map(|m| (m.date.to_string(), m.average_engagement, m.post_count))
            .collect()
    }

    #[test]
    fn test_window_shrinks_at_series_start() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 10, 0, 0),
            post("2", Platform::Twitter, (2024, 1, 2), 20, 0, 0),
        ];
        assert_eq!(
            series(&posts, 7),
            vec![
                ("2024-01-01".into(), 10.0, 1),
                ("2024-01-02".into(), 15.0, 2),
            ]
        );
    }

    #[test]
    fn test_old_days_leave_the_window() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 10, 0, 0),
            post("2", Platform::Twitter, (2024, 1, 7), 20, 0, 0),
            post("3", Platform::Twitter, (2024, 1, 8), 30, 0, 0),
        ];
        // Jan 7 still sees Jan 1 (7 days inclusive); Jan 8 does not.
        assert_eq!(
            series(&posts, 7),
            vec![
                ("2024-01-01".into(), 10.0, 1),
                ("2024-01-07".into(), 15.0, 2),
                ("2024-01-08".into(), 25.0, 2),
            ]
        );
    }

    #[test]
    fn test_mean_is_per_post_not_per_day() {
        let posts = vec![
            post("1", Platform::Youtube, (2024, 1, 1), 10, 0, 0),
            post("2", Platform::Youtube, (2024, 1, 1), 20, 0, 0),
            post("3", Platform::Youtube, (2024, 1, 2), 60, 0, 0),
        ];
        let s = series(&posts, 30);
        assert_eq!(s[1], ("2024-01-02".into(), 30.0, 3));
    }

    #[test]
    fn test_sparse_dates_only() {
        let posts = vec![
            post("1", Platform::Facebook, (2024, 1, 1), 1, 0, 0),
            post("2", Platform::Facebook, (2024, 1, 20), 1, 0, 0),
        ];
        let s = series(&posts, 30);
        assert_eq!(s.len(), 2);
        assert!(s.iter().all(|(_, _, count)| *count > 0));
    }

    #[test]
    fn test_platforms_and_windows_are_separate() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 10, 0, 0),
            post("2", Platform::Youtube, (2024, 1, 1), 90, 0, 0),
        ];
        let buckets = bucket_by_day(&posts).unwrap();
        let all = moving_averages(&buckets, &[7, 30]);

        let keys: Vec<_> = all
            .iter()
            .map(|m| (m.platform, m.window_days, m.average_engagement))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Platform::Twitter, 7, 10.0),
                (Platform::Twitter, 30, 10.0),
                (Platform::Youtube, 7, 90.0),
                (Platform::Youtube, 30, 90.0),
            ]
        );
    }
}
