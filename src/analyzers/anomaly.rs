use std::cmp::Ordering;

use crate::analyzers::types::{Anomaly, AnomalyReport};
use crate::analyzers::utility::{mean, round2, stddev};
use crate::model::{Platform, Post};

/// Flags posts whose engagement lies more than `threshold` population
/// standard deviations from the mean of `posts`.
///
/// Fewer than two posts, or zero variance, yields no anomalies. Flagged
/// posts are ordered by distance from the mean, furthest first.
pub fn detect_anomalies<'a, I>(posts: I, threshold: f64, platform: Option<Platform>) -> AnomalyReport
where
    I: IntoIterator<Item = &'a Post>,
{
    let posts: Vec<&Post> = posts.into_iter().collect();
    let raw: Vec<u64> = posts.iter().map(|p| p.engagement_score()).collect();
    let scores: Vec<f64> = raw.iter().map(|&s| s as f64).collect();

    // Decided on the exact integers; f64 sums drift above 2^53.
    let uniform = raw.iter().min() == raw.iter().max();
    let (avg, sd) = match raw.first() {
        Some(&first) if uniform => (first as f64, 0.0),
        _ => {
            let avg = mean(&scores);
            (avg, stddev(&scores, avg))
        }
    };

    let mut anomalies = Vec::new();
    if scores.len() >= 2 && sd > 0.0 {
        for (post, score) in posts.iter().zip(&scores) {
            let z = (score - avg) / sd;
            if z.abs() > threshold {
                anomalies.push(Anomaly {
                    post_id: post.post_id.clone(),
                    platform: post.platform,
                    engagement_score: post.engagement_score(),
                    z_score: z,
                });
            }
        }
    }

    anomalies.sort_by(|a, b| {
        b.z_score
            .abs()
            .partial_cmp(&a.z_score.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.platform.cmp(&b.platform))
            .then_with(|| a.post_id.cmp(&b.post_id))
    });
    for anomaly in &mut anomalies {
        anomaly.z_score = round2(anomaly.z_score);
    }

    AnomalyReport {
        platform,
        sample_size: scores.len(),
        mean: round2(avg),
        std_dev: round2(sd),
        threshold,
        anomalies,
    }
}
