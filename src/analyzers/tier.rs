use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementTier {
    Low,
    Medium,
    High,
}

/// Buckets an engagement score into a tier.
///
/// | Score    | Tier   |
/// |----------|--------|
/// | >= 100   | high   |
/// | >= 10    | medium |
/// | < 10     | low    |
pub fn tier(score: u64) -> EngagementTier {
    match score {
        s if s >= 100 => EngagementTier::High,
        s if s >= 10 => EngagementTier::Medium,
        _ => EngagementTier::Low,
    }
}
