/// Engagement score: the sum of likes, comments and shares.
///
/// Saturates instead of wrapping on absurd counter values.
pub fn score(likes: u64, comments: u64, shares: u64) -> u64 {
    likes.saturating_add(comments).saturating_add(shares)
}
