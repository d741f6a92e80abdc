use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's written review of a movie, stored locally.
///
/// Keyed by (user, movie_id); resubmitting replaces the earlier review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    #[sqlx(rename = "reviewer")]
    pub user: String,
    pub movie_id: String,
    /// 0.0 to 5.0
    pub rating: f32,
    pub comment: String,
}
