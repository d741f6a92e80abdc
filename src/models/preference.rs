use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single swipe: one participant's like/dislike vote on one movie within
/// one room.
///
/// Identity is the composite (room_code, participant_name, movie_id); a later
/// insert with the same identity replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Preference {
    pub room_code: String,
    pub participant_name: String,
    pub movie_id: String,
    pub liked: bool,
}
