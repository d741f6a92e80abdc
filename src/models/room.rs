use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A short-lived group session identified by a code, with a host and a
/// growable participant set (stored separately).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub code: String,
    pub host: String,
}

/// A room together with its current participants
#[derive(Debug, Clone, Serialize)]
pub struct RoomWithParticipants {
    pub room: Room,
    pub participants: Vec<String>,
}
