use std::sync::Arc;

use crate::{
    db::{MovieStore, PreferenceStore, RoomStore},
    error::{AppError, AppResult},
    models::{Movie, RoomWithParticipants},
};

/// Read-side aggregation over swipe votes: which movies has every current
/// participant of a room liked, and what has a single user liked.
///
/// Matches are always computed from the store on demand. A cached result
/// would go stale the moment any participant swipes or leaves.
pub struct MatchService {
    movies: Arc<dyn MovieStore>,
    prefs: Arc<dyn PreferenceStore>,
    rooms: Arc<dyn RoomStore>,
}

impl MatchService {
    pub fn new(
        movies: Arc<dyn MovieStore>,
        prefs: Arc<dyn PreferenceStore>,
        rooms: Arc<dyn RoomStore>,
    ) -> Self {
        Self {
            movies,
            prefs,
            rooms,
        }
    }

    /// Movies liked by every current participant of the room. Likes from
    /// users who have since left do not count toward (or against) a match.
    pub async fn room_matches(&self, code: &str) -> AppResult<Vec<Movie>> {
        self.require_room(code).await?;

        let ids = self.prefs.room_match_ids(code).await?;
        let matches = self.movies.by_ids(&ids).await?;

        tracing::debug!(room = %code, matches = matches.len(), "Computed room matches");
        Ok(matches)
    }

    /// Everything one user has swiped right on in the room
    pub async fn user_liked_movies(&self, code: &str, username: &str) -> AppResult<Vec<Movie>> {
        self.require_room(code).await?;

        let liked_ids: Vec<String> = self
            .prefs
            .by_room_and_user(code, username)
            .await?
            .into_iter()
            .filter(|p| p.liked)
            .map(|p| p.movie_id)
            .collect();

        self.movies.by_ids(&liked_ids).await
    }

    /// Room record, current participants, and total swipe count
    pub async fn room_detail(&self, code: &str) -> AppResult<(RoomWithParticipants, usize)> {
        let room = self
            .rooms
            .by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room {} does not exist", code)))?;
        let participants = self.rooms.participants(code).await?;
        let swipe_count = self.prefs.by_room(code).await?.len();

        Ok((RoomWithParticipants { room, participants }, swipe_count))
    }

    async fn require_room(&self, code: &str) -> AppResult<()> {
        match self.rooms.by_code(code).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("room {} does not exist", code))),
        }
    }
}
