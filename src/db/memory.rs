use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    db::{MovieStore, PreferenceStore, ReviewStore, RoomStore},
    error::{AppError, AppResult},
    models::{Movie, Preference, Review, Room},
};

/// Process-local implementation of every store trait
///
/// Backs tests and local development; one instance plays the role of the
/// whole database so the match aggregate can see the participant relation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    movies: HashMap<String, Movie>,
    rooms: HashMap<String, Room>,
    /// room code -> members, in join order
    participants: HashMap<String, Vec<String>>,
    /// (room, participant, movie) -> liked; BTreeMap keeps iteration stable
    preferences: BTreeMap<(String, String, String), bool>,
    reviews: BTreeMap<(String, String), Review>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens after a panic in another test thread
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn upsert(&self, movie: &Movie) -> AppResult<()> {
        self.lock().movies.insert(movie.id.clone(), movie.clone());
        Ok(())
    }

    async fn by_id(&self, id: &str) -> AppResult<Option<Movie>> {
        Ok(self.lock().movies.get(id).cloned())
    }

    async fn by_ids(&self, ids: &[String]) -> AppResult<Vec<Movie>> {
        let inner = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.movies.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn upsert(&self, preference: &Preference) -> AppResult<()> {
        let key = (
            preference.room_code.clone(),
            preference.participant_name.clone(),
            preference.movie_id.clone(),
        );
        self.lock().preferences.insert(key, preference.liked);
        Ok(())
    }

    async fn by_room_and_user(&self, code: &str, username: &str) -> AppResult<Vec<Preference>> {
        let inner = self.lock();
        Ok(inner
            .preferences
            .iter()
            .filter(|((room, user, _), _)| room == code && user == username)
            .map(|((room, user, movie), liked)| Preference {
                room_code: room.clone(),
                participant_name: user.clone(),
                movie_id: movie.clone(),
                liked: *liked,
            })
            .collect())
    }

    async fn by_room(&self, code: &str) -> AppResult<Vec<Preference>> {
        let inner = self.lock();
        Ok(inner
            .preferences
            .iter()
            .filter(|((room, _, _), _)| room == code)
            .map(|((room, user, movie), liked)| Preference {
                room_code: room.clone(),
                participant_name: user.clone(),
                movie_id: movie.clone(),
                liked: *liked,
            })
            .collect())
    }

    async fn room_match_ids(&self, code: &str) -> AppResult<Vec<String>> {
        let inner = self.lock();
        let members = match inner.participants.get(code) {
            Some(m) if !m.is_empty() => m,
            _ => return Ok(Vec::new()),
        };

        let mut liked_by: HashMap<&str, Vec<&str>> = HashMap::new();
        for ((room, user, movie), liked) in &inner.preferences {
            if room == code && *liked && members.contains(user) {
                let voters = liked_by.entry(movie.as_str()).or_default();
                if !voters.contains(&user.as_str()) {
                    voters.push(user.as_str());
                }
            }
        }

        let mut ids: Vec<String> = liked_by
            .into_iter()
            .filter(|(_, voters)| voters.len() == members.len())
            .map(|(movie, _)| movie.to_string())
            .collect();
        ids.sort();

        Ok(ids)
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create(&self, room: &Room) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.rooms.contains_key(&room.code) {
            return Err(AppError::InvalidInput(format!(
                "Room {} already exists",
                room.code
            )));
        }
        inner.rooms.insert(room.code.clone(), room.clone());
        inner
            .participants
            .insert(room.code.clone(), vec![room.host.clone()]);
        Ok(())
    }

    async fn by_code(&self, code: &str) -> AppResult<Option<Room>> {
        Ok(self.lock().rooms.get(code).cloned())
    }

    async fn add_participant(&self, code: &str, username: &str) -> AppResult<()> {
        let mut inner = self.lock();
        if !inner.rooms.contains_key(code) {
            return Err(AppError::NotFound(format!("Room {} does not exist", code)));
        }
        let members = inner.participants.entry(code.to_string()).or_default();
        if !members.iter().any(|m| m == username) {
            members.push(username.to_string());
        }
        Ok(())
    }

    async fn remove_participant(&self, code: &str, username: &str) -> AppResult<()> {
        let mut inner = self.lock();
        if let Some(members) = inner.participants.get_mut(code) {
            members.retain(|m| m != username);
        }
        Ok(())
    }

    async fn participants(&self, code: &str) -> AppResult<Vec<String>> {
        Ok(self
            .lock()
            .participants
            .get(code)
            .cloned()
            .unwrap_or_default())
    }

    async fn rooms_by_user(&self, username: &str) -> AppResult<Vec<Room>> {
        let inner = self.lock();
        let mut rooms: Vec<Room> = inner
            .participants
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m == username))
            .filter_map(|(code, _)| inner.rooms.get(code).cloned())
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rooms)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn upsert(&self, review: &Review) -> AppResult<()> {
        let key = (review.user.clone(), review.movie_id.clone());
        self.lock().reviews.insert(key, review.clone());
        Ok(())
    }

    async fn by_movie(&self, movie_id: &str) -> AppResult<Vec<Review>> {
        let inner = self.lock();
        Ok(inner
            .reviews
            .values()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn by_user(&self, username: &str) -> AppResult<Vec<Review>> {
        let inner = self.lock();
        Ok(inner
            .reviews
            .values()
            .filter(|r| r.user == username)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pref(room: &str, user: &str, movie: &str, liked: bool) -> Preference {
        Preference {
            room_code: room.to_string(),
            participant_name: user.to_string(),
            movie_id: movie.to_string(),
            liked,
        }
    }

    async fn room_with_members(store: &MemoryStore, code: &str, members: &[&str]) {
        RoomStore::create(
            store,
            &Room {
                code: code.to_string(),
                host: members[0].to_string(),
            },
        )
        .await
        .unwrap();
        for member in &members[1..] {
            store.add_participant(code, member).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_swipe_idempotence_last_write_wins() {
        let store = MemoryStore::new();
        room_with_members(&store, "R1", &["alice"]).await;

        PreferenceStore::upsert(&store, &pref("R1", "alice", "42", true))
            .await
            .unwrap();
        PreferenceStore::upsert(&store, &pref("R1", "alice", "42", false))
            .await
            .unwrap();

        let prefs = store.by_room_and_user("R1", "alice").await.unwrap();
        assert_eq!(prefs.len(), 1);
        assert!(!prefs[0].liked);
    }

    #[tokio::test]
    async fn test_room_match_requires_every_participant() {
        let store = MemoryStore::new();
        room_with_members(&store, "R1", &["alice", "bob", "carol"]).await;

        // Liked by 2 of 3: not a match
        PreferenceStore::upsert(&store, &pref("R1", "alice", "42", true))
            .await
            .unwrap();
        PreferenceStore::upsert(&store, &pref("R1", "bob", "42", true))
            .await
            .unwrap();
        assert!(store.room_match_ids("R1").await.unwrap().is_empty());

        // Liked by all 3: a match, exactly once
        PreferenceStore::upsert(&store, &pref("R1", "carol", "42", true))
            .await
            .unwrap();
        assert_eq!(store.room_match_ids("R1").await.unwrap(), vec!["42"]);
    }

    #[tokio::test]
    async fn test_room_match_ignores_departed_participants() {
        let store = MemoryStore::new();
        room_with_members(&store, "R1", &["alice", "bob", "carol"]).await;

        PreferenceStore::upsert(&store, &pref("R1", "alice", "42", true))
            .await
            .unwrap();
        PreferenceStore::upsert(&store, &pref("R1", "bob", "42", true))
            .await
            .unwrap();
        assert!(store.room_match_ids("R1").await.unwrap().is_empty());

        // carol never voted; once she leaves, the remaining members agree
        store.remove_participant("R1", "carol").await.unwrap();
        assert_eq!(store.room_match_ids("R1").await.unwrap(), vec!["42"]);
    }

    #[tokio::test]
    async fn test_dislikes_do_not_count_toward_matches() {
        let store = MemoryStore::new();
        room_with_members(&store, "R1", &["alice", "bob"]).await;

        PreferenceStore::upsert(&store, &pref("R1", "alice", "42", true))
            .await
            .unwrap();
        PreferenceStore::upsert(&store, &pref("R1", "bob", "42", false))
            .await
            .unwrap();

        assert!(store.room_match_ids("R1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movie_batch_lookup_skips_unknown_ids() {
        let store = MemoryStore::new();
        let movie = Movie {
            id: "1".to_string(),
            title: "Known".to_string(),
            year: "2000".to_string(),
            runtime: None,
            genre: None,
            director: None,
            actors: None,
            plot: None,
            poster: String::new(),
            rating: None,
        };
        MovieStore::upsert(&store, &movie).await.unwrap();

        let found = store
            .by_ids(&["1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
    }

    #[tokio::test]
    async fn test_duplicate_room_rejected() {
        let store = MemoryStore::new();
        room_with_members(&store, "R1", &["alice"]).await;

        let result = RoomStore::create(
            &store,
            &Room {
                code: "R1".to_string(),
                host: "bob".to_string(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
