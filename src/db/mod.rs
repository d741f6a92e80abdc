/// Durable stores consumed by the engine
///
/// Each store is a repository-style trait with a Postgres implementation;
/// `MemoryStore` implements all of them in one process-local struct for
/// tests and local development.
use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Movie, Preference, Review, Room},
};

pub mod memory;
pub mod movies;
pub mod postgres;
pub mod preferences;
pub mod reviews;
pub mod rooms;

pub use memory::MemoryStore;
pub use movies::PgMovieStore;
pub use postgres::create_pool;
pub use preferences::PgPreferenceStore;
pub use reviews::PgReviewStore;
pub use rooms::PgRoomStore;

/// Durable cache of movie detail records keyed by catalog id
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Inserts or overwrites the record with the same id
    async fn upsert(&self, movie: &Movie) -> AppResult<()>;

    async fn by_id(&self, id: &str) -> AppResult<Option<Movie>>;

    /// Batch lookup; unknown ids are silently absent from the result
    async fn by_ids(&self, ids: &[String]) -> AppResult<Vec<Movie>>;
}

/// Durable record of swipe votes
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Upsert by the composite (room, participant, movie) key;
    /// last write wins
    async fn upsert(&self, preference: &Preference) -> AppResult<()>;

    async fn by_room_and_user(&self, code: &str, username: &str) -> AppResult<Vec<Preference>>;

    async fn by_room(&self, code: &str) -> AppResult<Vec<Preference>>;

    /// Ids of movies liked by every current participant of the room
    async fn room_match_ids(&self, code: &str) -> AppResult<Vec<String>>;
}

/// Rooms and their participant relation
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Creates the room and seeds the host as its first participant
    async fn create(&self, room: &Room) -> AppResult<()>;

    async fn by_code(&self, code: &str) -> AppResult<Option<Room>>;

    async fn add_participant(&self, code: &str, username: &str) -> AppResult<()>;

    async fn remove_participant(&self, code: &str, username: &str) -> AppResult<()>;

    async fn participants(&self, code: &str) -> AppResult<Vec<String>>;

    async fn rooms_by_user(&self, username: &str) -> AppResult<Vec<Room>>;
}

/// Locally stored movie reviews
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Upsert by (user, movie) key
    async fn upsert(&self, review: &Review) -> AppResult<()>;

    async fn by_movie(&self, movie_id: &str) -> AppResult<Vec<Review>>;

    async fn by_user(&self, username: &str) -> AppResult<Vec<Review>>;
}
