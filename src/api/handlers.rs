use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::{movie_from_summary, Person};
use crate::error::{AppError, AppResult};
use crate::models::{Movie, Review, Room};
use crate::services::{MovieReview, NextBatch, DEFAULT_PAGE_SIZE};

use super::AppState;

const ROOM_CODE_LENGTH: usize = 6;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_PAGE_SIZE: usize = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub host: String,
    /// Client-chosen code; generated server-side when omitted
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    pub code: String,
    pub host: String,
    pub participants: Vec<String>,
    pub swipe_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub movie: Movie,
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub struct TitleSearchQuery {
    pub q: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PersonSearchQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub user: String,
    pub rating: f32,
    pub comment: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Create a room and seat the host as its first participant
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let host = request.host.trim();
    if host.is_empty() {
        return Err(AppError::InvalidInput("host must not be empty".to_string()));
    }

    let code = match request.code {
        Some(code) => validate_room_code(&code)?,
        None => generate_room_code(&mut rand::thread_rng()),
    };

    let room = Room {
        code,
        host: host.to_string(),
    };
    state.rooms.create(&room).await?;

    tracing::info!(room = %room.code, host = %room.host, "Room created");
    Ok((StatusCode::CREATED, Json(room)))
}

/// Room record, current participants, and total swipe count
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<RoomDetailResponse>> {
    let (detail, swipe_count) = state.matches.room_detail(&code).await?;

    Ok(Json(RoomDetailResponse {
        code: detail.room.code,
        host: detail.room.host,
        participants: detail.participants,
        swipe_count,
    }))
}

/// Add a participant to the room; joining twice is a no-op
pub async fn join_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> AppResult<StatusCode> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput(
            "username must not be empty".to_string(),
        ));
    }
    require_room(&state, &code).await?;

    state.rooms.add_participant(&code, username).await?;
    tracing::info!(room = %code, user = %username, "Participant joined");
    Ok(StatusCode::OK)
}

/// Remove a participant; their likes stop counting toward matches
pub async fn leave_room(
    State(state): State<AppState>,
    Path((code, user)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_room(&state, &code).await?;
    state.rooms.remove_participant(&code, &user).await?;

    tracing::info!(room = %code, user = %user, "Participant left");
    Ok(StatusCode::NO_CONTENT)
}

/// Every room the user currently participates in
pub async fn user_rooms(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(state.rooms.rooms_by_user(&user).await?))
}

/// The next page of swipe suggestions for one participant.
///
/// Returns 200 with a movie page, or 202 when a cache refresh for this
/// session is already running and the caller should retry shortly.
pub async fn next_batch(
    State(state): State<AppState>,
    Path((code, user)): Path<(String, String)>,
    Query(query): Query<BatchQuery>,
) -> AppResult<Response> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(AppError::InvalidInput(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    require_room(&state, &code).await?;

    match state.recommender.next_batch(&code, &user, page_size).await? {
        NextBatch::Page(movies) => Ok(Json(movies).into_response()),
        NextBatch::RefreshInFlight => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "refresh in progress" })),
        )
            .into_response()),
    }
}

/// Record a swipe vote; swiping the same movie again overwrites the vote
pub async fn swipe(
    State(state): State<AppState>,
    Path((code, user)): Path<(String, String)>,
    Json(request): Json<SwipeRequest>,
) -> AppResult<StatusCode> {
    if request.movie.id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "movie id must not be empty".to_string(),
        ));
    }
    require_room(&state, &code).await?;

    state
        .recommender
        .record_swipe(&code, &user, &request.movie, request.liked)
        .await?;
    Ok(StatusCode::OK)
}

/// Movies liked by every current participant of the room
pub async fn room_matches(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.matches.room_matches(&code).await?))
}

/// Everything one participant has liked in the room
pub async fn user_likes(
    State(state): State<AppState>,
    Path((code, user)): Path<(String, String)>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.matches.user_liked_movies(&code, &user).await?))
}

/// Title search against the catalog
pub async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<TitleSearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let page = query.page.unwrap_or(1);
    let results = state.catalog.search_movies(&query.q, page).await?;

    Ok(Json(results.iter().map(movie_from_summary).collect()))
}

/// Person search against the catalog
pub async fn search_people(
    State(state): State<AppState>,
    Query(query): Query<PersonSearchQuery>,
) -> AppResult<Json<Vec<Person>>> {
    Ok(Json(state.catalog.search_person(&query.name).await?))
}

/// Local reviews first, then the catalog's own reviews; a catalog outage
/// degrades to local-only
pub async fn movie_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<MovieReview>>> {
    Ok(Json(state.reviews.movie_reviews(&id).await?))
}

/// Store a review and confirm it in the response
pub async fn submit_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = Review {
        user: request.user,
        movie_id: id,
        rating: request.rating,
        comment: request.comment,
    };
    state.reviews.submit(&review).await?;

    Ok((StatusCode::CREATED, Json(review)))
}

async fn require_room(state: &AppState, code: &str) -> AppResult<()> {
    match state.rooms.by_code(code).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("room {} does not exist", code))),
    }
}

fn validate_room_code(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();
    let valid_length = (4..=12).contains(&code.len());
    if !valid_length || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidInput(
            "room code must be 4-12 alphanumeric characters".to_string(),
        ));
    }
    Ok(code)
}

fn generate_room_code(rng: &mut impl Rng) -> String {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_CHARSET[rng.gen_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_codes_use_the_charset() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code.bytes().all(|b| ROOM_CODE_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn test_room_code_validation() {
        assert_eq!(validate_room_code(" ab12cd ").unwrap(), "AB12CD");
        assert!(validate_room_code("abc").is_err());
        assert!(validate_room_code("AB-12CD").is_err());
        assert!(validate_room_code("ABCDEFGHIJKLM").is_err());
    }
}
