use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Rooms and membership
        .route("/rooms", post(handlers::create_room))
        .route("/rooms/:code", get(handlers::get_room))
        .route("/rooms/:code/join", post(handlers::join_room))
        .route("/rooms/:code/users/:user", delete(handlers::leave_room))
        .route("/users/:user/rooms", get(handlers::user_rooms))
        // Swiping
        .route("/rooms/:code/users/:user/batch", get(handlers::next_batch))
        .route("/rooms/:code/users/:user/swipe", post(handlers::swipe))
        .route("/rooms/:code/matches", get(handlers::room_matches))
        .route("/rooms/:code/users/:user/likes", get(handlers::user_likes))
        // Catalog search and reviews
        .route("/movies/search", get(handlers::search_movies))
        .route(
            "/movies/:id/reviews",
            get(handlers::movie_reviews).post(handlers::submit_review),
        )
        .route("/people/search", get(handlers::search_people))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
