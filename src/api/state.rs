use std::sync::Arc;
use std::time::Duration;

use crate::{
    catalog::CatalogClient,
    db::{MovieStore, PreferenceStore, ReviewStore, RoomStore},
    services::{GenreIndex, MatchService, Recommender, ReviewService},
};

/// Shared application state, cheap to clone into every handler
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub matches: Arc<MatchService>,
    pub reviews: Arc<ReviewService>,
    pub rooms: Arc<dyn RoomStore>,
    pub catalog: Arc<dyn CatalogClient>,
}

impl AppState {
    /// Wires the services on top of the given stores and catalog client
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        movies: Arc<dyn MovieStore>,
        prefs: Arc<dyn PreferenceStore>,
        rooms: Arc<dyn RoomStore>,
        reviews: Arc<dyn ReviewStore>,
        batch_validity: Duration,
        max_sessions: usize,
    ) -> Self {
        let genres = Arc::new(GenreIndex::new(catalog.clone()));
        let recommender = Arc::new(Recommender::new(
            catalog.clone(),
            genres,
            movies.clone(),
            prefs.clone(),
            batch_validity,
            max_sessions,
        ));
        let matches = Arc::new(MatchService::new(movies, prefs, rooms.clone()));
        let reviews = Arc::new(ReviewService::new(reviews, catalog.clone()));

        Self {
            recommender,
            matches,
            reviews,
            rooms,
            catalog,
        }
    }
}
