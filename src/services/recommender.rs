use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::{
    catalog::CatalogClient,
    db::{MovieStore, PreferenceStore},
    error::AppResult,
    models::{Movie, Preference},
    services::{
        aggregator::CandidateAggregator,
        genre_index::GenreIndex,
        scoring::score,
        session::{Session, SessionKey, SessionManager},
    },
};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Outcome of a batch request
#[derive(Debug, PartialEq)]
pub enum NextBatch {
    Page(Vec<Movie>),
    /// Another refresh for this session is already running; try again
    /// shortly. Not an error.
    RefreshInFlight,
}

/// The batching engine: serves fixed-size pages of scored candidates out of
/// a per-session cache, refreshing the cache from the candidate aggregator
/// when it runs dry or goes stale.
pub struct Recommender {
    aggregator: CandidateAggregator,
    movies: Arc<dyn MovieStore>,
    prefs: Arc<dyn PreferenceStore>,
    sessions: SessionManager,
    rng: Arc<Mutex<StdRng>>,
    validity: Duration,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        genres: Arc<GenreIndex>,
        movies: Arc<dyn MovieStore>,
        prefs: Arc<dyn PreferenceStore>,
        validity: Duration,
        max_sessions: usize,
    ) -> Self {
        Self::with_rng(
            catalog,
            genres,
            movies,
            prefs,
            validity,
            max_sessions,
            StdRng::from_entropy(),
        )
    }

    /// Like [`Recommender::new`] but with a caller-supplied random source,
    /// so tests can pin strategy parameters and shuffles
    #[allow(clippy::too_many_arguments)]
    pub fn with_rng(
        catalog: Arc<dyn CatalogClient>,
        genres: Arc<GenreIndex>,
        movies: Arc<dyn MovieStore>,
        prefs: Arc<dyn PreferenceStore>,
        validity: Duration,
        max_sessions: usize,
        rng: StdRng,
    ) -> Self {
        let rng = Arc::new(Mutex::new(rng));
        Self {
            aggregator: CandidateAggregator::new(catalog, genres, rng.clone()),
            movies,
            prefs,
            sessions: SessionManager::new(max_sessions),
            rng,
            validity,
        }
    }

    /// Serves the next page of suggestions for the session.
    ///
    /// Cached pages are sliced without touching the network; a fresh cache
    /// with a short remainder is drained in one call; anything else forces a
    /// full refresh. A refresh already in flight yields
    /// [`NextBatch::RefreshInFlight`] instead of queueing.
    pub async fn next_batch(
        &self,
        room: &str,
        user: &str,
        page_size: usize,
    ) -> AppResult<NextBatch> {
        let key = SessionKey::new(room, user);
        let session = self.sessions.get_or_create(&key);

        {
            let mut state = session.lock().await;

            if state.refreshing {
                tracing::debug!(room = %room, user = %user, "Batch refresh already in flight");
                return Ok(NextBatch::RefreshInFlight);
            }

            // Full page available straight from the cache
            if state.list.len() >= state.cursor + page_size {
                let page = state.list[state.cursor..state.cursor + page_size].to_vec();
                state.cursor += page_size;
                return Ok(NextBatch::Page(page));
            }

            // Fresh cache with a short remainder: drain it in one call
            let fresh = state
                .refreshed_at
                .map(|at| at.elapsed() < self.validity)
                .unwrap_or(false);
            if fresh && state.cursor < state.list.len() {
                let remainder = state.list[state.cursor..].to_vec();
                state.cursor = state.list.len();
                return Ok(NextBatch::Page(remainder));
            }

            state.refreshing = true;
        }

        let outcome = self.refresh(room, user, &session, page_size).await;
        session.lock().await.refreshing = false;

        outcome.map(NextBatch::Page)
    }

    /// Records a swipe: caches the movie, upserts the vote, and invalidates
    /// the session's preference snapshot on a like so the next refresh sees
    /// the updated taste profile
    pub async fn record_swipe(
        &self,
        room: &str,
        user: &str,
        movie: &Movie,
        liked: bool,
    ) -> AppResult<()> {
        self.movies.upsert(movie).await?;
        self.prefs
            .upsert(&Preference {
                room_code: room.to_string(),
                participant_name: user.to_string(),
                movie_id: movie.id.clone(),
                liked,
            })
            .await?;

        if liked {
            if let Some(session) = self.sessions.peek(&SessionKey::new(room, user)) {
                session.lock().await.cached_prefs = None;
            }
        }

        tracing::debug!(room = %room, user = %user, movie = %movie.id, liked, "Swipe recorded");
        Ok(())
    }

    /// Rebuilds the session cache from scratch and serves the first page.
    /// On error the previous cache state is left untouched.
    async fn refresh(
        &self,
        room: &str,
        user: &str,
        session: &Arc<AsyncMutex<Session>>,
        page_size: usize,
    ) -> AppResult<Vec<Movie>> {
        let cached_prefs = session.lock().await.cached_prefs.clone();
        let prefs = match cached_prefs {
            Some(prefs) => prefs,
            None => {
                let prefs = self.prefs.by_room_and_user(room, user).await?;
                session.lock().await.cached_prefs = Some(prefs.clone());
                prefs
            }
        };

        let liked_ids: Vec<String> = prefs
            .iter()
            .filter(|p| p.liked)
            .map(|p| p.movie_id.clone())
            .collect();
        let seen: HashSet<String> = prefs.iter().map(|p| p.movie_id.clone()).collect();

        let liked_movies = if liked_ids.is_empty() {
            Vec::new()
        } else {
            self.movies.by_ids(&liked_ids).await?
        };

        let candidates = self.aggregator.gather(&liked_movies, &seen).await;
        let ranked = self.rank(&liked_movies, candidates);

        let mut state = session.lock().await;
        state.list = ranked;
        state.refreshed_at = Some(Instant::now());
        let end = page_size.min(state.list.len());
        let first_page = state.list[..end].to_vec();
        state.cursor = end;

        tracing::info!(
            room = %room,
            user = %user,
            cached = state.list.len(),
            served = first_page.len(),
            "Suggestion cache refreshed"
        );

        Ok(first_page)
    }

    /// With likes: score, sort descending, then shuffle each half
    /// independently so quality bias survives while near-equal scores vary
    /// between refreshes. Without likes: plain shuffle.
    fn rank(&self, liked: &[Movie], mut candidates: Vec<Movie>) -> Vec<Movie> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        if liked.is_empty() {
            candidates.shuffle(&mut *rng);
            return candidates;
        }

        let mut scored: Vec<(Movie, f64)> = candidates
            .into_iter()
            .map(|movie| {
                let s = score(liked, &movie, &mut *rng);
                (movie, s)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut ranked: Vec<Movie> = scored.into_iter().map(|(movie, _)| movie).collect();
        let mid = ranked.len() / 2;
        let (top, bottom) = ranked.split_at_mut(mid);
        top.shuffle(&mut *rng);
        bottom.shuffle(&mut *rng);

        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    use crate::{
        catalog::{
            CatalogReview, Credits, DiscoverQuery, Genre, MovieDetails, MovieSummary, Person,
        },
        db::MemoryStore,
        error::AppError,
    };

    /// Catalog stub: every discover call yields 12 summaries whose ids
    /// encode the calling strategy (via its minimum rating), so three
    /// strategies produce 36 distinct candidates for a user with no likes
    struct StubCatalog {
        discover_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl StubCatalog {
        fn new() -> Self {
            Self {
                discover_calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                discover_calls: AtomicUsize::new(0),
                gate: Some(gate),
            }
        }

        fn calls(&self) -> usize {
            self.discover_calls.load(Ordering::SeqCst)
        }
    }

    fn strategy_base(min_rating: Option<f32>) -> u64 {
        match min_rating {
            Some(r) if r == 5.5 => 4000,
            Some(r) if r == 7.0 => 1000,
            Some(r) if r == 6.0 => 2000,
            Some(r) if r == 6.5 => 3000,
            _ => 5000,
        }
    }

    #[async_trait]
    impl CatalogClient for StubCatalog {
        async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<MovieSummary>> {
            self.discover_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let base = strategy_base(query.min_rating);
            Ok((base..base + 12)
                .map(|id| MovieSummary {
                    id,
                    title: format!("movie-{}", id),
                    release_date: Some("2004-05-01".to_string()),
                    overview: None,
                    poster_path: None,
                    vote_average: Some(7.1),
                })
                .collect())
        }

        async fn movie_details(&self, id: u64) -> AppResult<MovieDetails> {
            Ok(MovieDetails {
                id,
                title: format!("movie-{}", id),
                release_date: Some("2004-05-01".to_string()),
                runtime: Some(100),
                genres: vec![Genre {
                    id: 18,
                    name: "Drama".to_string(),
                }],
                overview: None,
                poster_path: None,
                vote_average: Some(7.1),
            })
        }

        async fn movie_credits(&self, _id: u64) -> AppResult<Credits> {
            Ok(Credits {
                cast: vec![],
                crew: vec![],
            })
        }

        async fn search_movies(&self, _title: &str, _page: u32) -> AppResult<Vec<MovieSummary>> {
            Ok(vec![])
        }

        async fn search_person(&self, _name: &str) -> AppResult<Vec<Person>> {
            Ok(vec![])
        }

        async fn genre_list(&self) -> AppResult<Vec<Genre>> {
            Ok(vec![Genre {
                id: 18,
                name: "Drama".to_string(),
            }])
        }

        async fn movie_reviews(&self, _id: u64) -> AppResult<Vec<CatalogReview>> {
            Ok(vec![])
        }
    }

    /// Preference store wrapper that can be switched into a failing mode
    struct FlakyPrefs {
        inner: Arc<MemoryStore>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl PreferenceStore for FlakyPrefs {
        async fn upsert(&self, preference: &Preference) -> AppResult<()> {
            PreferenceStore::upsert(self.inner.as_ref(), preference).await
        }

        async fn by_room_and_user(&self, code: &str, username: &str) -> AppResult<Vec<Preference>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.by_room_and_user(code, username).await
        }

        async fn by_room(&self, code: &str) -> AppResult<Vec<Preference>> {
            self.inner.by_room(code).await
        }

        async fn room_match_ids(&self, code: &str) -> AppResult<Vec<String>> {
            self.inner.room_match_ids(code).await
        }
    }

    struct Fixture {
        recommender: Arc<Recommender>,
        catalog: Arc<StubCatalog>,
        prefs: Arc<FlakyPrefs>,
    }

    fn fixture_with_catalog(catalog: Arc<StubCatalog>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let prefs = Arc::new(FlakyPrefs {
            inner: store.clone(),
            failing: AtomicBool::new(false),
        });
        let genres = Arc::new(GenreIndex::new(catalog.clone()));
        let recommender = Arc::new(Recommender::with_rng(
            catalog.clone(),
            genres,
            store,
            prefs.clone(),
            Duration::from_secs(30),
            16,
            StdRng::seed_from_u64(11),
        ));
        Fixture {
            recommender,
            catalog,
            prefs,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_catalog(Arc::new(StubCatalog::new()))
    }

    fn page(batch: NextBatch) -> Vec<Movie> {
        match batch {
            NextBatch::Page(movies) => movies,
            NextBatch::RefreshInFlight => panic!("expected a page"),
        }
    }

    fn sample_movie(id: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: format!("movie-{}", id),
            year: "2004".to_string(),
            runtime: None,
            genre: Some("Drama".to_string()),
            director: None,
            actors: None,
            plot: None,
            poster: String::new(),
            rating: Some("7.1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_contiguous() {
        let f = fixture();

        // 36 candidates cached; first page of 20, then the 16-item remainder
        let first = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        assert_eq!(first.len(), 20);

        let second = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        assert_eq!(second.len(), 16);

        let first_ids: HashSet<&str> = first.iter().map(|m| m.id.as_str()).collect();
        assert!(second.iter().all(|m| !first_ids.contains(m.id.as_str())));
        assert_eq!(first.len() + second.len(), 36);
    }

    #[tokio::test]
    async fn test_remainder_is_served_without_network_refresh() {
        let f = fixture();

        page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        let after_refresh = f.catalog.calls();

        // Remainder comes straight from the cache
        let second = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        assert_eq!(second.len(), 16);
        assert_eq!(f.catalog.calls(), after_refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cache_forces_refresh() {
        let f = fixture();

        page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        let after_first = f.catalog.calls();

        // Past the validity window the 16-item remainder is discarded and a
        // fresh full page is served
        tokio::time::advance(Duration::from_secs(31)).await;
        let batch = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());

        assert_eq!(batch.len(), 20);
        assert!(f.catalog.calls() > after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_liked_swipe_invalidates_preference_snapshot() {
        let f = fixture();

        let first = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        let swiped = first[0].clone();

        f.recommender
            .record_swipe("R1", "alice", &swiped, true)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        let refreshed = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());

        // The fresh preference read marks the swiped movie as seen
        assert!(refreshed.iter().all(|m| m.id != swiped.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_leaves_cache_untouched() {
        let f = fixture();

        page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        // A like clears the preference snapshot, so the next refresh must
        // hit the (now failing) store
        f.recommender
            .record_swipe("R1", "alice", &sample_movie("9999"), true)
            .await
            .unwrap();
        f.prefs.failing.store(true, Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(31)).await;
        let result = f.recommender.next_batch("R1", "alice", 20).await;
        assert!(result.is_err());

        // Prior cache state survives the failure and the session recovers
        let session = f
            .recommender
            .sessions
            .peek(&SessionKey::new("R1", "alice"))
            .unwrap();
        {
            let state = session.lock().await;
            assert_eq!(state.list.len(), 36);
            assert_eq!(state.cursor, 20);
            assert!(!state.refreshing);
        }

        f.prefs.failing.store(false, Ordering::SeqCst);
        let batch = page(f.recommender.next_batch("R1", "alice", 20).await.unwrap());
        assert_eq!(batch.len(), 20);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_a_noop() {
        let gate = Arc::new(Notify::new());
        let f = fixture_with_catalog(Arc::new(StubCatalog::gated(gate.clone())));

        let engine = f.recommender.clone();
        let blocked =
            tokio::spawn(async move { engine.next_batch("R1", "alice", 20).await.unwrap() });

        // Give the first caller time to mark the session as refreshing
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = f.recommender.next_batch("R1", "alice", 20).await.unwrap();
        assert_eq!(second, NextBatch::RefreshInFlight);

        // Release all gated strategy calls and let the refresh finish
        gate.notify_waiters();
        let first = blocked.await.unwrap();
        assert_eq!(page(first).len(), 20);
    }

    #[tokio::test]
    async fn test_cursor_never_exceeds_list_length() {
        let f = fixture();

        // Page size larger than the whole pool: one short page, cursor at end
        let batch = page(f.recommender.next_batch("R1", "alice", 50).await.unwrap());
        assert_eq!(batch.len(), 36);

        let session = f
            .recommender
            .sessions
            .peek(&SessionKey::new("R1", "alice"))
            .unwrap();
        let state = session.lock().await;
        assert_eq!(state.cursor, state.list.len());
    }

    #[tokio::test]
    async fn test_rank_with_likes_puts_strong_match_in_top_half() {
        let f = fixture();
        let liked = vec![Movie {
            director: Some("Denis Villeneuve".to_string()),
            actors: Some("A, B".to_string()),
            ..sample_movie("liked")
        }];

        let strong = Movie {
            director: Some("Denis Villeneuve".to_string()),
            actors: Some("A, B".to_string()),
            ..sample_movie("strong")
        };
        let mut candidates = vec![strong];
        for i in 0..9 {
            candidates.push(Movie {
                genre: Some("Western".to_string()),
                ..sample_movie(&format!("filler-{}", i))
            });
        }

        let ranked = f.recommender.rank(&liked, candidates);

        assert_eq!(ranked.len(), 10);
        let position = ranked.iter().position(|m| m.id == "strong").unwrap();
        assert!(position < 5, "strong match ranked at {}", position);
    }

    #[tokio::test]
    async fn test_rank_without_likes_is_a_permutation() {
        let f = fixture();
        let candidates: Vec<Movie> = (0..8).map(|i| sample_movie(&i.to_string())).collect();
        let original_ids: HashSet<String> = candidates.iter().map(|m| m.id.clone()).collect();

        let ranked = f.recommender.rank(&[], candidates);

        let ranked_ids: HashSet<String> = ranked.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ranked_ids, original_ids);
    }
}
