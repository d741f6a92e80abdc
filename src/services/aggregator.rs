use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    catalog::{discover_movies, CatalogClient, DiscoverQuery, SortBy},
    error::AppResult,
    models::Movie,
    services::genre_index::GenreIndex,
    services::scoring::{average_year, top_genres},
};

/// One slow catalog branch must not stall the whole fan-out
const STRATEGY_TIMEOUT: Duration = Duration::from_secs(10);

const PERSONALIZED_MIN_RATING: f32 = 5.5;
const POPULAR_MIN_RATING: f32 = 7.0;
const RANDOM_GENRE_MIN_RATING: f32 = 6.0;
const DIVERSE_ERA_MIN_RATING: f32 = 6.5;

/// Gathers candidate movies across four diversified retrieval strategies.
///
/// The strategies run concurrently; each one that fails or times out simply
/// contributes nothing. Results are concatenated in strategy order and
/// deduplicated by id, first occurrence winning.
pub struct CandidateAggregator {
    catalog: Arc<dyn CatalogClient>,
    genres: Arc<GenreIndex>,
    rng: Arc<Mutex<StdRng>>,
}

impl CandidateAggregator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        genres: Arc<GenreIndex>,
        rng: Arc<Mutex<StdRng>>,
    ) -> Self {
        Self {
            catalog,
            genres,
            rng,
        }
    }

    /// Candidate pool for one user: deduplicated, not yet scored or paginated
    pub async fn gather(&self, liked: &[Movie], seen: &HashSet<String>) -> Vec<Movie> {
        let now_year = Utc::now().year();

        let (personalized, popular, by_genre, by_era) = tokio::join!(
            self.personalized(liked, seen, now_year),
            self.popular(seen, now_year),
            self.random_genre(seen),
            self.diverse_era(seen, now_year),
        );

        let candidates = dedup_by_id([personalized, popular, by_genre, by_era]);

        tracing::debug!(
            candidates = candidates.len(),
            liked = liked.len(),
            seen = seen.len(),
            "Candidate gathering completed"
        );

        candidates
    }

    /// Tailored to the user's taste profile; skipped without liked movies
    async fn personalized(
        &self,
        liked: &[Movie],
        seen: &HashSet<String>,
        now_year: i32,
    ) -> Vec<Movie> {
        if liked.is_empty() {
            return Vec::new();
        }

        let outcome = tokio::time::timeout(STRATEGY_TIMEOUT, async {
            let genre_map = self.genres.resolve().await?;
            let query = personalized_query(liked, genre_map, now_year);
            discover_movies(self.catalog.as_ref(), &query).await
        })
        .await;

        flatten_strategy("personalized", outcome, seen)
    }

    /// Highly rated movies around a randomized center year
    async fn popular(&self, seen: &HashSet<String>, now_year: i32) -> Vec<Movie> {
        let query = {
            let mut rng = self.lock_rng();
            popular_query(&mut *rng, now_year)
        };

        let outcome = tokio::time::timeout(
            STRATEGY_TIMEOUT,
            discover_movies(self.catalog.as_ref(), &query),
        )
        .await;

        flatten_strategy("popular", outcome, seen)
    }

    /// Two random genres with a random sort order
    async fn random_genre(&self, seen: &HashSet<String>) -> Vec<Movie> {
        let outcome = tokio::time::timeout(STRATEGY_TIMEOUT, async {
            let genre_map = self.genres.resolve().await?;
            let genre_ids: Vec<u64> = genre_map.values().copied().collect();
            let query = {
                let mut rng = self.lock_rng();
                random_genre_query(&mut *rng, &genre_ids)
            };
            discover_movies(self.catalog.as_ref(), &query).await
        })
        .await;

        flatten_strategy("random_genre", outcome, seen)
    }

    /// Well-voted movies from one randomly chosen decade
    async fn diverse_era(&self, seen: &HashSet<String>, now_year: i32) -> Vec<Movie> {
        let query = {
            let mut rng = self.lock_rng();
            diverse_era_query(&mut *rng, now_year)
        };

        let outcome = tokio::time::timeout(
            STRATEGY_TIMEOUT,
            discover_movies(self.catalog.as_ref(), &query),
        )
        .await;

        flatten_strategy("diverse_era", outcome, seen)
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collapses a strategy outcome to its movie list, treating errors and
/// timeouts as empty, and drops already-seen ids
fn flatten_strategy(
    strategy: &str,
    outcome: Result<AppResult<Vec<Movie>>, tokio::time::error::Elapsed>,
    seen: &HashSet<String>,
) -> Vec<Movie> {
    let movies = match outcome {
        Ok(Ok(movies)) => movies,
        Ok(Err(e)) => {
            tracing::warn!(strategy = %strategy, error = %e, "Retrieval strategy failed");
            return Vec::new();
        }
        Err(_) => {
            tracing::warn!(strategy = %strategy, "Retrieval strategy timed out");
            return Vec::new();
        }
    };

    movies
        .into_iter()
        .filter(|m| !seen.contains(&m.id))
        .collect()
}

/// Deduplicates concatenated strategy outputs by id, first occurrence wins
fn dedup_by_id(lists: impl IntoIterator<Item = Vec<Movie>>) -> Vec<Movie> {
    let mut ids = HashSet::new();
    let mut unique = Vec::new();
    for movie in lists.into_iter().flatten() {
        if ids.insert(movie.id.clone()) {
            unique.push(movie);
        }
    }
    unique
}

/// Query tuned to the user's taste: top-2 liked genres, the average liked
/// release year widened to a ±10-year window clamped to [1950, now]
fn personalized_query(
    liked: &[Movie],
    genre_map: &HashMap<String, u64>,
    now_year: i32,
) -> DiscoverQuery {
    let genre_ids: Vec<u64> = top_genres(liked, 2)
        .iter()
        .filter_map(|name| genre_map.get(name).copied())
        .collect();

    let (release_date_gte, release_date_lte) = match average_year(liked) {
        Some(avg) => (
            Some(format!("{}-01-01", (avg - 10).max(1950))),
            Some(format!("{}-12-31", (avg + 10).min(now_year))),
        ),
        None => (None, None),
    };

    DiscoverQuery {
        genre_ids,
        min_rating: Some(PERSONALIZED_MIN_RATING),
        release_date_gte,
        release_date_lte,
        sort_by: SortBy::VoteCountDesc,
        page: 1,
        ..Default::default()
    }
}

/// Highly rated movies in a ±5-year window around a random center year
fn popular_query(rng: &mut impl Rng, now_year: i32) -> DiscoverQuery {
    let center = rng.gen_range(1990..now_year - 1);

    DiscoverQuery {
        min_rating: Some(POPULAR_MIN_RATING),
        release_date_gte: Some(format!("{}-01-01", center - 5)),
        release_date_lte: Some(format!("{}-12-31", center + 5)),
        sort_by: SortBy::PopularityDesc,
        page: rng.gen_range(1..6),
        ..Default::default()
    }
}

/// Two random genres, random sort order, random page
fn random_genre_query(rng: &mut impl Rng, genre_ids: &[u64]) -> DiscoverQuery {
    let mut shuffled = genre_ids.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(2);

    let sort_by = *[
        SortBy::PopularityDesc,
        SortBy::RatingDesc,
        SortBy::ReleaseDateDesc,
    ]
    .choose(rng)
    .unwrap_or(&SortBy::PopularityDesc);

    DiscoverQuery {
        genre_ids: shuffled,
        min_rating: Some(RANDOM_GENRE_MIN_RATING),
        sort_by,
        page: rng.gen_range(1..4),
        ..Default::default()
    }
}

/// One decade bucket chosen at random, from the 1970s through today
fn diverse_era_query(rng: &mut impl Rng, now_year: i32) -> DiscoverQuery {
    let decades = [
        (1970, 1979),
        (1980, 1989),
        (1990, 1999),
        (2000, 2009),
        (2010, 2019),
        (2020, now_year),
    ];
    let (start, end) = *decades.choose(rng).unwrap_or(&decades[0]);

    DiscoverQuery {
        min_rating: Some(DIVERSE_ERA_MIN_RATING),
        release_date_gte: Some(format!("{}-01-01", start)),
        release_date_lte: Some(format!("{}-12-31", end)),
        sort_by: SortBy::VoteCountDesc,
        page: rng.gen_range(1..3),
        ..Default::default()
    }
}
