/// Movie catalog abstraction
///
/// The recommendation engine consumes an external movie catalog (discover
/// queries, detail/credit hydration, person and title search) through this
/// trait. The production implementation talks to a TMDB-shaped HTTP API;
/// tests substitute mocks or stubs.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, models::Movie};

pub mod tmdb;

pub use tmdb::TmdbClient;

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Sort order accepted by the catalog's discover endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    PopularityDesc,
    RatingDesc,
    VoteCountDesc,
    ReleaseDateDesc,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::PopularityDesc => "popularity.desc",
            SortBy::RatingDesc => "vote_average.desc",
            SortBy::VoteCountDesc => "vote_count.desc",
            SortBy::ReleaseDateDesc => "release_date.desc",
        }
    }
}

/// Filter criteria for a discover query
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub genre_ids: Vec<u64>,
    pub cast_ids: Vec<u64>,
    pub crew_ids: Vec<u64>,
    pub min_rating: Option<f32>,
    /// Inclusive lower bound, "YYYY-MM-DD"
    pub release_date_gte: Option<String>,
    /// Inclusive upper bound, "YYYY-MM-DD"
    pub release_date_lte: Option<String>,
    pub sort_by: SortBy,
    pub page: u32,
}

impl Default for DiscoverQuery {
    fn default() -> Self {
        Self {
            genre_ids: Vec::new(),
            cast_ids: Vec::new(),
            crew_ids: Vec::new(),
            min_rating: None,
            release_date_gte: None,
            release_date_lte: None,
            sort_by: SortBy::PopularityDesc,
            page: 1,
        }
    }
}

/// One entry of a paged discover/search response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f32>,
}

/// Full detail record for a single movie
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CastMember {
    pub name: String,
    /// Billing order, lower is more prominent
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
}

/// A review hosted by the catalog itself
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogReview {
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub rating: Option<f32>,
}

/// Trait for movie catalog backends
///
/// Only the raw endpoint calls are required; `fetch_movie` and
/// `discover_movies` combine them into hydrated [`Movie`] records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Discover movies matching the given filter criteria (one page)
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<MovieSummary>>;

    /// Base detail record for a movie
    async fn movie_details(&self, id: u64) -> AppResult<MovieDetails>;

    /// Cast and crew for a movie
    async fn movie_credits(&self, id: u64) -> AppResult<Credits>;

    /// Search movies by title (one page)
    async fn search_movies(&self, title: &str, page: u32) -> AppResult<Vec<MovieSummary>>;

    /// Search people (actors, directors) by name
    async fn search_person(&self, name: &str) -> AppResult<Vec<Person>>;

    /// The catalog's full genre list
    async fn genre_list(&self) -> AppResult<Vec<Genre>>;

    /// Reviews the catalog hosts for a movie
    async fn movie_reviews(&self, id: u64) -> AppResult<Vec<CatalogReview>>;
}

/// Hydrates a movie id into a full [`Movie`] record.
///
/// Director is the first crew entry credited as "Director"; cast is the
/// top 5 members by billing order, comma-joined.
pub async fn fetch_movie<C>(catalog: &C, id: u64) -> AppResult<Movie>
where
    C: CatalogClient + ?Sized,
{
    let details = catalog.movie_details(id).await?;
    let credits = catalog.movie_credits(id).await?;

    let director = credits
        .crew
        .iter()
        .find(|c| c.job == "Director")
        .map(|c| c.name.clone());

    let mut cast = credits.cast;
    cast.sort_by_key(|c| c.order);
    let actors = if cast.is_empty() {
        None
    } else {
        Some(
            cast.iter()
                .take(5)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    Ok(movie_from_details(details, director, actors))
}

/// Runs a discover query and hydrates every result
pub async fn discover_movies<C>(catalog: &C, query: &DiscoverQuery) -> AppResult<Vec<Movie>>
where
    C: CatalogClient + ?Sized,
{
    let page = catalog.discover(query).await?;
    let mut movies = Vec::with_capacity(page.len());
    for summary in page {
        movies.push(fetch_movie(catalog, summary.id).await?);
    }
    Ok(movies)
}

/// Builds a [`Movie`] from a detail record plus resolved credits
pub fn movie_from_details(
    details: MovieDetails,
    director: Option<String>,
    actors: Option<String>,
) -> Movie {
    let genre = if details.genres.is_empty() {
        None
    } else {
        Some(
            details
                .genres
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    Movie {
        id: details.id.to_string(),
        title: details.title,
        year: year_from_date(details.release_date.as_deref()),
        runtime: details.runtime.map(|r| format!("{} min", r)),
        genre,
        director,
        actors,
        plot: details.overview,
        poster: poster_url(details.poster_path.as_deref()),
        rating: details.vote_average.map(|v| v.to_string()),
    }
}

/// Builds a thin [`Movie`] from a search/discover summary; genres, credits
/// and runtime require hydration and stay empty here
pub fn movie_from_summary(summary: &MovieSummary) -> Movie {
    Movie {
        id: summary.id.to_string(),
        title: summary.title.clone(),
        year: year_from_date(summary.release_date.as_deref()),
        runtime: None,
        genre: None,
        director: None,
        actors: None,
        plot: summary.overview.clone(),
        poster: poster_url(summary.poster_path.as_deref()),
        rating: summary.vote_average.map(|v| v.to_string()),
    }
}

fn year_from_date(release_date: Option<&str>) -> String {
    release_date
        .filter(|d| d.len() >= 4)
        .map(|d| d[..4].to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn poster_url(poster_path: Option<&str>) -> String {
    poster_path
        .map(|p| format!("{}{}", POSTER_BASE_URL, p))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_details() -> MovieDetails {
        MovieDetails {
            id: 550,
            title: "Fight Club".to_string(),
            release_date: Some("1999-10-15".to_string()),
            runtime: Some(139),
            genres: vec![Genre {
                id: 18,
                name: "Drama".to_string(),
            }],
            overview: Some("An insomniac office worker...".to_string()),
            poster_path: Some("/fight.jpg".to_string()),
            vote_average: Some(8.4),
        }
    }

    #[test]
    fn test_movie_from_details() {
        let movie = movie_from_details(
            sample_details(),
            Some("David Fincher".to_string()),
            Some("Edward Norton, Brad Pitt".to_string()),
        );

        assert_eq!(movie.id, "550");
        assert_eq!(movie.year, "1999");
        assert_eq!(movie.runtime, Some("139 min".to_string()));
        assert_eq!(movie.genre, Some("Drama".to_string()));
        assert_eq!(movie.director, Some("David Fincher".to_string()));
        assert_eq!(movie.poster, "https://image.tmdb.org/t/p/w500/fight.jpg");
        assert_eq!(movie.rating, Some("8.4".to_string()));
    }

    #[test]
    fn test_movie_from_details_missing_fields() {
        let details = MovieDetails {
            release_date: None,
            runtime: None,
            genres: vec![],
            poster_path: None,
            vote_average: None,
            ..sample_details()
        };

        let movie = movie_from_details(details, None, None);

        assert_eq!(movie.year, "N/A");
        assert_eq!(movie.runtime, None);
        assert_eq!(movie.genre, None);
        assert_eq!(movie.poster, "");
        assert_eq!(movie.rating, None);
    }

    #[tokio::test]
    async fn test_fetch_movie_picks_director_and_top_cast() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movie_details()
            .returning(|_| Ok(sample_details()));
        catalog.expect_movie_credits().returning(|_| {
            Ok(Credits {
                cast: vec![
                    CastMember {
                        name: "F".to_string(),
                        order: 5,
                    },
                    CastMember {
                        name: "A".to_string(),
                        order: 0,
                    },
                    CastMember {
                        name: "B".to_string(),
                        order: 1,
                    },
                    CastMember {
                        name: "C".to_string(),
                        order: 2,
                    },
                    CastMember {
                        name: "D".to_string(),
                        order: 3,
                    },
                    CastMember {
                        name: "E".to_string(),
                        order: 4,
                    },
                ],
                crew: vec![
                    CrewMember {
                        name: "Jim Uhls".to_string(),
                        job: "Screenplay".to_string(),
                    },
                    CrewMember {
                        name: "David Fincher".to_string(),
                        job: "Director".to_string(),
                    },
                ],
            })
        });

        let movie = fetch_movie(&catalog, 550).await.unwrap();
        assert_eq!(movie.director, Some("David Fincher".to_string()));
        assert_eq!(movie.actors, Some("A, B, C, D, E".to_string()));
    }
}
