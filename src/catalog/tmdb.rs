use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    catalog::{
        CatalogClient, CatalogReview, Credits, DiscoverQuery, Genre, MovieDetails, MovieSummary,
        Person,
    },
    error::{AppError, AppResult},
};

/// TMDB-backed catalog client
///
/// All endpoints are authenticated with an `api_key` query parameter and
/// pinned to `language=en-US`.
#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

#[derive(Deserialize)]
struct PagedResults<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

impl TmdbClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    /// Issues a GET request and deserializes the JSON body, mapping
    /// non-success statuses to a catalog error
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Catalog(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    fn discover_params(query: &DiscoverQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", query.sort_by.as_str().to_string()),
            ("page", query.page.to_string()),
        ];

        if !query.genre_ids.is_empty() {
            params.push(("with_genres", join_ids(&query.genre_ids)));
        }
        if !query.cast_ids.is_empty() {
            params.push(("with_cast", join_ids(&query.cast_ids)));
        }
        if !query.crew_ids.is_empty() {
            params.push(("with_crew", join_ids(&query.crew_ids)));
        }
        if let Some(min_rating) = query.min_rating {
            params.push(("vote_average.gte", min_rating.to_string()));
        }
        if let Some(gte) = &query.release_date_gte {
            params.push(("release_date.gte", gte.clone()));
        }
        if let Some(lte) = &query.release_date_lte {
            params.push(("release_date.lte", lte.clone()));
        }

        params
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<MovieSummary>> {
        let params = Self::discover_params(query);
        let page: PagedResults<MovieSummary> = self.get_json("discover/movie", &params).await?;

        tracing::debug!(
            results = page.results.len(),
            sort_by = query.sort_by.as_str(),
            page = query.page,
            "Discover query completed"
        );

        Ok(page.results)
    }

    async fn movie_details(&self, id: u64) -> AppResult<MovieDetails> {
        self.get_json(&format!("movie/{}", id), &[]).await
    }

    async fn movie_credits(&self, id: u64) -> AppResult<Credits> {
        self.get_json(&format!("movie/{}/credits", id), &[]).await
    }

    async fn search_movies(&self, title: &str, page: u32) -> AppResult<Vec<MovieSummary>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let params = [
            ("query", title.to_string()),
            ("page", page.to_string()),
        ];
        let results: PagedResults<MovieSummary> = self.get_json("search/movie", &params).await?;
        Ok(results.results)
    }

    async fn search_person(&self, name: &str) -> AppResult<Vec<Person>> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Person name cannot be empty".to_string(),
            ));
        }

        let params = [("query", name.to_string())];
        let results: PagedResults<Person> = self.get_json("search/person", &params).await?;
        Ok(results.results)
    }

    async fn genre_list(&self) -> AppResult<Vec<Genre>> {
        let response: GenreListResponse = self.get_json("genre/movie/list", &[]).await?;
        Ok(response.genres)
    }

    async fn movie_reviews(&self, id: u64) -> AppResult<Vec<CatalogReview>> {
        #[derive(Deserialize)]
        struct RawReview {
            author: String,
            content: String,
            created_at: String,
            author_details: Option<AuthorDetails>,
        }

        #[derive(Deserialize)]
        struct AuthorDetails {
            rating: Option<f32>,
        }

        let raw: PagedResults<RawReview> = self
            .get_json(&format!("movie/{}/reviews", id), &[])
            .await?;

        Ok(raw
            .results
            .into_iter()
            .map(|r| CatalogReview {
                author: r.author,
                content: r.content,
                created_at: r.created_at,
                rating: r.author_details.and_then(|d| d.rating),
            })
            .collect())
    }
}
