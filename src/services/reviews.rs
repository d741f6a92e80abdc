use std::sync::Arc;

use serde::Serialize;

use crate::{
    catalog::CatalogClient,
    db::ReviewStore,
    error::{AppError, AppResult},
    models::Review,
};

/// A review from either source, shaped uniformly for the response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieReview {
    pub author: String,
    pub rating: Option<f32>,
    pub comment: String,
    /// True for reviews submitted through this service
    pub local: bool,
}

/// Merges locally submitted reviews with the catalog's own review feed.
///
/// Local reviews come first. A catalog outage degrades the listing to
/// local-only instead of failing the request.
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogClient>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewStore>, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { reviews, catalog }
    }

    pub async fn movie_reviews(&self, movie_id: &str) -> AppResult<Vec<MovieReview>> {
        let mut merged: Vec<MovieReview> = self
            .reviews
            .by_movie(movie_id)
            .await?
            .into_iter()
            .map(|r| MovieReview {
                author: r.user,
                rating: Some(r.rating),
                comment: r.comment,
                local: true,
            })
            .collect();

        match self.catalog_reviews(movie_id).await {
            Ok(remote) => merged.extend(remote),
            Err(err) => {
                tracing::warn!(movie = %movie_id, error = %err, "Catalog reviews unavailable, serving local only");
            }
        }

        Ok(merged)
    }

    /// Stores the review and confirms it, replacing any earlier review by
    /// the same user for the same movie
    pub async fn submit(&self, review: &Review) -> AppResult<()> {
        if !(0.0..=5.0).contains(&review.rating) {
            return Err(AppError::InvalidInput(
                "rating must be between 0 and 5".to_string(),
            ));
        }
        if review.comment.trim().is_empty() {
            return Err(AppError::InvalidInput("comment must not be empty".to_string()));
        }

        self.reviews.upsert(review).await?;
        tracing::info!(user = %review.user, movie = %review.movie_id, "Review stored");
        Ok(())
    }

    async fn catalog_reviews(&self, movie_id: &str) -> AppResult<Vec<MovieReview>> {
        let id: u64 = movie_id
            .parse()
            .map_err(|_| AppError::InvalidInput("movie id must be numeric".to_string()))?;

        Ok(self
            .catalog
            .movie_reviews(id)
            .await?
            .into_iter()
            .map(|r| MovieReview {
                author: r.author,
                // Catalog ratings are on a 10-point scale; local ones on 5
                rating: r.rating.map(|v| v / 2.0),
                comment: r.content,
                local: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogReview, MockCatalogClient};
    use crate::db::MemoryStore;

    fn review(user: &str, movie_id: &str, rating: f32) -> Review {
        Review {
            user: user.to_string(),
            movie_id: movie_id.to_string(),
            rating,
            comment: "worth watching".to_string(),
        }
    }

    fn catalog_with_reviews(reviews: Vec<CatalogReview>) -> MockCatalogClient {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movie_reviews()
            .returning(move |_| Ok(reviews.clone()));
        catalog
    }

    #[tokio::test]
    async fn test_local_reviews_come_before_catalog_reviews() {
        let store = Arc::new(MemoryStore::new());
        let catalog = catalog_with_reviews(vec![CatalogReview {
            author: "critic".to_string(),
            content: "a classic".to_string(),
            created_at: "2020-01-01".to_string(),
            rating: Some(8.0),
        }]);
        let service = ReviewService::new(store, Arc::new(catalog));

        service.submit(&review("alice", "42", 4.5)).await.unwrap();

        let merged = service.movie_reviews("42").await.unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged[0].local);
        assert_eq!(merged[0].author, "alice");
        assert!(!merged[1].local);
        // 10-point catalog scale halved to match local ratings
        assert_eq!(merged[1].rating, Some(4.0));
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_to_local_only() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movie_reviews()
            .returning(|_| Err(AppError::Catalog("upstream down".to_string())));
        let service = ReviewService::new(store, Arc::new(catalog));

        service.submit(&review("alice", "42", 3.0)).await.unwrap();

        let merged = service.movie_reviews("42").await.unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged[0].local);
    }

    #[tokio::test]
    async fn test_resubmission_replaces_earlier_review() {
        let store = Arc::new(MemoryStore::new());
        let catalog = catalog_with_reviews(vec![]);
        let service = ReviewService::new(store, Arc::new(catalog));

        service.submit(&review("alice", "42", 2.0)).await.unwrap();
        service.submit(&review("alice", "42", 5.0)).await.unwrap();

        let merged = service.movie_reviews("42").await.unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = ReviewService::new(store, Arc::new(MockCatalogClient::new()));

        let result = service.submit(&review("alice", "42", 5.5)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
