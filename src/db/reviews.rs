use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::ReviewStore, error::AppResult, models::Review};

/// Postgres-backed review store
#[derive(Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn upsert(&self, review: &Review) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (reviewer, movie_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (reviewer, movie_id) DO UPDATE SET
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment
            "#,
        )
        .bind(&review.user)
        .bind(&review.movie_id)
        .bind(review.rating)
        .bind(&review.comment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_movie(&self, movie_id: &str) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT reviewer, movie_id, rating, comment FROM reviews WHERE movie_id = $1",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn by_user(&self, username: &str) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT reviewer, movie_id, rating, comment FROM reviews WHERE reviewer = $1",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
