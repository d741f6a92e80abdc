use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::MovieStore, error::AppResult, models::Movie};

/// Postgres-backed movie cache
#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn upsert(&self, movie: &Movie) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO movies (id, title, year, runtime, genre, director, actors, plot, poster, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                year = EXCLUDED.year,
                runtime = EXCLUDED.runtime,
                genre = EXCLUDED.genre,
                director = EXCLUDED.director,
                actors = EXCLUDED.actors,
                plot = EXCLUDED.plot,
                poster = EXCLUDED.poster,
                rating = EXCLUDED.rating
            "#,
        )
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(&movie.year)
        .bind(&movie.runtime)
        .bind(&movie.genre)
        .bind(&movie.director)
        .bind(&movie.actors)
        .bind(&movie.plot)
        .bind(&movie.poster)
        .bind(&movie.rating)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_id(&self, id: &str) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movie)
    }

    async fn by_ids(&self, ids: &[String]) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(movies)
    }
}
