use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::PreferenceStore, error::AppResult, models::Preference};

/// Postgres-backed preference store
#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn upsert(&self, preference: &Preference) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (room_code, participant_name, movie_id, liked)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (room_code, participant_name, movie_id)
                DO UPDATE SET liked = EXCLUDED.liked
            "#,
        )
        .bind(&preference.room_code)
        .bind(&preference.participant_name)
        .bind(&preference.movie_id)
        .bind(preference.liked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_room_and_user(&self, code: &str, username: &str) -> AppResult<Vec<Preference>> {
        let preferences = sqlx::query_as::<_, Preference>(
            "SELECT * FROM preferences WHERE room_code = $1 AND participant_name = $2",
        )
        .bind(code)
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(preferences)
    }

    async fn by_room(&self, code: &str) -> AppResult<Vec<Preference>> {
        let preferences =
            sqlx::query_as::<_, Preference>("SELECT * FROM preferences WHERE room_code = $1")
                .bind(code)
                .fetch_all(&self.pool)
                .await?;

        Ok(preferences)
    }

    async fn room_match_ids(&self, code: &str) -> AppResult<Vec<String>> {
        // A movie matches when every current participant has a liked vote
        // for it; likes from departed participants do not count.
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.movie_id
            FROM preferences AS p
            JOIN room_participants AS rp
                ON rp.room_code = p.room_code AND rp.username = p.participant_name
            WHERE p.room_code = $1
              AND p.liked
            GROUP BY p.movie_id
            HAVING COUNT(DISTINCT p.participant_name) = (
                SELECT COUNT(*)
                FROM room_participants
                WHERE room_code = $1
            )
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
