use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::RoomStore, error::AppResult, models::Room};

/// Postgres-backed room store
#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn create(&self, room: &Room) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO rooms (code, host) VALUES ($1, $2)")
            .bind(&room.code)
            .bind(&room.host)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO room_participants (room_code, username) VALUES ($1, $2)")
            .bind(&room.code)
            .bind(&room.host)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn by_code(&self, code: &str) -> AppResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT code, host FROM rooms WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    async fn add_participant(&self, code: &str, username: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_participants (room_code, username)
            VALUES ($1, $2)
            ON CONFLICT (room_code, username) DO NOTHING
            "#,
        )
        .bind(code)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_participant(&self, code: &str, username: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM room_participants WHERE room_code = $1 AND username = $2")
            .bind(code)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn participants(&self, code: &str) -> AppResult<Vec<String>> {
        let participants = sqlx::query_scalar::<_, String>(
            "SELECT username FROM room_participants WHERE room_code = $1 ORDER BY username",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn rooms_by_user(&self, username: &str) -> AppResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT r.code, r.host
            FROM rooms AS r
            JOIN room_participants AS rp ON rp.room_code = r.code
            WHERE rp.username = $1
            ORDER BY r.code
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }
}
