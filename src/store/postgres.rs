//! PostgreSQL-backed stores
//!
//! `users.destinations` is a `TEXT[]` column so the destination flip is a
//! single-row `UPDATE ... RETURNING`, which PostgreSQL applies under the
//! row lock. `users.email` carries a unique constraint.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Decrement, Flip, NewUser, PlaceStore, StoreError, User, UserStore};

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let destinations: Vec<String> = row.try_get("destinations")?;
    Ok(User {
        id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        destinations: destinations.into_iter().collect(),
    })
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"SELECT user_id, email, password_hash, destinations
               FROM users WHERE user_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"SELECT user_id, email, password_hash, destinations
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING user_id, email, password_hash, destinations
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::DuplicateEmail
            }
            other => StoreError::Database(other),
        })?;

        Ok(user_from_row(&row)?)
    }

    async fn flip_destination(
        &self,
        id: Uuid,
        place_id: &str,
    ) -> Result<Option<Flip>, StoreError> {
        let added = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE users
            SET destinations = CASE
                WHEN $2::text = ANY(destinations) THEN array_remove(destinations, $2::text)
                ELSE array_append(destinations, $2::text)
            END
            WHERE user_id = $1
            RETURNING $2::text = ANY(destinations)
            "#,
        )
        .bind(id)
        .bind(place_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(added.map(|added| if added { Flip::Added } else { Flip::Removed }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgPlaceStore {
    pool: PgPool,
}

impl PgPlaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaceStore for PgPlaceStore {
    async fn going(&self, place_id: &str) -> Result<Option<i64>, StoreError> {
        let going = sqlx::query_scalar::<_, i64>("SELECT going FROM places WHERE place_id = $1")
            .bind(place_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(going)
    }

    async fn going_many(&self, place_ids: &[String]) -> Result<HashMap<String, i64>, StoreError> {
        if place_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query("SELECT place_id, going FROM places WHERE place_id = ANY($1)")
            .bind(place_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut going = HashMap::with_capacity(rows.len());
        for row in rows {
            going.insert(
                row.try_get::<String, _>("place_id")?,
                row.try_get::<i64, _>("going")?,
            );
        }
        Ok(going)
    }

    async fn increment(&self, place_id: &str) -> Result<i64, StoreError> {
        let going = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO places (place_id, going) VALUES ($1, 1)
            ON CONFLICT (place_id) DO UPDATE
            SET going = places.going + 1, updated_at = NOW()
            RETURNING going
            "#,
        )
        .bind(place_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(going)
    }

    async fn decrement(&self, place_id: &str) -> Result<Option<Decrement>, StoreError> {
        let row = sqlx::query(
            r#"
            WITH prev AS (
                SELECT going FROM places WHERE place_id = $1 FOR UPDATE
            )
            UPDATE places p
            SET going = GREATEST(p.going - 1, 0), updated_at = NOW()
            FROM prev
            WHERE p.place_id = $1
            RETURNING p.going AS going, prev.going AS previous
            "#,
        )
        .bind(place_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let previous: i64 = row.try_get("previous")?;
        Ok(Some(Decrement {
            going: row.try_get("going")?,
            clamped: previous <= 0,
        }))
    }
}
