//! The cafe registry: every read and write against the `cafes` table.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::cafe::{format_timestamp, now_local, revisit_cutoff};
use crate::models::{Cafe, CafeInput, CafeView};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cafe {0} not found")]
    NotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Borrowed view over the pool. Each call checks out one pooled connection
/// and returns it when the statement finishes.
pub struct CafeRegistry<'a> {
    db: &'a SqlitePool,
}

impl<'a> CafeRegistry<'a> {
    pub fn new(db: &'a SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list_with_status(&self) -> Result<Vec<CafeView>> {
        self.list_with_status_at(now_local()).await
    }

    pub async fn list_with_status_at(&self, now: NaiveDateTime) -> Result<Vec<CafeView>> {
        let cafes: Vec<Cafe> =
            sqlx::query_as("SELECT id, name, url, last_visited FROM cafes ORDER BY id")
                .fetch_all(self.db)
                .await?;

        Ok(cafes.into_iter().map(|cafe| CafeView::new(cafe, now)).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Cafe>> {
        let cafe = sqlx::query_as("SELECT id, name, url, last_visited FROM cafes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db)
            .await?;
        Ok(cafe)
    }

    /// Inserts a never-visited cafe. Blank input is rejected earlier, by `CafeInput::parse`.
    pub async fn add(&self, input: &CafeInput) -> Result<Cafe> {
        let cafe: Cafe = sqlx::query_as(
            "INSERT INTO cafes (name, url) VALUES (?, ?) RETURNING id, name, url, last_visited",
        )
        .bind(&input.name)
        .bind(&input.url)
        .fetch_one(self.db)
        .await?;

        tracing::info!(id = cafe.id, name = %cafe.name, "added cafe");
        Ok(cafe)
    }

    pub async fn update(&self, id: i64, input: &CafeInput) -> Result<()> {
        let result = sqlx::query("UPDATE cafes SET name = ?, url = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.url)
            .bind(id)
            .execute(self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound(id));
        }
        tracing::info!(id, name = %input.name, "updated cafe");
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cafes WHERE id = ?")
            .bind(id)
            .execute(self.db)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(id, "deleted cafe");
        } else {
            tracing::debug!(id, "delete of missing cafe ignored");
        }
        Ok(deleted)
    }

    pub async fn mark_visited(&self, id: i64) -> Result<bool> {
        self.mark_visited_at(id, now_local()).await
    }

    /// Sets `last_visited` to `now` unless a later visit is already stored.
    /// An unreadable stored value is overwritten.
    /// Returns whether the cafe exists.
    pub async fn mark_visited_at(&self, id: i64, now: NaiveDateTime) -> Result<bool> {
        let stamp = format_timestamp(now);

        let result = sqlx::query(
            r#"
            UPDATE cafes
            SET last_visited = CASE
                WHEN last_visited IS NULL
                    OR datetime(last_visited) IS NOT last_visited
                    OR last_visited < ? THEN ?
                ELSE last_visited
            END
            WHERE id = ?
            "#,
        )
        .bind(&stamp)
        .bind(&stamp)
        .bind(id)
        .execute(self.db)
        .await?;

        let found = result.rows_affected() > 0;
        if found {
            tracing::info!(id, last_visited = %stamp, "marked cafe visited");
        } else {
            tracing::debug!(id, "mark visited of missing cafe ignored");
        }
        Ok(found)
    }

    pub async fn pick_random_unvisited(&self) -> Result<Option<Cafe>> {
        self.pick_random_unvisited_at(now_local()).await
    }

    /// Chooses one cafe not visited since `now - 7 days`, uniformly at random,
    /// and stamps it visited in the same statement.
    ///
    /// A stored value that is not a canonical timestamp counts as never
    /// visited, matching `Cafe::last_visited_at`.
    pub async fn pick_random_unvisited_at(&self, now: NaiveDateTime) -> Result<Option<Cafe>> {
        let stamp = format_timestamp(now);
        let cutoff = format_timestamp(revisit_cutoff(now));

        let picked: Option<Cafe> = sqlx::query_as(
            r#"
            UPDATE cafes
            SET last_visited = ?
            WHERE id = (
                SELECT id FROM cafes
                WHERE last_visited IS NULL
                    OR datetime(last_visited) IS NOT last_visited
                    OR last_visited < ?
                ORDER BY random()
                LIMIT 1
            )
            RETURNING id, name, url, last_visited
            "#,
        )
        .bind(&stamp)
        .bind(&cutoff)
        .fetch_optional(self.db)
        .await?;

        match &picked {
            Some(cafe) => tracing::info!(id = cafe.id, name = %cafe.name, "picked cafe"),
            None => tracing::info!(cutoff = %cutoff, "no cafe eligible for a pick"),
        }
        Ok(picked)
    }
}
