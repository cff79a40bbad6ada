//! Movies repository
//!
//! - insert: single `INSERT ... RETURNING id`, id assigned by the database
//! - list: unfiltered scan, streamed row by row; any decode failure
//!   aborts the whole result
//!
//! Each statement runs in its own transaction whose `statement_timeout`
//! is the deadline's remaining time, so the server cancels the statement
//! itself rather than finishing work the client stopped waiting for.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::context::{Deadline, DeadlineExceeded};

/// Table every query targets
pub const TABLE: &str = "movies";

/// PostgreSQL `query_canceled`, raised when `statement_timeout` fires
const QUERY_CANCELED: &str = "57014";

/// Movie record from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Movie {
    pub id: i64,
    pub movie: String,
    pub created_at: DateTime<Utc>,
}

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to insert movie: {0}")]
    Insert(#[source] sqlx::Error),

    #[error("failed to get movies: {0}")]
    Query(#[source] sqlx::Error),

    #[error("failed to scan row: {0}")]
    Scan(#[source] sqlx::Error),

    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// Access to persisted movie records.
///
/// Implementations must stop waiting once `deadline` passes and return
/// [`DbError::DeadlineExceeded`].
#[async_trait]
pub trait MovieStore: Send + Sync + 'static {
    /// Persist a title and return its assigned id.
    async fn insert(&self, deadline: Deadline, title: &str) -> Result<i64, DbError>;

    /// Every stored record, in the database's scan order.
    async fn list_all(&self, deadline: Deadline) -> Result<Vec<Movie>, DbError>;

    /// Attributes identifying the backing datastore, attached to every
    /// datastore span.
    fn span_attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// [`MovieStore`] backed by the shared PostgreSQL pool
#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
    namespace: Option<String>,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            namespace: None,
        }
    }

    /// Database name reported as `db.namespace` on spans.
    pub fn with_namespace(mut self, database: impl Into<String>) -> Self {
        self.namespace = Some(database.into());
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Open a transaction whose statements the server cancels once
    /// `deadline` has passed.
    async fn begin_bounded(&self, deadline: &Deadline) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let millis = deadline.remaining().as_millis().max(1);
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(millis.to_string())
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    async fn insert_bounded(&self, deadline: &Deadline, title: &str) -> Result<i64, DbError> {
        let fail = |e: sqlx::Error| classify(e, deadline, DbError::Insert);

        let mut tx = self.begin_bounded(deadline).await.map_err(fail)?;
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO movies (movie) VALUES ($1) RETURNING id")
            .bind(title)
            .fetch_one(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        Ok(id)
    }

    async fn scan_all(&self, deadline: &Deadline) -> Result<Vec<Movie>, DbError> {
        let fail = |e: sqlx::Error| classify(e, deadline, DbError::Query);

        let mut tx = self.begin_bounded(deadline).await.map_err(fail)?;
        let mut movies = Vec::new();
        {
            let mut rows = sqlx::query("SELECT id, movie, created_at FROM movies").fetch(&mut *tx);
            while let Some(row) = rows.try_next().await.map_err(fail)? {
                movies.push(Movie::from_row(&row).map_err(DbError::Scan)?);
            }
        }
        tx.commit().await.map_err(fail)?;

        Ok(movies)
    }
}

/// A server-side statement timeout is the same failure as the client
/// deadline firing.
fn classify(err: sqlx::Error, deadline: &Deadline, wrap: fn(sqlx::Error) -> DbError) -> DbError {
    let canceled = err
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == QUERY_CANCELED);

    if canceled {
        DbError::DeadlineExceeded(DeadlineExceeded {
            budget: deadline.budget(),
        })
    } else {
        wrap(err)
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn insert(&self, deadline: Deadline, title: &str) -> Result<i64, DbError> {
        let id = deadline.run(self.insert_bounded(&deadline, title)).await??;

        tracing::info!(movie_id = id, "Inserted movie");
        Ok(id)
    }

    async fn list_all(&self, deadline: Deadline) -> Result<Vec<Movie>, DbError> {
        let movies = deadline.run(self.scan_all(&deadline)).await??;

        tracing::debug!(count = movies.len(), "Listed movies");
        Ok(movies)
    }

    fn span_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = vec![("db.system", "postgresql".to_string())];
        if let Some(namespace) = &self.namespace {
            attributes.push(("db.namespace", namespace.clone()));
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::{DbConfig, PoolSettings};
    use crate::db::pool::connect;

    async fn store() -> PgMovieStore {
        let config = DbConfig::from_env().expect("DB_* variables required");
        let pool = connect(&config, &PoolSettings::default())
            .await
            .expect("pool creation failed");
        sqlx::raw_sql(include_str!("../../sql/schema.sql"))
            .execute(&pool)
            .await
            .expect("schema failed");
        PgMovieStore::new(pool)
    }

    #[test]
    fn movie_serializes_with_wire_names() {
        let movie = Movie {
            id: 7,
            movie: "Alien".into(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["movie"], "Alien");
        assert_eq!(value["created_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn deadline_error_mentions_deadline() {
        let err = DbError::from(DeadlineExceeded {
            budget: Duration::from_secs(3),
        });
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn insert_then_list_contains_title() {
        let store = store().await;
        let deadline = Deadline::after(Duration::from_secs(3));

        let id = store.insert(deadline, "The Thing").await.unwrap();
        let movies = store.list_all(Deadline::after(Duration::from_secs(10))).await.unwrap();

        let found = movies.iter().find(|m| m.id == id).expect("inserted row missing");
        assert_eq!(found.movie, "The Thing");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_inserts_get_distinct_ids() {
        let store = store().await;

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(Deadline::after(Duration::from_secs(3)), &format!("movie-{i}"))
                        .await
                        .expect("concurrent insert failed")
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("task panicked"));
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    async fn row_count(store: &PgMovieStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn span_attributes_name_system_and_database() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy_with(sqlx::postgres::PgConnectOptions::new());
        let store = PgMovieStore::new(pool).with_namespace("moviedb");

        let attributes = store.span_attributes();
        assert!(attributes.contains(&("db.system", "postgresql".to_string())));
        assert!(attributes.contains(&("db.namespace", "moviedb".to_string())));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn blocked_insert_is_cancelled_and_commits_nothing() {
        let store = store().await;
        let before = row_count(&store).await;

        // Hold a lock so the INSERT reaches the server and waits there
        let mut blocker = store.pool().begin().await.unwrap();
        sqlx::query("LOCK TABLE movies IN ACCESS EXCLUSIVE MODE")
            .execute(&mut *blocker)
            .await
            .unwrap();

        let err = store
            .insert(Deadline::after(Duration::from_millis(500)), "never stored")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DeadlineExceeded(_)));

        blocker.rollback().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(row_count(&store).await, before);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn statement_timeout_maps_to_deadline_exceeded() {
        let store = store().await;
        let deadline = Deadline::after(Duration::from_secs(5));

        // Server-side cancellation well before the client deadline
        let mut tx = store.pool().begin().await.unwrap();
        sqlx::query("SET LOCAL statement_timeout = 100")
            .execute(&mut *tx)
            .await
            .unwrap();
        let err = sqlx::query("SELECT pg_sleep(2)")
            .execute(&mut *tx)
            .await
            .unwrap_err();

        let mapped = classify(err, &deadline, DbError::Query);
        assert!(matches!(mapped, DbError::DeadlineExceeded(_)));
        assert!(mapped.to_string().contains("deadline exceeded"));
    }
}
