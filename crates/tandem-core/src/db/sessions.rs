//! Login session repository

use std::time::Duration;

use chrono::Utc;
use libsql::Connection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Session;

/// Session storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    /// Open a session for the given user, valid for `ttl` from now.
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<Session>;

    async fn get(&self, id: &str) -> Result<Option<Session>>;

    /// Remove a session. Removing an unknown id is a no-op.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every session that expired at or before `now_ms`; returns the
    /// number of rows swept.
    async fn delete_expired(&self, now_ms: i64) -> Result<u64>;
}

/// libSQL implementation of `SessionRepository`
pub struct LibSqlSessionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_session(row: &libsql::Row) -> Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            created_at: row.get(2)?,
            expires_at: row.get(3)?,
        })
    }
}

impl SessionRepository for LibSqlSessionRepository<'_> {
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<Session> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let expires_at = now + i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        self.conn
            .execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![id.clone(), user_id, now, expires_at],
            )
            .await?;

        Ok(Session {
            id,
            user_id,
            created_at: now,
            expires_at,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", [id])
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now_ms: i64) -> Result<u64> {
        let swept = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", [now_ms])
            .await?;
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::db::users::{LibSqlUserRepository, UserRepository};
    use crate::db::Database;

    use super::*;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = LibSqlUserRepository::new(db.connection())
            .create("ops@example.com", "hash")
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_get_delete_round_trip() {
        let (db, user_id) = setup().await;
        let repo = LibSqlSessionRepository::new(db.connection());

        let session = repo
            .create(user_id, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
        assert!(session.expires_at > session.created_at);
        assert!(!session.is_expired(session.created_at));

        let fetched = repo.get(&session.id).await.unwrap();
        assert_eq!(fetched, Some(session.clone()));

        repo.delete(&session.id).await.unwrap();
        assert_eq!(repo.get(&session.id).await.unwrap(), None);

        // Deleting again is a no-op.
        repo.delete(&session.id).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_expired_sweeps_only_stale_rows() {
        let (db, user_id) = setup().await;
        let repo = LibSqlSessionRepository::new(db.connection());

        let stale = repo.create(user_id, Duration::from_secs(0)).await.unwrap();
        let live = repo
            .create(user_id, Duration::from_secs(3600))
            .await
            .unwrap();

        let swept = repo
            .delete_expired(stale.expires_at)
            .await
            .unwrap();
        assert_eq!(swept, 1);

        assert_eq!(repo.get(&stale.id).await.unwrap(), None);
        assert!(repo.get(&live.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deleting_user_cascades_sessions() {
        let (db, user_id) = setup().await;
        let repo = LibSqlSessionRepository::new(db.connection());

        let session = repo
            .create(user_id, Duration::from_secs(3600))
            .await
            .unwrap();

        db.connection()
            .execute("DELETE FROM users WHERE id = ?1", [user_id])
            .await
            .unwrap();

        assert_eq!(repo.get(&session.id).await.unwrap(), None);
    }
}
