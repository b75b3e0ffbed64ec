//! Operator account repository

use chrono::Utc;
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::User;

/// Operator account storage operations (async)
#[allow(async_fn_in_trait)]
pub trait UserRepository {
    /// Insert a new account; a duplicate email is a `Conflict`.
    async fn create(&self, email: &str, hashed_password: &str) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get(&self, id: i64) -> Result<User>;
}

/// libSQL implementation of `UserRepository`
pub struct LibSqlUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            hashed_password: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

const USER_COLUMNS: &str = "id, email, hashed_password, created_at";

impl UserRepository for LibSqlUserRepository<'_> {
    async fn create(&self, email: &str, hashed_password: &str) -> Result<User> {
        let now = Utc::now().timestamp_millis();
        // libsql defers execution of a RETURNING statement until the first
        // row is stepped, so the constraint error can surface at either await.
        let map_unique = |error: libsql::Error| {
            if error.to_string().contains("UNIQUE constraint failed") {
                Error::Conflict(format!("An account with email {email} already exists"))
            } else {
                error.into()
            }
        };

        let mut rows = self
            .conn
            .query(
                &format!(
                    "INSERT INTO users (email, hashed_password, created_at)
                     VALUES (?1, ?2, ?3)
                     RETURNING {USER_COLUMNS}"
                ),
                libsql::params![email, hashed_password, now],
            )
            .await
            .map_err(map_unique)?;

        match rows.next().await.map_err(map_unique)? {
            Some(row) => Self::parse_user(&row),
            None => Err(Error::NotFound("user insert returned no row".into())),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn get(&self, id: i64) -> Result<User> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_user(&row),
            None => Err(Error::NotFound(format!("User {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::db::Database;

    use super::*;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_find_by_email() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        let created = repo.create("ops@example.com", "$2b$10$hash").await.unwrap();
        assert_eq!(created.email, "ops@example.com");

        let found = repo.find_by_email("ops@example.com").await.unwrap();
        assert_eq!(found, Some(created.clone()));

        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_email_is_conflict() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        repo.create("ops@example.com", "hash-a").await.unwrap();
        let err = repo.create("ops@example.com", "hash-b").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // The email collation is case-insensitive.
        let err = repo.create("OPS@example.com", "hash-c").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_lookups() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        assert_eq!(repo.find_by_email("nobody@example.com").await.unwrap(), None);
        assert!(matches!(repo.get(404).await.unwrap_err(), Error::NotFound(_)));
    }
}
