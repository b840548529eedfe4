//! Credential store: user identities and password verification.
//!
//! All credential checks go through here; nothing else reads the
//! `password_hash` column. Hashing and verification run on the blocking
//! pool alongside the query since PBKDF2 is deliberately slow.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Store, StoreError};
use crate::password;

/// A registered user. The hash never leaves the store layer's callers;
/// response types expose only `id` and `email`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn find_by_email_sync(conn: &Connection, email: &str) -> Result<Option<User>, StoreError> {
    let user = conn
        .query_row(
            "SELECT id, email, password_hash FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

impl Store {
    /// Create a new user, hashing the password with a fresh salt.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let conn = self.conn();
        let email = email.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let password_hash = password::hash_password(&password);
            let conn = conn.blocking_lock();
            if find_by_email_sync(&conn, &email)?.is_some() {
                return Err(StoreError::DuplicateEmail);
            }
            conn.execute(
                "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
                params![email, password_hash],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                email,
                password_hash,
            })
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Verify credentials, returning the user only on a match.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.conn();
        let email = email.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let user = {
                let conn = conn.blocking_lock();
                find_by_email_sync(&conn, &email)?
            };
            match user {
                Some(u) if password::verify_password(&password, &u.password_hash) => Ok(Some(u)),
                _ => Ok(None),
            }
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Look up a user by email without checking credentials.
    ///
    /// Used by the auth middleware to resolve a verified token subject.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn();
        let email = email.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            find_by_email_sync(&conn, &email)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// List every registered user (administrative).
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare("SELECT id, email, password_hash FROM users ORDER BY id")?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Delete a user by id, returning the deleted record.
    ///
    /// The user's tasks (and their subtasks) go with them via cascade.
    pub async fn delete_user(&self, id: i64) -> Result<User, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let user = tx
                .query_row(
                    "SELECT id, email, password_hash FROM users WHERE id = ?1",
                    params![id],
                    user_from_row,
                )
                .optional()?
                .ok_or(StoreError::UserNotFound)?;
            tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(user)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}
