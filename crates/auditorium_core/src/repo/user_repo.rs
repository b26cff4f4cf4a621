//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Emails are stored normalized; at most one active user owns an email.
//! - Soft-deleted users are invisible to lookups but keep their rows so
//!   hosted conferences and registrations stay readable.

use super::{classify_write_error, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::user::{normalize_email, User, UserId, UserRole};
use crate::model::now_epoch_ms;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    role,
    bio,
    created_at,
    updated_at
FROM users";

/// Repository interface for account records.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Persists `name`, `bio` and `updated_at` of an existing user.
    fn update_user(&self, user: &User) -> RepoResult<()>;
    fn soft_delete_user(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        self.conn
            .execute(
                "INSERT INTO users (id, name, email, role, bio, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    user.id.to_string(),
                    user.name,
                    normalize_email(&user.email),
                    user.role.as_str(),
                    user.bio,
                    user.created_at,
                    user.updated_at,
                ],
            )
            .map_err(|err| classify_write_error(err, "email", "user"))?;

        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_user_row(row)))
            .optional()?;
        row.transpose()
    }

    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE email = ?1 AND deleted_at IS NULL;");
        let row = self
            .conn
            .query_row(&sql, [normalize_email(email)], |row| Ok(parse_user_row(row)))
            .optional()?;
        row.transpose()
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        let changed = self.conn.execute(
            "UPDATE users
             SET name = ?1, bio = ?2, updated_at = ?3
             WHERE id = ?4 AND deleted_at IS NULL;",
            params![user.name, user.bio, user.updated_at, user.id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        Ok(())
    }

    fn soft_delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL;",
            params![now_epoch_ms(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "user", id });
        }
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    let user = User {
        id: parse_uuid(&id_text, "users.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        bio: row.get("bio")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    user.validate()?;
    Ok(user)
}
