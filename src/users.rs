// 🔐 Users - credential storage for the sign-in gate
//
// Passwords are stored as argon2 PHC strings. There is no self-registration;
// accounts are provisioned from the CLI.

use crate::error::{Error, Result};
use crate::schema::ValidationError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created: DateTime<Utc>,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Create a user with a freshly hashed password.
pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(Error::Validation(vec![ValidationError::new(
            if username.is_empty() { "username" } else { "password" },
            "Required field is empty",
            "User",
        )]));
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        created: Utc::now(),
    };
    let password_hash = hash_password(password)?;

    conn.execute(
        "INSERT INTO users (id, username, password_hash, created) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.id.to_string(),
            user.username,
            password_hash,
            user.created.to_rfc3339()
        ],
    )?;

    info!(username = %user.username, "created user");
    Ok(user)
}

/// A stored user and its password hash, not yet checked.
///
/// Read it under the connection lock; call [`Credential::verify`] after releasing it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: User,
    password_hash: String,
}

impl Credential {
    /// `Ok(None)` means the password does not match.
    pub fn verify(self, password: &str) -> Result<Option<User>> {
        if !verify_password(password, &self.password_hash)? {
            warn!(username = %self.user.username, "sign-in with wrong password");
            return Ok(None);
        }
        Ok(Some(self.user))
    }
}

/// Look up the credential for `username`. `Ok(None)` means no such user.
pub fn find_credential(conn: &Connection, username: &str) -> Result<Option<Credential>> {
    let row: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT id, username, password_hash, created FROM users WHERE username = ?1",
            [username.trim()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let Some((id, username, password_hash, created)) = row else {
        warn!(username, "sign-in for unknown user");
        return Ok(None);
    };

    let id = Uuid::parse_str(&id).map_err(|e| Error::internal(format!("bad user id: {e}")))?;
    let created = created
        .parse::<DateTime<Utc>>()
        .map_err(|e| Error::internal(format!("bad user timestamp: {e}")))?;

    Ok(Some(Credential {
        user: User {
            id,
            username,
            created,
        },
        password_hash,
    }))
}
