//! # User Repository
//!
//! Login accounts and role grants.
//!
//! Passwords are stored as argon2 PHC strings
//! (`$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`); the plain password
//! never reaches the database or the logs.

use chrono::{DateTime, Utc};
use clinic_core::{generate_id, parse_roles, NewUser, Role, UserAccount};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// Row shape of the `users` table, including the hash.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Roles granted to an email. Unknown role labels are skipped with a
    /// warning; an unknown email yields an empty list.
    pub async fn roles_for(&self, email: &str) -> DbResult<Vec<Role>> {
        let labels: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE email = ?1 ORDER BY role")
            .bind(email.trim())
            .fetch_all(&self.pool)
            .await?;

        let (roles, unknown) = parse_roles(labels.iter().map(String::as_str));
        if !unknown.is_empty() {
            warn!(email = %email, unknown = ?unknown, "Skipping unrecognised roles");
        }

        debug!(email = %email, roles = ?roles, "Resolved roles");
        Ok(roles)
    }

    /// Grants a role. Granting twice is a no-op.
    pub async fn grant_role(&self, email: &str, role: Role) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_roles (email, role) VALUES (?1, ?2)")
            .bind(email.trim())
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Creates an account and grants its roles in one transaction.
    pub async fn create(&self, user: &NewUser) -> DbResult<UserAccount> {
        let email = user.email.trim().to_lowercase();
        let password_hash = hash_password(&user.password)?;
        let account = UserAccount {
            id: generate_id(),
            email: email.clone(),
            name: user.name.trim().to_string(),
            roles: user.roles.clone(),
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.name)
        .bind(&password_hash)
        .bind(account.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &email),
            other => other,
        })?;

        for role in &account.roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (email, role) VALUES (?1, ?2)")
                .bind(&account.email)
                .bind(*role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(email = %account.email, roles = ?account.roles, "User created");
        Ok(account)
    }

    /// Returns the account when the password matches.
    ///
    /// Unknown email and wrong password both return `Ok(None)`.
    pub async fn authenticate(&self, email: &str, password: &str) -> DbResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?1")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!(email = %email, "Sign-in for unknown user");
            return Ok(None);
        };

        if !verify_password(password, &row.password_hash) {
            warn!(email = %email, "Password mismatch");
            return Ok(None);
        }

        let roles = self.roles_for(&row.email).await?;
        Ok(Some(UserAccount {
            id: row.id,
            email: row.email,
            name: row.name,
            roles,
            created_at: row.created_at,
        }))
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Verify a password against its stored hash.
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-phc-string"));
    }
}
