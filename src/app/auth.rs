use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

const TOKEN_ISSUER: &str = "ripple";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature, format, or claim content is wrong.
    Invalid,
    /// Well-formed and correctly signed, but past its expiry.
    Expired,
}

/// Issue a session token carrying the user id as its subject. Pure: signing
/// only, no I/O. Expiry may lie in the past (useful for tests).
pub fn issue_session_token(key: &[u8; 32], user_id: Uuid, ttl: Duration) -> Result<String> {
    let key = SymmetricKey::<V4>::from(key)?;
    let mut claims = Claims::new()?;
    claims.issuer(TOKEN_ISSUER)?;
    claims.audience(TOKEN_ISSUER)?;
    claims.subject(&user_id.to_string())?;
    let expires_at = (OffsetDateTime::now_utc() + ttl).format(&Rfc3339)?;
    claims.expiration(&expires_at)?;
    Ok(local::encrypt(&key, &claims, None, None)?)
}

/// Verify a session token and extract the user id. Pure function of the
/// token and key. Expiry surfaces as a claim-validation failure, which is
/// how [`TokenError::Expired`] is told apart from a bad signature or format.
pub fn verify_session_token(key: &[u8; 32], token: &str) -> Result<Uuid, TokenError> {
    let key = SymmetricKey::<V4>::from(key).map_err(|_| TokenError::Invalid)?;
    let mut rules = ClaimsValidationRules::new();
    rules.validate_issuer_with(TOKEN_ISSUER);
    rules.validate_audience_with(TOKEN_ISSUER);

    let untrusted =
        UntrustedToken::<Local, V4>::try_from(token).map_err(|_| TokenError::Invalid)?;
    let trusted = local::decrypt(&key, &untrusted, &rules, None, None).map_err(|err| match err {
        pasetors::errors::Error::ClaimValidation(_) => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    trusted
        .payload_claims()
        .and_then(|claims| claims.get_claim("sub"))
        .and_then(|value| value.as_str())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(TokenError::Invalid)
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
}

impl AuthService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
        bio: Option<String>,
    ) -> Result<User> {
        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (name, email, password_hash, bio) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, password_hash, bio, location, website, \
                       profile_picture_url, profile_picture_key, \
                       cover_photo_url, cover_photo_key, is_active, created_at",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(bio.unwrap_or_default())
        .fetch_one(self.db.pool())
        .await?;

        Ok(user_from_row(&row))
    }

    /// Match credentials against active users only; a deactivated account
    /// fails exactly like a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, bio, location, website, \
                    profile_picture_url, profile_picture_key, \
                    cover_photo_url, cover_photo_key, is_active, created_at \
             FROM users WHERE email = $1 AND is_active",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user = user_from_row(&row);
        if !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Load a user regardless of activation state; the authorization gate
    /// distinguishes a missing row from a deactivated one.
    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, bio, location, website, \
                    profile_picture_url, profile_picture_key, \
                    cover_photo_url, cover_photo_key, is_active, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        bio: row.get("bio"),
        location: row.get("location"),
        website: row.get("website"),
        profile_picture_url: row.get("profile_picture_url"),
        profile_picture_key: row.get("profile_picture_key"),
        cover_photo_url: row.get("cover_photo_url"),
        cover_photo_key: row.get("cover_photo_key"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
