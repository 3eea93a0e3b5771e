use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::PublicUser;
use crate::infra::db::Db;

const PUBLIC_USER_COLUMNS: &str = "u.id, u.name, u.email, u.bio, u.location, u.website, \
     u.profile_picture_url, u.cover_photo_url, u.created_at, \
     (SELECT COUNT(*) FROM follows WHERE followee_id = u.id) AS followers_count, \
     (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count, \
     (SELECT COUNT(*) FROM posts WHERE author_id = u.id AND is_active) AS posts_count";

/// Which of the two profile images an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Picture,
    CoverPhoto,
}

/// A stored profile image: the public URL plus the storage key needed to
/// delete the object later. The key can be absent for externally-set URLs.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_users(&self, page: i64, limit: i64) -> Result<(Vec<PublicUser>, i64)> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users u WHERE u.is_active \
             ORDER BY u.created_at DESC, u.id DESC \
             OFFSET $1 LIMIT $2",
            PUBLIC_USER_COLUMNS
        ))
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
            .fetch_one(self.db.pool())
            .await?;

        let users = rows.iter().map(|row| public_user_from_row(row, None)).collect();
        Ok((users, total))
    }

    /// Fetch one active profile. With a viewer, the result also reports
    /// whether that viewer follows the profile (observation only; no
    /// follow/unfollow mutation exists here).
    pub async fn get_user(&self, user_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<PublicUser>> {
        let user = match viewer_id {
            Some(viewer_id) => sqlx::query(&format!(
                "SELECT {}, \
                     EXISTS(SELECT 1 FROM follows \
                            WHERE follower_id = $2 AND followee_id = u.id) AS is_following \
                 FROM users u WHERE u.id = $1 AND u.is_active",
                PUBLIC_USER_COLUMNS
            ))
            .bind(user_id)
            .bind(viewer_id)
            .fetch_optional(self.db.pool())
            .await?
            .map(|row| {
                let is_following: bool = row.get("is_following");
                public_user_from_row(&row, Some(is_following))
            }),
            None => sqlx::query(&format!(
                "SELECT {} FROM users u WHERE u.id = $1 AND u.is_active",
                PUBLIC_USER_COLUMNS
            ))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .map(|row| public_user_from_row(&row, None)),
        };

        Ok(user)
    }

    /// Partial update of the mutable profile fields. Absent fields are left
    /// alone; present fields overwrite, empty strings included — except
    /// `name`, where an empty value is silently ignored (existing clients
    /// rely on that).
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<PublicUser>> {
        let name = update.name.filter(|name| !name.is_empty());

        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 bio = COALESCE($3, bio), \
                 location = COALESCE($4, location), \
                 website = COALESCE($5, website) \
             WHERE id = $1 AND is_active \
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(update.bio)
        .bind(update.location)
        .bind(update.website)
        .fetch_optional(self.db.pool())
        .await?;

        match updated {
            Some(id) => self.get_user(id, None).await,
            None => Ok(None),
        }
    }

    pub async fn profile_image(
        &self,
        user_id: Uuid,
        image: ProfileImage,
    ) -> Result<Option<StoredImage>> {
        let sql = match image {
            ProfileImage::Picture => {
                "SELECT profile_picture_url AS url, profile_picture_key AS key \
                 FROM users WHERE id = $1 AND is_active"
            }
            ProfileImage::CoverPhoto => {
                "SELECT cover_photo_url AS url, cover_photo_key AS key \
                 FROM users WHERE id = $1 AND is_active"
            }
        };

        let row = sqlx::query(sql)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.and_then(|row| {
            let url: Option<String> = row.get("url");
            url.map(|url| StoredImage {
                url,
                key: row.get("key"),
            })
        }))
    }

    /// Persist a freshly uploaded image and hand back the previous storage
    /// key in the same statement, so the caller can clean up the old asset.
    pub async fn set_profile_image(
        &self,
        user_id: Uuid,
        image: ProfileImage,
        url: &str,
        key: &str,
    ) -> Result<Option<String>> {
        let sql = match image {
            ProfileImage::Picture => {
                "UPDATE users u \
                 SET profile_picture_url = $2, profile_picture_key = $3 \
                 FROM (SELECT id, profile_picture_key AS previous_key \
                       FROM users WHERE id = $1) prev \
                 WHERE u.id = prev.id AND u.is_active \
                 RETURNING prev.previous_key"
            }
            ProfileImage::CoverPhoto => {
                "UPDATE users u \
                 SET cover_photo_url = $2, cover_photo_key = $3 \
                 FROM (SELECT id, cover_photo_key AS previous_key \
                       FROM users WHERE id = $1) prev \
                 WHERE u.id = prev.id AND u.is_active \
                 RETURNING prev.previous_key"
            }
        };

        let previous: Option<Option<String>> = sqlx::query_scalar(sql)
            .bind(user_id)
            .bind(url)
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(previous.flatten())
    }

    pub async fn clear_profile_image(
        &self,
        user_id: Uuid,
        image: ProfileImage,
    ) -> Result<()> {
        let sql = match image {
            ProfileImage::Picture => {
                "UPDATE users SET profile_picture_url = NULL, profile_picture_key = NULL \
                 WHERE id = $1"
            }
            ProfileImage::CoverPhoto => {
                "UPDATE users SET cover_photo_url = NULL, cover_photo_key = NULL \
                 WHERE id = $1"
            }
        };

        sqlx::query(sql).bind(user_id).execute(self.db.pool()).await?;
        Ok(())
    }
}

fn public_user_from_row(row: &PgRow, is_following: Option<bool>) -> PublicUser {
    PublicUser {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        bio: row.get("bio"),
        location: row.get("location"),
        website: row.get("website"),
        profile_picture: row.get("profile_picture_url"),
        cover_photo: row.get("cover_photo_url"),
        followers_count: row.get("followers_count"),
        following_count: row.get("following_count"),
        posts_count: row.get("posts_count"),
        is_following,
        created_at: row.get("created_at"),
    }
}
