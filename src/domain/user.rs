use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Full user row. Never serialized directly; responses go through
/// [`PublicUser`], which carries no credential or storage-key material.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub profile_picture_url: Option<String>,
    pub profile_picture_key: Option<String>,
    pub cover_photo_url: Option<String>,
    pub cover_photo_key: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_photo: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    /// Whether the authenticated viewer follows this profile. Absent when
    /// there is no viewer context (e.g. own profile, listings).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    /// Zero-count view of a user row; right for freshly registered accounts,
    /// use the directory lookup when real counts matter.
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            bio: user.bio,
            location: user.location,
            website: user.website,
            profile_picture: user.profile_picture_url,
            cover_photo: user.cover_photo_url,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            is_following: None,
            created_at: user.created_at,
        }
    }
}
