use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{CommentView, LikeView};

/// A post hydrated for display: author resolved, likes and comments
/// embedded with their user references resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: PostAuthor,
    pub content: String,
    pub likes: Vec<LikeView>,
    pub comments: Vec<CommentView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAuthor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}
