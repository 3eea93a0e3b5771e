use std::collections::HashMap;

use anyhow::{anyhow, Result};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::engagement::{CommentView, CommentedBy, LikeView, LikedBy};
use crate::domain::post::{PostAuthor, PostView};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, author_id: Uuid, content: &str) -> Result<PostView> {
        let post_id: Uuid =
            sqlx::query_scalar("INSERT INTO posts (author_id, content) VALUES ($1, $2) RETURNING id")
                .bind(author_id)
                .bind(content)
                .fetch_one(self.db.pool())
                .await?;

        load_post_views(&self.db, &[post_id])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("post {} missing after insert", post_id))
    }

    pub async fn get_feed_item(&self, post_id: Uuid) -> Result<Option<PostView>> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 AND is_active")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        match id {
            Some(id) => Ok(load_post_views(&self.db, &[id]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Replace a post's content. The single statement conditions on both
    /// ownership and liveness, so a missing post and someone else's post are
    /// indistinguishable to the caller.
    pub async fn update_content(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Option<PostView>> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE posts SET content = $3, updated_at = now() \
             WHERE id = $1 AND author_id = $2 AND is_active \
             RETURNING id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        match updated {
            Some(id) => Ok(load_post_views(&self.db, &[id]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Flip the tombstone. The row and its likes/comments stay in place;
    /// every read path filters them out from here on.
    pub async fn soft_delete(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET is_active = FALSE \
             WHERE id = $1 AND author_id = $2 AND is_active",
        )
        .bind(post_id)
        .bind(author_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Hydrate posts for display: one query for the posts joined to their
/// authors, one for all likes, one for all comments. Posts come back newest
/// first with id as the tie-break, matching the feed ordering.
pub(crate) async fn load_post_views(db: &Db, post_ids: &[Uuid]) -> Result<Vec<PostView>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    let post_rows = sqlx::query(
        "SELECT p.id, p.content, p.created_at, p.updated_at, \
                u.id AS author_id, u.name AS author_name, u.email AS author_email, \
                u.bio AS author_bio, u.profile_picture_url AS author_picture \
         FROM posts p \
         JOIN users u ON u.id = p.author_id \
         WHERE p.id = ANY($1) \
         ORDER BY p.created_at DESC, p.id DESC",
    )
    .bind(post_ids)
    .fetch_all(db.pool())
    .await?;

    let like_rows = sqlx::query(
        "SELECT l.post_id, l.created_at, u.id AS user_id, u.name AS user_name \
         FROM likes l \
         JOIN users u ON u.id = l.user_id \
         WHERE l.post_id = ANY($1) \
         ORDER BY l.created_at, l.user_id",
    )
    .bind(post_ids)
    .fetch_all(db.pool())
    .await?;

    let comment_rows = sqlx::query(
        "SELECT c.post_id, c.id, c.content, c.created_at, \
                u.id AS user_id, u.name AS user_name, \
                u.profile_picture_url AS user_picture \
         FROM comments c \
         JOIN users u ON u.id = c.user_id \
         WHERE c.post_id = ANY($1) \
         ORDER BY c.created_at, c.id",
    )
    .bind(post_ids)
    .fetch_all(db.pool())
    .await?;

    let mut likes: HashMap<Uuid, Vec<LikeView>> = HashMap::new();
    for row in like_rows {
        likes.entry(row.get("post_id")).or_default().push(LikeView {
            user: LikedBy {
                id: row.get("user_id"),
                name: row.get("user_name"),
            },
            created_at: row.get("created_at"),
        });
    }

    let mut comments: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for row in comment_rows {
        comments
            .entry(row.get("post_id"))
            .or_default()
            .push(CommentView {
                id: row.get("id"),
                user: CommentedBy {
                    id: row.get("user_id"),
                    name: row.get("user_name"),
                    profile_picture: row.get("user_picture"),
                },
                content: row.get("content"),
                created_at: row.get("created_at"),
            });
    }

    let mut posts = Vec::with_capacity(post_rows.len());
    for row in post_rows {
        let id: Uuid = row.get("id");
        posts.push(PostView {
            id,
            author: PostAuthor {
                id: row.get("author_id"),
                name: row.get("author_name"),
                email: row.get("author_email"),
                bio: row.get("author_bio"),
                profile_picture: row.get("author_picture"),
            },
            content: row.get("content"),
            likes: likes.remove(&id).unwrap_or_default(),
            comments: comments.remove(&id).unwrap_or_default(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        });
    }

    Ok(posts)
}
