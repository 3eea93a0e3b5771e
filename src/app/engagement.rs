use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::app::posts::load_post_views;
use crate::domain::post::PostView;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub post: PostView,
    /// True when the toggle added a like, false when it removed one.
    pub liked: bool,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Like when no like by this user exists, unlike otherwise. Both arms
    /// are single targeted statements keyed by (post, user), so concurrent
    /// toggles from different users cannot lose each other's rows.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<LikeOutcome>> {
        if !self.post_is_active(post_id).await? {
            return Ok(None);
        }

        let inserted = sqlx::query(
            "INSERT INTO likes (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?
        .rows_affected()
            > 0;

        if !inserted {
            sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(self.db.pool())
                .await?;
        }

        let post = load_post_views(&self.db, &[post_id])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("post {} missing after like toggle", post_id))?;

        Ok(Some(LikeOutcome {
            post,
            liked: inserted,
        }))
    }

    /// Append one comment. Content arrives already trimmed and non-empty;
    /// insertion order is total via (created_at, id).
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<PostView>> {
        if !self.post_is_active(post_id).await? {
            return Ok(None);
        }

        sqlx::query("INSERT INTO comments (post_id, user_id, content) VALUES ($1, $2, $3)")
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .execute(self.db.pool())
            .await?;

        let post = load_post_views(&self.db, &[post_id])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("post {} missing after comment", post_id))?;

        Ok(Some(post))
    }

    async fn post_is_active(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1 AND is_active)")
                .bind(post_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }
}
