use anyhow::Result;
use uuid::Uuid;

use crate::app::posts::load_post_views;
use crate::domain::post::PostView;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub total: i64,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// One page of the global feed: live posts, newest first, with id as a
    /// stable tie-break so pagination stays deterministic under writes.
    pub async fn list_feed(&self, page: i64, limit: i64) -> Result<FeedPage> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE is_active \
             ORDER BY created_at DESC, id DESC \
             OFFSET $1 LIMIT $2",
        )
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE is_active")
            .fetch_one(self.db.pool())
            .await?;

        let posts = load_post_views(&self.db, &ids).await?;
        Ok(FeedPage { posts, total })
    }

    pub async fn list_by_author(&self, author_id: Uuid, page: i64, limit: i64) -> Result<FeedPage> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE author_id = $1 AND is_active \
             ORDER BY created_at DESC, id DESC \
             OFFSET $2 LIMIT $3",
        )
        .bind(author_id)
        .bind((page - 1) * limit)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1 AND is_active")
                .bind(author_id)
                .fetch_one(self.db.pool())
                .await?;

        let posts = load_post_views(&self.db, &ids).await?;
        Ok(FeedPage { posts, total })
    }
}
