//! Like and comment tests
//!
//! Toggle parity, append-only comment ordering, and liveness checks.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Likes
// ===========================================================================

#[tokio::test]
async fn like_then_unlike_restores_the_set() {
    let app = app().await;
    let alice = app.create_user("like_author").await;
    let bob = app.create_user("like_toggler").await;
    let post_id = app.create_post_for_user(alice.id, "like me").await;

    let liked = app
        .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
        .await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.json()["message"], "Post liked");
    let likes = liked.json()["data"]["post"]["likes"].as_array().unwrap().clone();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0]["user"]["id"], bob.id.to_string());
    assert_eq!(likes[0]["user"]["name"], bob.name);

    let unliked = app
        .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
        .await;
    assert_eq!(unliked.status, StatusCode::OK);
    assert_eq!(unliked.json()["message"], "Post unliked");
    assert_eq!(
        unliked.json()["data"]["post"]["likes"].as_array().unwrap().len(),
        0
    );
}

#[tokio::test]
async fn toggle_parity_over_many_applications() {
    let app = app().await;
    let alice = app.create_user("parity_author").await;
    let bob = app.create_user("parity_toggler").await;
    let post_id = app.create_post_for_user(alice.id, "toggle target").await;

    // Odd number of toggles leaves exactly one like for bob.
    for _ in 0..5 {
        let resp = app
            .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
    }
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM likes WHERE post_id = $1 AND user_id = $2",
    )
    .bind(post_id)
    .bind(bob.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);

    // One more toggle restores the original state.
    app.post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
        .await;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn likes_from_different_users_accumulate() {
    let app = app().await;
    let alice = app.create_user("multi_like_author").await;
    let bob = app.create_user("multi_like_b").await;
    let carol = app.create_user("multi_like_c").await;
    let post_id = app.create_post_for_user(alice.id, "popular").await;

    app.post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
        .await;
    let resp = app
        .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&carol.token))
        .await;

    assert_eq!(
        resp.json()["data"]["post"]["likes"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn like_missing_or_deleted_post() {
    let app = app().await;
    let user = app.create_user("like_missing").await;

    let missing = app
        .post_json(
            &format!("/posts/{}/like", Uuid::new_v4()),
            json!({}),
            Some(&user.token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error_message(), "Post not found");

    let post_id = app.create_post_for_user(user.id, "soon gone").await;
    app.delete(&format!("/posts/{}", post_id), Some(&user.token)).await;

    let deleted = app
        .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&user.token))
        .await;
    assert_eq!(deleted.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Comments
// ===========================================================================

#[tokio::test]
async fn comments_append_in_call_order_and_trim() {
    let app = app().await;
    let alice = app.create_user("comment_author").await;
    let bob = app.create_user("comment_writer").await;
    let post_id = app.create_post_for_user(alice.id, "discuss").await;

    for content in ["first", "  second  ", "third"] {
        let resp = app
            .post_json(
                &format!("/posts/{}/comments", post_id),
                json!({ "content": content }),
                Some(&bob.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.json()["message"], "Comment added successfully");
    }

    let resp = app.get(&format!("/posts/{}", post_id), Some(&alice.token)).await;
    let comments = resp.json()["data"]["post"]["comments"]
        .as_array()
        .unwrap()
        .clone();

    let contents: Vec<&str> = comments
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert!(comments
        .iter()
        .all(|c| c["user"]["id"] == bob.id.to_string()));
}

#[tokio::test]
async fn empty_comment_is_rejected_before_mutation() {
    let app = app().await;
    let user = app.create_user("comment_empty").await;
    let post_id = app.create_post_for_user(user.id, "quiet").await;

    for content in ["", "   "] {
        let resp = app
            .post_json(
                &format!("/posts/{}/comments", post_id),
                json!({ "content": content }),
                Some(&user.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_message(), "Comment content is required");
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn comment_on_deleted_post_fails() {
    let app = app().await;
    let user = app.create_user("comment_deleted").await;
    let post_id = app.create_post_for_user(user.id, "going away").await;
    app.delete(&format!("/posts/{}", post_id), Some(&user.token)).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", post_id),
            json!({ "content": "too late" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "Post not found");
}

#[tokio::test]
async fn any_authenticated_user_may_engage() {
    let app = app().await;
    let alice = app.create_user("engage_author").await;
    let bob = app.create_user("engage_stranger").await;
    let post_id = app.create_post_for_user(alice.id, "open to all").await;

    // bob is not the author; both interactions must succeed.
    let like = app
        .post_json(&format!("/posts/{}/like", post_id), json!({}), Some(&bob.token))
        .await;
    assert_eq!(like.status, StatusCode::OK);

    let comment = app
        .post_json(
            &format!("/posts/{}/comments", post_id),
            json!({ "content": "stranger says hi" }),
            Some(&bob.token),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);
}
