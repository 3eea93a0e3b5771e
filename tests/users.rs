//! User directory tests
//!
//! Listing, profile reads with follow-status observation, partial profile
//! updates, and the profile-image validation paths.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Listing and reads
// ===========================================================================

#[tokio::test]
async fn list_users_excludes_deactivated_and_credentials() {
    let app = app().await;
    let active = app.create_user("list_active").await;
    let inactive = app.create_user("list_inactive").await;
    app.deactivate_user(inactive.id).await;

    let resp = app.get("/users?limit=100", Some(&active.token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["status"], "success");
    let users = body["data"]["users"].as_array().unwrap().clone();
    assert_eq!(body["results"], users.len());

    assert!(users.iter().any(|u| u["id"] == active.id.to_string()));
    assert!(users.iter().all(|u| u["id"] != inactive.id.to_string()));

    // Credential material never leaves the server.
    for user in &users {
        let object = user.as_object().unwrap();
        assert!(!object.keys().any(|key| key.to_lowercase().contains("password")));
    }
}

#[tokio::test]
async fn get_user_reports_counts_and_follow_status() {
    let app = app().await;
    let alice = app.create_user("profile_alice").await;
    let bob = app.create_user("profile_bob").await;
    app.create_post_for_user(bob.id, "bob writes").await;
    app.follow(alice.id, bob.id).await;

    let viewed_by_alice = app
        .get(&format!("/users/{}", bob.id), Some(&alice.token))
        .await;
    assert_eq!(viewed_by_alice.status, StatusCode::OK);
    let user = &viewed_by_alice.json()["data"]["user"];
    assert_eq!(user["name"], bob.name);
    assert_eq!(user["followersCount"], 1);
    assert_eq!(user["postsCount"], 1);
    assert_eq!(user["isFollowing"], true);

    let viewed_by_bob = app
        .get(&format!("/users/{}", alice.id), Some(&bob.token))
        .await;
    let user = &viewed_by_bob.json()["data"]["user"];
    assert_eq!(user["followingCount"], 1);
    assert_eq!(user["isFollowing"], false);
}

#[tokio::test]
async fn get_missing_or_deactivated_user() {
    let app = app().await;
    let viewer = app.create_user("profile_viewer").await;

    let missing = app
        .get(&format!("/users/{}", Uuid::new_v4()), Some(&viewer.token))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error_message(), "User not found");

    let gone = app.create_user("profile_gone").await;
    app.deactivate_user(gone.id).await;
    let deactivated = app
        .get(&format!("/users/{}", gone.id), Some(&viewer.token))
        .await;
    assert_eq!(deactivated.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Profile updates
// ===========================================================================

#[tokio::test]
async fn update_profile_applies_partial_fields() {
    let app = app().await;
    let user = app.create_user("profile_partial").await;

    let resp = app
        .put_json(
            "/users/profile",
            json!({ "bio": "rustacean", "location": "Berlin" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["message"], "Profile updated successfully");

    // Omitted fields stay put.
    let resp = app
        .put_json(
            "/users/profile",
            json!({ "website": "https://example.com" }),
            Some(&user.token),
        )
        .await;
    let profile = resp.json()["data"]["user"].clone();
    assert_eq!(profile["bio"], "rustacean");
    assert_eq!(profile["location"], "Berlin");
    assert_eq!(profile["website"], "https://example.com");
}

#[tokio::test]
async fn empty_strings_overwrite_except_name() {
    let app = app().await;
    let user = app.create_user("profile_empties").await;

    app.put_json(
        "/users/profile",
        json!({ "bio": "will be cleared", "location": "somewhere" }),
        Some(&user.token),
    )
    .await;

    // Empty bio/location overwrite; empty name is silently ignored.
    let resp = app
        .put_json(
            "/users/profile",
            json!({ "name": "", "bio": "", "location": "" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let profile = resp.json()["data"]["user"].clone();
    assert_eq!(profile["name"], user.name);
    assert_eq!(profile["bio"], "");
    assert_eq!(profile["location"], "");
}

#[tokio::test]
async fn update_profile_applies_non_empty_name() {
    let app = app().await;
    let user = app.create_user("profile_rename").await;

    let resp = app
        .put_json(
            "/users/profile",
            json!({ "name": "Renamed User" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["user"]["name"], "Renamed User");
}

#[tokio::test]
async fn update_profile_requires_auth() {
    let app = app().await;

    let resp = app
        .put_json("/users/profile", json!({ "bio": "nope" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Profile images (validation paths; storage I/O is exercised manually)
// ===========================================================================

#[tokio::test]
async fn delete_image_without_one_set() {
    let app = app().await;
    let user = app.create_user("image_none").await;

    let picture = app.delete("/users/profile-picture", Some(&user.token)).await;
    assert_eq!(picture.status, StatusCode::BAD_REQUEST);
    assert_eq!(picture.error_message(), "No profile picture to delete");

    let cover = app.delete("/users/cover-photo", Some(&user.token)).await;
    assert_eq!(cover.status, StatusCode::BAD_REQUEST);
    assert_eq!(cover.error_message(), "No cover photo to delete");
}

#[tokio::test]
async fn upload_without_expected_field_is_rejected() {
    let app = app().await;
    let user = app.create_user("image_wrong_field").await;

    let resp = app
        .post_multipart(
            "/users/profile-picture",
            "somethingElse",
            "image/png",
            b"fake image bytes",
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "No image file provided");

    // Nothing was persisted.
    let url: Option<String> =
        sqlx::query_scalar("SELECT profile_picture_url FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert!(url.is_none());
}

#[tokio::test]
async fn upload_with_non_image_type_is_rejected() {
    let app = app().await;
    let user = app.create_user("image_bad_type").await;

    let resp = app
        .post_multipart(
            "/users/cover-photo",
            "coverPhoto",
            "text/plain",
            b"definitely not an image",
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unsupported image type");
}
