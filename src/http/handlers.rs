use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::app::auth::{issue_session_token, AuthService};
use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::posts::PostService;
use crate::app::users::{ProfileImage, ProfileUpdate, UserService};
use crate::domain::post::PostView;
use crate::domain::user::PublicUser;
use crate::http::envelope::{Ack, Envelope, PageEnvelope, Pagination};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const MAX_PASSWORD_LEN: usize = 128;
const MAX_CONTENT_LEN: usize = 500;
const MAX_COMMENT_LEN: usize = 1000;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Lenient by contract: absent, non-numeric, or sub-1 values fall back to
/// the defaults rather than erroring.
fn page_params(query: &PageQuery) -> (i64, i64) {
    let page = query
        .page
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(DEFAULT_PAGE);
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|limit| *limit >= 1)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    (page, limit)
}

#[derive(Serialize)]
pub struct UserData {
    pub user: PublicUser,
}

#[derive(Serialize)]
pub struct UsersData {
    pub users: Vec<PublicUser>,
}

#[derive(Serialize)]
pub struct PostData {
    pub post: PostView,
}

#[derive(Serialize)]
pub struct PostsData {
    pub posts: Vec<PostView>,
}

#[derive(Serialize)]
pub struct ProfileImageData {
    pub user: PublicUser,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Session response: the token rides in the body as well as in the
/// httponly `jwt` cookie.
#[derive(Serialize)]
pub struct SessionEnvelope {
    pub status: &'static str,
    pub message: &'static str,
    pub token: String,
    pub data: UserData,
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let max_age = state.session_ttl_days * 24 * 60 * 60;
    let site = if state.secure_cookies {
        "Secure; SameSite=None"
    } else {
        "SameSite=Lax"
    };
    format!("jwt={}; Path=/; HttpOnly; Max-Age={}; {}", token, max_age, site)
}

fn issue_session(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    issue_session_token(
        &state.session_key,
        user_id,
        Duration::days(state.session_ttl_days as i64),
    )
    .map_err(|err| {
        tracing::error!(error = ?err, user_id = %user_id, "failed to issue session token");
        AppError::internal("failed to start session")
    })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name cannot be empty"));
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if payload.password.trim().len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(state.db.clone());
    let user = service
        .register(payload.name, payload.email, payload.password, payload.bio)
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if let Some(db_err) = sqlx_err.as_database_error() {
                    let duplicate_email = db_err.code().as_deref() == Some("23505")
                        && db_err.constraint().unwrap_or_default().contains("users_email_key");
                    if duplicate_email {
                        return AppError::bad_request("User with this email already exists");
                    }
                }
            }
            tracing::error!(error = ?err, "failed to register user");
            AppError::internal("failed to register user")
        })?;

    let token = issue_session(&state, user.id)?;
    let cookie = session_cookie(&state, &token);
    let body = SessionEnvelope {
        status: "success",
        message: "User registered successfully",
        token,
        data: UserData { user: user.into() },
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let service = AuthService::new(state.db.clone());
    let user = service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let directory = UserService::new(state.db.clone());
    let profile = directory
        .get_user(user.id, None)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to load profile at login");
            AppError::internal("failed to login")
        })?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let token = issue_session(&state, user.id)?;
    let cookie = session_cookie(&state, &token);
    let body = SessionEnvelope {
        status: "success",
        message: "Login successful",
        token,
        data: UserData { user: profile },
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// Sessions are stateless; logout just overwrites the cookie client-side.
pub async fn logout() -> impl IntoResponse {
    let cookie = "jwt=; Path=/; HttpOnly; Max-Age=0".to_string();
    (
        [(header::SET_COOKIE, cookie)],
        Json(Ack::new("Logged out successfully")),
    )
}

pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service
        .get_user(auth.user.id, None)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to fetch current user");
            AppError::internal("failed to fetch current user")
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(Envelope::data(UserData { user })))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

pub async fn list_feed(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<PostsData>>, AppError> {
    let (page, limit) = page_params(&query);

    let service = FeedService::new(state.db.clone());
    let feed = service.list_feed(page, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list feed");
        AppError::internal("failed to list feed")
    })?;

    let results = feed.posts.len();
    Ok(Json(PageEnvelope::new(
        PostsData { posts: feed.posts },
        results,
        Pagination::new(page, limit, feed.total),
    )))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::bad_request("content must be at most 500 characters"));
    }

    let service = PostService::new(state.db.clone());
    let post = service.create_post(auth.user.id, content).await.map_err(|err| {
        tracing::error!(error = ?err, author_id = %auth.user.id, "failed to create post");
        AppError::internal("failed to create post")
    })?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::message(
            "Post created successfully",
            PostData { post },
        )),
    ))
}

pub async fn get_post(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Envelope<PostData>>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service
        .get_feed_item(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok(Json(Envelope::data(PostData { post })))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

pub async fn update_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Envelope<PostData>>, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::bad_request("content must be at most 500 characters"));
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .update_content(id, auth.user.id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to update post");
            AppError::internal("failed to update post")
        })?
        // Absent and not-owned collapse into the same outcome on purpose.
        .ok_or_else(|| AppError::not_found("Post not found or unauthorized"))?;

    Ok(Json(Envelope::message(
        "Post updated successfully",
        PostData { post },
    )))
}

pub async fn delete_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Ack>, AppError> {
    let service = PostService::new(state.db.clone());
    let deleted = service.soft_delete(id, auth.user.id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        Ok(Json(Ack::new("Post deleted successfully")))
    } else {
        Err(AppError::not_found("Post not found or unauthorized"))
    }
}

pub async fn like_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Envelope<PostData>>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .toggle_like(id, auth.user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, user_id = %auth.user.id, "failed to toggle like");
            AppError::internal("failed to toggle like")
        })?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    let message = if outcome.liked { "Post liked" } else { "Post unliked" };
    Ok(Json(Envelope::message(message, PostData { post: outcome.post })))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn add_comment(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Comment content is required"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment must be at most 1000 characters"));
    }

    let service = EngagementService::new(state.db.clone());
    let post = service
        .add_comment(id, auth.user.id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, user_id = %auth.user.id, "failed to add comment");
            AppError::internal("failed to add comment")
        })?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::message(
            "Comment added successfully",
            PostData { post },
        )),
    ))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn list_users(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<UsersData>>, AppError> {
    let (page, limit) = page_params(&query);

    let service = UserService::new(state.db.clone());
    let (users, total) = service.list_users(page, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list users");
        AppError::internal("failed to list users")
    })?;

    let results = users.len();
    Ok(Json(PageEnvelope::new(
        UsersData { users },
        results,
        Pagination::new(page, limit, total),
    )))
}

pub async fn get_user(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service
        .get_user(id, Some(auth.user.id))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to fetch user");
            AppError::internal("failed to fetch user")
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(Envelope::data(UserData { user })))
}

pub async fn list_author_posts(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<PostsData>>, AppError> {
    let (page, limit) = page_params(&query);

    let service = FeedService::new(state.db.clone());
    let feed = service.list_by_author(id, page, limit).await.map_err(|err| {
        tracing::error!(error = ?err, author_id = %id, "failed to list author posts");
        AppError::internal("failed to list author posts")
    })?;

    let results = feed.posts.len();
    Ok(Json(PageEnvelope::new(
        PostsData { posts: feed.posts },
        results,
        Pagination::new(page, limit, feed.total),
    )))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(
            auth.user.id,
            ProfileUpdate {
                name: payload.name,
                bio: payload.bio,
                location: payload.location,
                website: payload.website,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(Envelope::message(
        "Profile updated successfully",
        UserData { user },
    )))
}

// ---------------------------------------------------------------------------
// Profile images
// ---------------------------------------------------------------------------

struct ImageSpec {
    image: ProfileImage,
    field_name: &'static str,
    key_prefix: &'static str,
    updated_message: &'static str,
    deleted_message: &'static str,
    missing_message: &'static str,
}

const PROFILE_PICTURE: ImageSpec = ImageSpec {
    image: ProfileImage::Picture,
    field_name: "profilePicture",
    key_prefix: "profile-pictures",
    updated_message: "Profile picture updated successfully",
    deleted_message: "Profile picture deleted successfully",
    missing_message: "No profile picture to delete",
};

const COVER_PHOTO: ImageSpec = ImageSpec {
    image: ProfileImage::CoverPhoto,
    field_name: "coverPhoto",
    key_prefix: "cover-photos",
    updated_message: "Cover photo updated successfully",
    deleted_message: "Cover photo deleted successfully",
    missing_message: "No cover photo to delete",
};

pub async fn upload_profile_picture(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Envelope<ProfileImageData>>, AppError> {
    upload_image(state, auth, multipart, &PROFILE_PICTURE).await
}

pub async fn delete_profile_picture(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Envelope<UserData>>, AppError> {
    remove_image(state, auth, &PROFILE_PICTURE).await
}

pub async fn upload_cover_photo(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Envelope<ProfileImageData>>, AppError> {
    upload_image(state, auth, multipart, &COVER_PHOTO).await
}

pub async fn delete_cover_photo(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Envelope<UserData>>, AppError> {
    remove_image(state, auth, &COVER_PHOTO).await
}

/// Upload an image and persist its URL and storage key. Nothing touches the
/// profile unless the upload itself succeeded; the replaced asset is removed
/// best-effort afterwards.
async fn upload_image(
    state: AppState,
    auth: AuthUser,
    mut multipart: Multipart,
    spec: &ImageSpec,
) -> Result<Json<Envelope<ProfileImageData>>, AppError> {
    let (bytes, content_type) =
        read_image_field(&mut multipart, spec.field_name, state.upload_max_bytes).await?;

    let extension = image_extension(&content_type)
        .ok_or_else(|| AppError::bad_request("unsupported image type"))?;
    let key = format!(
        "{}/{}/{}.{}",
        spec.key_prefix,
        auth.user.id,
        Uuid::new_v4(),
        extension
    );

    state
        .storage
        .put_object(&key, bytes, &content_type)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to upload image");
            AppError::internal("failed to upload image")
        })?;
    let url = state.storage.public_url(&key);

    let service = UserService::new(state.db.clone());
    let previous_key = service
        .set_profile_image(auth.user.id, spec.image, &url, &key)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to persist image");
            AppError::internal("failed to persist image")
        })?;

    if let Some(previous_key) = previous_key {
        if let Err(err) = state.storage.delete_object(&previous_key).await {
            tracing::warn!(error = ?err, key = %previous_key, "failed to delete replaced image");
        }
    }

    let user = service
        .get_user(auth.user.id, None)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to reload profile");
            AppError::internal("failed to persist image")
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(Envelope::message(
        spec.updated_message,
        ProfileImageData {
            user,
            image_url: url,
        },
    )))
}

/// Best-effort storage deletion, then clear the profile fields either way.
async fn remove_image(
    state: AppState,
    auth: AuthUser,
    spec: &ImageSpec,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let service = UserService::new(state.db.clone());
    let existing = service
        .profile_image(auth.user.id, spec.image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to load image state");
            AppError::internal("failed to delete image")
        })?
        .ok_or_else(|| AppError::bad_request(spec.missing_message))?;

    if let Some(key) = existing.key {
        if let Err(err) = state.storage.delete_object(&key).await {
            tracing::warn!(error = ?err, key = %key, "failed to delete stored image");
        }
    }

    service
        .clear_profile_image(auth.user.id, spec.image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to clear image");
            AppError::internal("failed to delete image")
        })?;

    let user = service
        .get_user(auth.user.id, None)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user.id, "failed to reload profile");
            AppError::internal("failed to delete image")
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(Envelope::message(
        spec.deleted_message,
        UserData { user },
    )))
}

async fn read_image_field(
    multipart: &mut Multipart,
    field_name: &str,
    max_bytes: i64,
) -> Result<(Bytes, String), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("invalid multipart body"))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("image content type is required"))?;
        if image_extension(&content_type).is_none() {
            return Err(AppError::bad_request("unsupported image type"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("failed to read image data"))?;
        if bytes.is_empty() {
            return Err(AppError::bad_request("No image file provided"));
        }
        if bytes.len() as i64 > max_bytes {
            return Err(AppError::bad_request("image exceeds the maximum upload size"));
        }

        return Ok((bytes, content_type));
    }

    Err(AppError::bad_request("No image file provided"))
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
