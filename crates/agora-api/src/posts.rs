use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::models::PostFilter;
use agora_types::api::{
    Claims, CreatePostRequest, DataResponse, PageResponse, UpdatePostRequest,
};
use agora_types::models::{PostSort, SortOrder};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::json::Json;

const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, rename = "sortBy")]
    pub sort_by: PostSort,
    #[serde(default)]
    pub order: SortOrder,
    /// Filter by author id.
    pub author: Option<String>,
    /// Case-insensitive substring match over title and content.
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

fn validate_post_body(title: &str, content: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::Validation(
            "Title can not be more than 100 characters".into(),
        ));
    }
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }
    Ok(())
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_post_body(&req.title, &req.content)?;

    let post_id = Uuid::new_v4().to_string();

    let db = state.clone();
    let author_id = claims.sub.to_string();
    let id = post_id.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.insert_post(&id, &req.title, &req.content, &author_id)?;
        db.db.get_post(&id)
    })
    .await??
    .ok_or_else(|| anyhow::anyhow!("Post {post_id} vanished after insert"))?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(convert::post_data(row))),
    ))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let filter = PostFilter {
        author: query.author,
        search: query.search,
        sort: query.sort_by,
        order: query.order,
        limit,
        offset: (page - 1) * limit,
    };

    let db = state.clone();
    let (rows, total) = tokio::task::spawn_blocking(move || db.db.list_posts(&filter)).await??;

    let posts: Vec<_> = rows.into_iter().map(convert::post_data).collect();
    Ok(Json(PageResponse::new(posts, total, page, limit)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let pid = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_post(&pid))
        .await??
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(DataResponse::new(convert::post_data(row))))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_post_body(&req.title, &req.content)?;

    let db = state.clone();
    let pid = id.to_string();
    let existing = tokio::task::spawn_blocking(move || db.db.get_post(&pid))
        .await??
        .ok_or(ApiError::NotFound("Post"))?;

    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::NotOwner("post"));
    }

    let db = state.clone();
    let pid = id.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db.update_post(&pid, &req.title, &req.content)?;
        db.db.get_post(&pid)
    })
    .await??
    .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(DataResponse::new(convert::post_data(row))))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let pid = id.to_string();
    let existing = tokio::task::spawn_blocking(move || db.db.get_post(&pid))
        .await??
        .ok_or(ApiError::NotFound("Post"))?;

    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::NotOwner("post"));
    }

    let db = state.clone();
    let pid = id.to_string();
    tokio::task::spawn_blocking(move || db.db.delete_post_cascade(&pid)).await??;

    Ok(Json(DataResponse::new(serde_json::json!({}))))
}
