use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::models::CommentRow;
use agora_types::api::{Claims, CreateCommentRequest, DataResponse, PageResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::json::Json;

#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Comment content is required".into()));
    }
    Ok(())
}

pub async fn add_comment_to_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req.content)?;

    let comment_id = Uuid::new_v4().to_string();

    let db = state.clone();
    let author_id = claims.sub.to_string();
    let post_id = id.to_string();
    let cid = comment_id.clone();
    let row = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<CommentRow>> {
        if db.db.get_post(&post_id)?.is_none() {
            return Ok(None);
        }
        db.db.insert_comment(&cid, &req.content, &author_id, &post_id, None)?;
        let row = db
            .db
            .get_comment(&cid)?
            .ok_or_else(|| anyhow::anyhow!("Comment {cid} vanished after insert"))?;
        Ok(Some(row))
    })
    .await??
    .ok_or(ApiError::NotFound("Post"))?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(convert::comment_data(row))),
    ))
}

pub async fn reply_to_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req.content)?;

    let reply_id = Uuid::new_v4().to_string();

    let db = state.clone();
    let author_id = claims.sub.to_string();
    let parent_id = id.to_string();
    let rid = reply_id.clone();
    let row = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<CommentRow>> {
        let Some(parent) = db.db.get_comment(&parent_id)? else {
            return Ok(None);
        };
        // A reply lives on the same post as its parent
        db.db
            .insert_comment(&rid, &req.content, &author_id, &parent.post_id, Some(&parent_id))?;
        let row = db
            .db
            .get_comment(&rid)?
            .ok_or_else(|| anyhow::anyhow!("Reply {rid} vanished after insert"))?;
        Ok(Some(row))
    })
    .await??
    .ok_or(ApiError::NotFound("Parent comment"))?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(convert::comment_data(row))),
    ))
}

/// One page of a post's top-level comments, newest first, each carrying
/// its full reply tree.
pub async fn get_comments_for_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let db = state.clone();
    let post_id = id.to_string();
    let offset = (page - 1) * limit;
    let tree =
        tokio::task::spawn_blocking(move || db.db.comment_tree(&post_id, limit, offset)).await??;

    let total = tree.total;
    let nodes = convert::assemble_tree(tree);
    Ok(Json(PageResponse::new(nodes, total, page, limit)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req.content)?;

    let db = state.clone();
    let cid = id.to_string();
    let existing = tokio::task::spawn_blocking(move || db.db.get_comment(&cid))
        .await??
        .ok_or(ApiError::NotFound("Comment"))?;

    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::NotOwner("comment"));
    }

    let db = state.clone();
    let cid = id.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db.update_comment(&cid, &req.content)?;
        db.db.get_comment(&cid)
    })
    .await??
    .ok_or(ApiError::NotFound("Comment"))?;

    Ok(Json(DataResponse::new(convert::comment_data(row))))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let cid = id.to_string();
    let existing = tokio::task::spawn_blocking(move || db.db.get_comment(&cid))
        .await??
        .ok_or(ApiError::NotFound("Comment"))?;

    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::NotOwner("comment"));
    }

    let db = state.clone();
    let cid = id.to_string();
    tokio::task::spawn_blocking(move || db.db.delete_comment_cascade(&cid)).await??;

    Ok(Json(DataResponse::new(serde_json::json!({}))))
}
