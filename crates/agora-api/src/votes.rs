use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use agora_types::api::{CastVoteRequest, Claims, VoteResponse};
use agora_types::models::{VoteOutcome, VoteTarget, VoteValue};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::json::Json;

pub async fn vote_on_post(
    state: State<AppState>,
    Path(id): Path<Uuid>,
    claims: Extension<Claims>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Response, ApiError> {
    cast(state, claims, VoteTarget::Post, id, req.value).await
}

pub async fn vote_on_comment(
    state: State<AppState>,
    Path(id): Path<Uuid>,
    claims: Extension<Claims>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Response, ApiError> {
    cast(state, claims, VoteTarget::Comment, id, req.value).await
}

/// Shared vote path. The target kind is fixed by the route, so dispatch
/// into the ledger is static; the ledger itself decides cast vs change vs
/// toggle-off.
async fn cast(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    target: VoteTarget,
    target_id: Uuid,
    raw_value: i8,
) -> Result<Response, ApiError> {
    let value = VoteValue::try_from(raw_value).map_err(ApiError::Validation)?;

    let db = state.clone();
    let vote_id = Uuid::new_v4().to_string();
    let user_id = claims.sub.to_string();
    let tid = target_id.to_string();
    let result = tokio::task::spawn_blocking(move || {
        db.db.cast_vote(&vote_id, &user_id, target, &tid, value)
    })
    .await?;

    let cast = match result {
        Ok(Some(cast)) => cast,
        Ok(None) => return Err(ApiError::NotFound(target_noun(target))),
        // Lost race between two first votes: the constraint wins, the
        // loser gets a conflict instead of a 500
        Err(err) if agora_db::is_unique_violation(&err) => return Err(ApiError::DuplicateVote),
        Err(err) => return Err(err.into()),
    };

    let (status, message) = match cast.outcome {
        VoteOutcome::Cast => (StatusCode::CREATED, "Vote cast"),
        VoteOutcome::Changed => (StatusCode::OK, "Vote changed"),
        VoteOutcome::Removed => (StatusCode::OK, "Vote removed"),
    };

    Ok((
        status,
        Json(VoteResponse {
            success: true,
            message,
            data: cast.vote.map(convert::vote_data),
        }),
    )
        .into_response())
}

fn target_noun(target: VoteTarget) -> &'static str {
    match target {
        VoteTarget::Post => "Post",
        VoteTarget::Comment => "Comment",
    }
}
