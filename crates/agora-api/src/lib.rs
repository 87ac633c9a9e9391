pub mod auth;
pub mod comments;
mod convert;
pub mod error;
mod json;
pub mod middleware;
pub mod posts;
pub mod votes;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

pub use auth::{AppState, AppStateInner};

/// The full /api surface. The binary layers CORS and request tracing on
/// top; tests drive this router directly.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/comments", get(comments::get_comments_for_post));

    let protected = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", put(posts::update_post).delete(posts::delete_post))
        .route("/posts/{id}/comments", post(comments::add_comment_to_post))
        .route("/posts/{id}/vote", post(votes::vote_on_post))
        .route("/comments/{id}/replies", post(comments::reply_to_comment))
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/comments/{id}/vote", post(votes::vote_on_comment))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(state)
}
