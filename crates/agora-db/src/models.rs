//! Database row types mapping directly to SQLite rows.
//! Distinct from the agora-types API models to keep the DB layer
//! independent.

use agora_types::models::{PostSort, SortOrder, VoteOutcome};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: String,
}

pub struct VoteRow {
    pub id: String,
    pub user_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub value: i64,
    pub created_at: String,
}

/// What `cast_vote` did. `vote` is present for Cast and Changed, absent
/// when the vote was toggled off.
pub struct CastResult {
    pub outcome: VoteOutcome,
    pub vote: Option<VoteRow>,
}

/// Listing parameters for the posts collection. `sort` is a closed enum,
/// never raw user input.
pub struct PostFilter {
    pub author: Option<String>,
    pub search: Option<String>,
    pub sort: PostSort,
    pub order: SortOrder,
    pub limit: u32,
    pub offset: u32,
}

/// One page of top-level comments plus every descendant, grouped by tree
/// depth. `levels[0]` holds the direct children of the paged roots.
pub struct CommentTreeRows {
    pub roots: Vec<CommentRow>,
    pub levels: Vec<Vec<CommentRow>>,
    pub total: u64,
}
