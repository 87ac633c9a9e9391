//! Row-to-response conversion and the comment tree assembly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use agora_db::models::{CommentRow, CommentTreeRows, PostRow, VoteRow};
use agora_types::api::{CommentData, CommentNode, PostData, VoteData};
use agora_types::models::{VoteTarget, VoteValue};

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {field} '{raw}': {e}");
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, field: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {field} '{raw}': {e}");
            DateTime::default()
        })
}

pub(crate) fn post_data(row: PostRow) -> PostData {
    PostData {
        id: parse_uuid(&row.id, "post id"),
        author_id: parse_uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        title: row.title,
        content: row.content,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        created_at: parse_timestamp(&row.created_at, "created_at"),
        updated_at: parse_timestamp(&row.updated_at, "updated_at"),
    }
}

pub(crate) fn comment_data(row: CommentRow) -> CommentData {
    CommentData {
        id: parse_uuid(&row.id, "comment id"),
        author_id: parse_uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        post_id: parse_uuid(&row.post_id, "post_id"),
        parent_id: row.parent_id.as_deref().map(|p| parse_uuid(p, "parent_id")),
        content: row.content,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        created_at: parse_timestamp(&row.created_at, "created_at"),
    }
}

pub(crate) fn vote_data(row: VoteRow) -> VoteData {
    VoteData {
        id: parse_uuid(&row.id, "vote id"),
        user_id: parse_uuid(&row.user_id, "user_id"),
        target_kind: match row.target_kind.as_str() {
            "post" => VoteTarget::Post,
            _ => VoteTarget::Comment,
        },
        target_id: parse_uuid(&row.target_id, "target_id"),
        value: VoteValue::try_from(row.value as i8).unwrap_or_else(|e| {
            warn!("Corrupt vote value on '{}': {e}", row.id);
            VoteValue::Up
        }),
        created_at: parse_timestamp(&row.created_at, "created_at"),
    }
}

/// Build the nested reply trees from the level-grouped rows. Attachment
/// runs deepest level first, so a node's own replies are complete before
/// it is pushed onto its parent. Iterative throughout: reply-chain depth
/// never grows the stack.
pub(crate) fn assemble_tree(tree: CommentTreeRows) -> Vec<CommentNode> {
    let root_ids: Vec<String> = tree.roots.iter().map(|r| r.id.clone()).collect();
    let structure: Vec<Vec<(String, Option<String>)>> = tree
        .levels
        .iter()
        .map(|level| {
            level
                .iter()
                .map(|row| (row.id.clone(), row.parent_id.clone()))
                .collect()
        })
        .collect();

    let mut nodes: HashMap<String, CommentNode> = tree
        .roots
        .into_iter()
        .chain(tree.levels.into_iter().flatten())
        .map(|row| {
            (
                row.id.clone(),
                CommentNode {
                    comment: comment_data(row),
                    replies: Vec::new(),
                },
            )
        })
        .collect();

    for level in structure.iter().rev() {
        for (id, parent_id) in level {
            let Some(node) = nodes.remove(id) else {
                continue;
            };
            match parent_id.as_ref().and_then(|p| nodes.get_mut(p)) {
                Some(parent) => parent.replies.push(node),
                None => warn!("Comment {id} has no parent in the fetched tree"),
            }
        }
    }

    root_ids
        .into_iter()
        .filter_map(|id| nodes.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, parent: Option<&str>) -> CommentRow {
        CommentRow {
            id: id.to_string(),
            content: format!("comment {id}"),
            author_id: "00000000-0000-0000-0000-000000000001".to_string(),
            author_username: "alice".to_string(),
            post_id: "00000000-0000-0000-0000-000000000002".to_string(),
            parent_id: parent.map(str::to_string),
            upvotes: 0,
            downvotes: 0,
            created_at: "2024-05-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn assembles_nested_replies_bottom_up() {
        // r1 and r2 are roots; r1 has children a, b; a has child c
        let tree = CommentTreeRows {
            roots: vec![
                row("11111111-0000-0000-0000-000000000000", None),
                row("22222222-0000-0000-0000-000000000000", None),
            ],
            levels: vec![
                vec![
                    row(
                        "aaaaaaaa-0000-0000-0000-000000000000",
                        Some("11111111-0000-0000-0000-000000000000"),
                    ),
                    row(
                        "bbbbbbbb-0000-0000-0000-000000000000",
                        Some("11111111-0000-0000-0000-000000000000"),
                    ),
                ],
                vec![row(
                    "cccccccc-0000-0000-0000-000000000000",
                    Some("aaaaaaaa-0000-0000-0000-000000000000"),
                )],
            ],
            total: 2,
        };

        let nodes = assemble_tree(tree);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].replies.len(), 2);
        assert_eq!(nodes[1].replies.len(), 0);
        assert_eq!(nodes[0].replies[0].replies.len(), 1);
        assert_eq!(nodes[0].replies[1].replies.len(), 0);
        assert_eq!(
            nodes[0].replies[0].replies[0].comment.content,
            "comment cccccccc-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn timestamp_parsing_handles_sqlite_format() {
        let parsed = parse_timestamp("2024-05-01 12:34:56", "created_at");
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T12:34:56+00:00");
    }
}
