use crate::Database;
use crate::models::{
    CastResult, CommentRow, CommentTreeRows, PostFilter, PostRow, UserRow, VoteRow,
};
use agora_types::models::{PostSort, SortOrder, VoteOutcome, VoteTarget, VoteValue};
use anyhow::Result;
use rusqlite::{Connection, types::ToSql};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Posts --

    pub fn insert_post(&self, id: &str, title: &str, content: &str, author_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, content, author_id) VALUES (?1, ?2, ?3, ?4)",
                (id, title, content, author_id),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.title, p.content, p.author_id, u.username,
                        p.upvotes, p.downvotes, p.created_at, p.updated_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE p.id = ?1",
            )?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    /// Paged listing with optional author filter and case-insensitive
    /// substring search over title and content. The ORDER BY column comes
    /// from a closed enum, never from the request string.
    pub fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<PostRow>, u64)> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut args: Vec<String> = Vec::new();

            if let Some(author) = &filter.author {
                conditions.push("p.author_id = ?");
                args.push(author.clone());
            }
            if let Some(search) = &filter.search {
                conditions.push("(p.title LIKE ? OR p.content LIKE ?)");
                let pattern = format!("%{search}%");
                args.push(pattern.clone());
                args.push(pattern);
            }

            let where_clause = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };

            let count_sql = format!("SELECT COUNT(*) FROM posts p{where_clause}");
            let total: i64 = conn.query_row(
                &count_sql,
                rusqlite::params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            let order_col = match filter.sort {
                PostSort::CreatedAt => "p.created_at",
                PostSort::UpdatedAt => "p.updated_at",
                PostSort::Title => "p.title",
                PostSort::Upvotes => "p.upvotes",
            };
            let dir = match filter.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };

            // rowid breaks ties between rows created in the same second
            let sql = format!(
                "SELECT p.id, p.title, p.content, p.author_id, u.username,
                        p.upvotes, p.downvotes, p.created_at, p.updated_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id{where_clause}
                 ORDER BY {order_col} {dir}, p.rowid {dir}
                 LIMIT ? OFFSET ?"
            );

            let limit = i64::from(filter.limit);
            let offset = i64::from(filter.offset);
            let mut params: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
            params.push(&limit);
            params.push(&offset);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    pub fn update_post(&self, id: &str, title: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET title = ?1, content = ?2, updated_at = datetime('now') WHERE id = ?3",
                (title, content, id),
            )?;
            Ok(())
        })
    }

    /// Delete a post together with all of its comments, the votes on the
    /// post, and the votes on every one of its comments. The comment rows
    /// themselves go via the post_id FK cascade.
    pub fn delete_post_cascade(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let comment_ids: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM comments WHERE post_id = ?1")?;
                stmt.query_map([id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            tx.execute(
                "DELETE FROM votes WHERE target_kind = 'post' AND target_id = ?1",
                [id],
            )?;
            delete_comment_votes(&tx, &comment_ids)?;
            tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
        post_id: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, content, author_id, post_id, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, content, author_id, post_id, parent_id),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn update_comment(&self, id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE comments SET content = ?1 WHERE id = ?2",
                (content, id),
            )?;
            Ok(())
        })
    }

    /// Delete a comment, its entire descendant subtree (collected
    /// iteratively, so reply-chain depth never grows the stack), and every
    /// vote on any comment in the subtree.
    pub fn delete_comment_cascade(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut all_ids = vec![id.to_string()];
            let mut frontier = vec![id.to_string()];
            while !frontier.is_empty() {
                let children = query_child_ids(&tx, &frontier)?;
                all_ids.extend_from_slice(&children);
                frontier = children;
            }

            delete_comment_votes(&tx, &all_ids)?;
            // parent_id FK cascade removes the subtree rows with the root
            tx.execute("DELETE FROM comments WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(())
        })
    }

    /// One page of a post's top-level comments (newest first) plus every
    /// descendant, fetched breadth-first one tree level per query. No
    /// recursion: pathological reply chains cost queries, not stack.
    pub fn comment_tree(&self, post_id: &str, limit: u32, offset: u32) -> Result<CommentTreeRows> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND parent_id IS NULL",
                [post_id],
                |row| row.get(0),
            )?;

            let roots = {
                let mut stmt = conn.prepare(&format!(
                    "{COMMENT_SELECT}
                     WHERE c.post_id = ?1 AND c.parent_id IS NULL
                     ORDER BY c.created_at DESC, c.rowid DESC
                     LIMIT ?2 OFFSET ?3"
                ))?;
                stmt.query_map(
                    rusqlite::params![post_id, i64::from(limit), i64::from(offset)],
                    map_comment_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            let mut levels: Vec<Vec<CommentRow>> = Vec::new();
            let mut frontier: Vec<String> = roots.iter().map(|r| r.id.clone()).collect();
            while !frontier.is_empty() {
                let children = query_children(conn, &frontier)?;
                if children.is_empty() {
                    break;
                }
                frontier = children.iter().map(|c| c.id.clone()).collect();
                levels.push(children);
            }

            Ok(CommentTreeRows {
                roots,
                levels,
                total: total as u64,
            })
        })
    }

    // -- Votes --

    /// The vote ledger. At most one vote per (user, target); casting the
    /// same value toggles the vote off, the opposite value flips it. The
    /// mutation and the full recount of the target's denormalized counters
    /// share one transaction. Returns None when the target does not exist.
    pub fn cast_vote(
        &self,
        vote_id: &str,
        user_id: &str,
        target: VoteTarget,
        target_id: &str,
        value: VoteValue,
    ) -> Result<Option<CastResult>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let table = target_table(target);
            let exists: bool = tx.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
                [target_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let existing: Option<(String, i64)> = tx
                .query_row(
                    "SELECT id, value FROM votes
                     WHERE user_id = ?1 AND target_kind = ?2 AND target_id = ?3",
                    (user_id, target.as_str(), target_id),
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let result = match existing {
                Some((existing_id, existing_value)) if existing_value == value.as_i64() => {
                    // Same value cast again: toggle the vote off
                    tx.execute("DELETE FROM votes WHERE id = ?1", [&existing_id])?;
                    CastResult {
                        outcome: VoteOutcome::Removed,
                        vote: None,
                    }
                }
                Some((existing_id, _)) => {
                    tx.execute(
                        "UPDATE votes SET value = ?1 WHERE id = ?2",
                        (value.as_i64(), &existing_id),
                    )?;
                    CastResult {
                        outcome: VoteOutcome::Changed,
                        vote: Some(query_vote(&tx, &existing_id)?),
                    }
                }
                None => {
                    tx.execute(
                        "INSERT INTO votes (id, user_id, target_kind, target_id, value)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        (vote_id, user_id, target.as_str(), target_id, value.as_i64()),
                    )?;
                    CastResult {
                        outcome: VoteOutcome::Cast,
                        vote: Some(query_vote(&tx, vote_id)?),
                    }
                }
            };

            // Full recount rather than an increment: costs O(votes) per
            // vote but cannot drift from the ledger.
            let upvotes: i64 = tx.query_row(
                "SELECT COUNT(*) FROM votes WHERE target_kind = ?1 AND target_id = ?2 AND value = 1",
                (target.as_str(), target_id),
                |row| row.get(0),
            )?;
            let downvotes: i64 = tx.query_row(
                "SELECT COUNT(*) FROM votes WHERE target_kind = ?1 AND target_id = ?2 AND value = -1",
                (target.as_str(), target_id),
                |row| row.get(0),
            )?;
            tx.execute(
                &format!("UPDATE {table} SET upvotes = ?1, downvotes = ?2 WHERE id = ?3"),
                (upvotes, downvotes, target_id),
            )?;

            tx.commit()?;
            Ok(Some(result))
        })
    }

    pub fn votes_for_target(&self, target: VoteTarget, target_id: &str) -> Result<Vec<VoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, target_kind, target_id, value, created_at
                 FROM votes WHERE target_kind = ?1 AND target_id = ?2",
            )?;
            let rows = stmt
                .query_map((target.as_str(), target_id), |row| {
                    Ok(VoteRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        target_kind: row.get(2)?,
                        target_id: row.get(3)?,
                        value: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn target_table(target: VoteTarget) -> &'static str {
    match target {
        VoteTarget::Post => "posts",
        VoteTarget::Comment => "comments",
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.content, c.author_id, u.username, c.post_id,
        c.parent_id, c.upvotes, c.downvotes, c.created_at
 FROM comments c
 LEFT JOIN users u ON c.author_id = u.id";

fn query_user(conn: &Connection, column: &str, key: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_vote(conn: &Connection, id: &str) -> Result<VoteRow> {
    let row = conn.query_row(
        "SELECT id, user_id, target_kind, target_id, value, created_at FROM votes WHERE id = ?1",
        [id],
        |row| {
            Ok(VoteRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                target_kind: row.get(2)?,
                target_id: row.get(3)?,
                value: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )?;
    Ok(row)
}

/// Direct children of any comment in `parent_ids`, oldest first. One call
/// per tree level keeps the assembly iterative.
fn query_children(conn: &Connection, parent_ids: &[String]) -> Result<Vec<CommentRow>> {
    if parent_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "{COMMENT_SELECT}
         WHERE c.parent_id IN ({})
         ORDER BY c.created_at ASC, c.rowid ASC",
        id_placeholders(parent_ids.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = parent_ids.iter().map(|id| id as &dyn ToSql).collect();
    let rows = stmt
        .query_map(params.as_slice(), map_comment_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_child_ids(conn: &Connection, parent_ids: &[String]) -> Result<Vec<String>> {
    if parent_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT id FROM comments WHERE parent_id IN ({})",
        id_placeholders(parent_ids.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = parent_ids.iter().map(|id| id as &dyn ToSql).collect();
    let rows = stmt
        .query_map(params.as_slice(), |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn delete_comment_votes(conn: &Connection, comment_ids: &[String]) -> Result<()> {
    if comment_ids.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "DELETE FROM votes WHERE target_kind = 'comment' AND target_id IN ({})",
        id_placeholders(comment_ids.len())
    );
    let params: Vec<&dyn ToSql> = comment_ids.iter().map(|id| id as &dyn ToSql).collect();
    conn.execute(&sql, params.as_slice())?;

    Ok(())
}

fn id_placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_post_row(row: &rusqlite::Row) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        upvotes: row.get(5)?,
        downvotes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_comment_row(row: &rusqlite::Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        post_id: row.get(4)?,
        parent_id: row.get(5)?,
        upvotes: row.get(6)?,
        downvotes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
