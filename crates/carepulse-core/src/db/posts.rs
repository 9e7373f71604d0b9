//! Article database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, text_column, Database, DbResult};
use crate::models::{Post, PostStatus};

const POST_COLUMNS: &str = "id, title, slug, excerpt, body, topic, author, status, \
                            created_at, updated_at, published_at";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        body: row.get(4)?,
        topic: row.get(5)?,
        author: row.get(6)?,
        status: text_column(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        published_at: row.get(10)?,
    })
}

impl Database {
    pub fn insert_post(&self, post: &Post) -> DbResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    POST_COLUMNS
                ),
                params![
                    post.id,
                    post.title,
                    post.slug,
                    post.excerpt,
                    post.body,
                    post.topic,
                    post.author,
                    post.status.as_str(),
                    post.created_at,
                    post.updated_at,
                    post.published_at,
                ],
            )
            .map_err(|e| constraint_error(e, "post"))?;
        Ok(())
    }

    /// Update editable fields. Status changes go through [`Database::publish_post`].
    pub fn update_post(&self, post: &Post) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE posts SET
                    title = ?2,
                    slug = ?3,
                    excerpt = ?4,
                    body = ?5,
                    topic = ?6,
                    updated_at = ?7
                WHERE id = ?1
                "#,
                params![
                    post.id,
                    post.title,
                    post.slug,
                    post.excerpt,
                    post.body,
                    post.topic,
                    post.updated_at,
                ],
            )
            .map_err(|e| constraint_error(e, "post"))?;
        Ok(rows_affected > 0)
    }

    pub fn get_post(&self, id: &str) -> DbResult<Option<Post>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS),
                [id],
                post_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_post_by_slug(&self, slug: &str) -> DbResult<Option<Post>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS),
                [slug],
                post_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List posts, newest first; published posts ordered by publication time.
    pub fn list_posts(&self, status: Option<PostStatus>, limit: usize, offset: usize) -> DbResult<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM posts
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY COALESCE(published_at, created_at) DESC
            LIMIT ?2 OFFSET ?3
            "#,
            POST_COLUMNS
        ))?;

        // SQLite binds i64; anything larger pages past the end
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt.query_map(
            params![status.map(|s| s.as_str()), limit, offset],
            post_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark a draft as published. Returns false if absent or already published.
    pub fn publish_post(&self, id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE posts SET status = 'published', published_at = ?2, updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            "#,
            params![id, at],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn delete_post(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM posts WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// First of `base`, `base-2`, `base-3`, ... not used by another post.
    pub fn available_slug(&self, base: &str) -> DbResult<String> {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while self.get_post_by_slug(&candidate)?.is_some() {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}
