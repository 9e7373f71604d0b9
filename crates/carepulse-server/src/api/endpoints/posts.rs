//! Article endpoints, including drafting through the completion service.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use carepulse_content::{draft_article, slugify, ArticleRequest};
use carepulse_core::{Database, Post, PostStatus};

use super::{clamp_limit, parse_id, required};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// `GET /api/posts?status=&limit=&offset=`
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<PostListQuery>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PostStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let posts = ctx
        .lock_db()?
        .list_posts(status, clamp_limit(query.limit), query.offset)?;
    Ok(Json(posts))
}

/// Unique slug from an explicit slug or the title.
fn unique_slug(db: &Database, requested: Option<&str>, title: &str) -> Result<String, ApiError> {
    let base = slugify(requested.unwrap_or(title));
    if base.is_empty() {
        return Err(ApiError::BadRequest("slug must contain letters or digits".into()));
    }
    Ok(db.available_slug(&base)?)
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    pub body: String,
    pub topic: String,
}

/// `POST /api/posts`: create a draft authored by the caller.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(request) = payload?;
    let title = required("title", &request.title)?;
    let body = required("body", &request.body)?;
    let topic = required("topic", &request.topic)?;

    let db = ctx.lock_db()?;
    let slug = unique_slug(&db, request.slug.as_deref(), &title)?;
    let post = Post::draft(title, slug, request.excerpt.trim().to_string(), body, topic, caller.caller_id);
    db.insert_post(&post)?;

    tracing::info!(post_id = %post.id, slug = %post.slug, author = %post.author, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /api/posts/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let post = ctx
        .lock_db()?
        .get_post(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("post {}", id)))?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub topic: Option<String>,
}

/// `PUT /api/posts/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;

    let db = ctx.lock_db()?;
    let mut post = db
        .get_post(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("post {}", id)))?;

    if let Some(title) = request.title {
        post.title = required("title", &title)?;
    }
    if let Some(slug) = request.slug {
        let base = slugify(&slug);
        if base != post.slug {
            post.slug = unique_slug(&db, Some(&base), &post.title)?;
        }
    }
    if let Some(excerpt) = request.excerpt {
        post.excerpt = excerpt.trim().to_string();
    }
    if let Some(body) = request.body {
        post.body = required("body", &body)?;
    }
    if let Some(topic) = request.topic {
        post.topic = required("topic", &topic)?;
    }
    post.updated_at = Utc::now();

    db.update_post(&post)?;

    tracing::info!(post_id = %id, caller = %caller.caller_id, "Post updated");
    Ok(Json(post))
}

/// `DELETE /api/posts/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !ctx.lock_db()?.delete_post(&id)? {
        return Err(ApiError::NotFound(format!("post {}", id)));
    }

    tracing::info!(post_id = %id, caller = %caller.caller_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/posts/:id/publish`
pub async fn publish(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let db = ctx.lock_db()?;

    if !db.publish_post(&id, Utc::now())? {
        return match db.get_post(&id)? {
            None => Err(ApiError::NotFound(format!("post {}", id))),
            Some(_) => Err(ApiError::BadRequest("post is already published".into())),
        };
    }
    let post = db
        .get_post(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("post {}", id)))?;

    tracing::info!(post_id = %id, caller = %caller.caller_id, "Post published");
    Ok(Json(post))
}

/// `POST /api/posts/draft`: draft an article with the completion service.
pub async fn draft(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<ArticleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(mut request) = payload?;
    request.topic = required("topic", &request.topic)?;

    // The completer blocks on network I/O; keep it off the async workers
    let completer = ctx.completer.clone();
    let job = request.clone();
    let article = tokio::task::spawn_blocking(move || draft_article(completer.as_ref(), &job))
        .await
        .map_err(|e| ApiError::Internal(format!("drafting task failed: {}", e)))??;

    let db = ctx.lock_db()?;
    let slug = unique_slug(&db, None, &article.title)?;
    let post = Post::draft(
        article.title,
        slug,
        article.excerpt,
        article.body,
        request.topic,
        caller.caller_id,
    );
    db.insert_post(&post)?;

    tracing::info!(post_id = %post.id, slug = %post.slug, author = %post.author, "Article drafted");
    Ok((StatusCode::CREATED, Json(post)))
}
