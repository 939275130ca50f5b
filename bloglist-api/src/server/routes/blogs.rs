use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::{
    aggregate::{self, BlogSummary},
    model::{
        Id,
        blog::{Blog, BlogMarker, BlogUpdate, NewBlog, PartialBlog},
    },
};
use bloglist_db::store::BlogStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_blogs)
        .typed_post(create_blog)
        .typed_get(get_blog_summary)
        .typed_get(get_blog)
        .typed_put(update_blog)
        .typed_delete(delete_blog)
}

#[derive(TypedPath)]
#[typed_path("/api/blogs")]
struct BlogsPath;

#[derive(TypedPath)]
#[typed_path("/api/blogs/summary")]
struct BlogSummaryPath;

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/blogs/{id}", rejection(ServerError))]
struct BlogPath {
    id: Id<BlogMarker>,
}

async fn list_blogs(
    _: BlogsPath,
    State(store): State<Arc<dyn BlogStore>>,
) -> Result<Json<Vec<Blog>>> {
    let blogs = store.list_blogs().await?;

    Ok(Json(blogs))
}

async fn get_blog_summary(
    _: BlogSummaryPath,
    State(store): State<Arc<dyn BlogStore>>,
) -> Result<Json<BlogSummary>> {
    let blogs = store.list_blogs().await?;

    Ok(Json(aggregate::summarize(&blogs)))
}

async fn get_blog(
    BlogPath { id }: BlogPath,
    State(store): State<Arc<dyn BlogStore>>,
) -> Result<Json<Blog>> {
    let blog = store
        .fetch_blog(id)
        .await?
        .ok_or(ServerError::BlogByIdNotFound(id))?;

    Ok(Json(blog))
}

async fn create_blog(
    _: BlogsPath,
    State(store): State<Arc<dyn BlogStore>>,
    user: AuthenticatedUser,
    Json(blog): Json<NewBlog>,
) -> Result<Created<PartialBlog>> {
    if !blog.is_identifiable() {
        return Err(ServerError::MissingTitleAndUrl);
    }

    let blog = store
        .create_blog(user.user_id(), blog.into_details())
        .await?;
    info!(blog = %blog.id, user = %blog.user, "Created blog");

    Ok(Created(blog))
}

async fn update_blog(
    BlogPath { id }: BlogPath,
    State(store): State<Arc<dyn BlogStore>>,
    Json(update): Json<BlogUpdate>,
) -> Result<Json<PartialBlog>> {
    let blog = store
        .update_blog(id, update)
        .await?
        .ok_or(ServerError::BlogByIdNotFound(id))?;

    Ok(Json(blog))
}

async fn delete_blog(
    BlogPath { id }: BlogPath,
    State(store): State<Arc<dyn BlogStore>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let blog = store
        .fetch_blog(id)
        .await?
        .ok_or(ServerError::BlogByIdNotFound(id))?;

    if blog.user.id != user.user_id() {
        return Err(ServerError::NotBlogOwner {
            blog: id,
            user: user.user_id(),
        });
    }

    // Someone else may have deleted it since the lookup.
    if !store.delete_blog(id).await? {
        return Err(ServerError::BlogByIdNotFound(id));
    }
    info!(blog = %id, user = %user.user_id(), "Deleted blog");

    Ok(StatusCode::NO_CONTENT)
}
