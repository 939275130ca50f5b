use crate::server::ServerRouter;
use axum::Router;

mod blogs;
mod users;

pub fn routes() -> ServerRouter {
    Router::new().merge(blogs::routes()).merge(users::routes())
}
