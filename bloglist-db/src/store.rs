use async_trait::async_trait;
use bloglist_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    blog::{Blog, BlogDetails, BlogMarker, BlogUpdate, PartialBlog},
    user::{CreateUser, User, UserMarker, Username},
};
use bloglist_common::snowflake::SnowflakeError;
use std::fmt::Debug;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeError),
    #[error("User with id {0} does not exist")]
    UnknownOwner(Id<UserMarker>),
    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),
    #[error("Like count {0} is too large to be stored")]
    LikesOutOfRange(u64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Checks that a like count fits the `BIGINT` column and returns the value
/// to store. Both stores apply it so they accept the same blogs.
pub(crate) fn stored_likes(likes: u64) -> Result<i64> {
    i64::try_from(likes).map_err(|_| DbError::LikesOutOfRange(likes))
}

/// Persistence for users, their blogs and their auth tokens.
///
/// Each operation is atomic on its own; none of them spans several calls.
#[async_trait]
pub trait BlogStore: Send + Sync + Debug {
    /// All blogs with their owners, oldest first.
    async fn list_blogs(&self) -> Result<Vec<Blog>>;

    async fn fetch_blog(&self, blog_id: Id<BlogMarker>) -> Result<Option<Blog>>;

    /// Stores a new blog and appends it to the owner's blog list.
    async fn create_blog(
        &self,
        owner: Id<UserMarker>,
        details: BlogDetails,
    ) -> Result<PartialBlog>;

    /// Returns `None` if there is no blog with that id.
    async fn update_blog(
        &self,
        blog_id: Id<BlogMarker>,
        update: BlogUpdate,
    ) -> Result<Option<PartialBlog>>;

    /// Returns whether a blog was actually removed.
    async fn delete_blog(&self, blog_id: Id<BlogMarker>) -> Result<bool>;

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>>;

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>>;

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;
}
