use crate::record::{AuthenticationRecord, FullBlogRecord, PartialBlogRecord, UserRecord};
use crate::store::{BlogStore, DbError, Result, stored_likes};
use async_trait::async_trait;
use bloglist_common::model::{
    BloglistSnowflakeGenerator, Id,
    auth::{AuthTokenHash, Authentication},
    blog::{Blog, BlogDetails, BlogMarker, BlogUpdate, PartialBlog},
    user::{CreateUser, User, UserMarker, Username},
};
use bloglist_common::snowflake::{ProcessId, WorkerId};
use sqlx::{
    PgPool,
    error::ErrorKind,
    postgres::PgPoolOptions,
    query, query_as, query_scalar,
};
use std::sync::{Mutex, PoisonError};
use time::PrimitiveDateTime;
use tracing::info;

/// [`BlogStore`] backed by PostgreSQL.
#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<BloglistSnowflakeGenerator>,
}

fn violation_kind(err: &sqlx::Error) -> Option<ErrorKind> {
    err.as_database_error().map(|db_err| db_err.kind())
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(BloglistSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");

        Ok(())
    }

    /// Waits for all connections to be returned and closes them.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn next_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}

#[async_trait]
impl BlogStore for DbClient {
    async fn list_blogs(&self) -> Result<Vec<Blog>> {
        let records = query_as::<_, FullBlogRecord>(
            "
            SELECT
                blogs.blog_snowflake,
                blogs.title,
                blogs.author,
                blogs.url,
                blogs.likes,
                users.user_snowflake,
                users.username,
                users.name
            FROM
                blogs.blogs NATURAL JOIN users.users
            ORDER BY
                blogs.blog_snowflake
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let blogs = records
            .into_iter()
            .map(Blog::try_from)
            .collect::<Result<_, _>>()?;
        Ok(blogs)
    }

    async fn fetch_blog(&self, blog_id: Id<BlogMarker>) -> Result<Option<Blog>> {
        let record = query_as::<_, FullBlogRecord>(
            "
            SELECT
                blogs.blog_snowflake,
                blogs.title,
                blogs.author,
                blogs.url,
                blogs.likes,
                users.user_snowflake,
                users.username,
                users.name
            FROM
                blogs.blogs NATURAL JOIN users.users
            WHERE
                blogs.blog_snowflake = $1
            ",
        )
        .bind(blog_id.stored())
        .fetch_optional(&self.pool)
        .await?;

        let blog = record.map(Blog::try_from).transpose()?;
        Ok(blog)
    }

    async fn create_blog(
        &self,
        owner: Id<UserMarker>,
        details: BlogDetails,
    ) -> Result<PartialBlog> {
        let blog_id: Id<BlogMarker> = self.next_id()?;

        // The owner's blog list is derived from this table, so the insert
        // alone links the blog to its owner.
        let record = query_as::<_, PartialBlogRecord>(
            "
            INSERT INTO blogs.blogs (blog_snowflake, title, author, url, likes, user_snowflake)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING blog_snowflake, title, author, url, likes, user_snowflake
            ",
        )
        .bind(blog_id.stored())
        .bind(details.title)
        .bind(details.author)
        .bind(details.url)
        .bind(stored_likes(details.likes)?)
        .bind(owner.stored())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if matches!(violation_kind(&err), Some(ErrorKind::ForeignKeyViolation)) {
                DbError::UnknownOwner(owner)
            } else {
                err.into()
            }
        })?;

        Ok(PartialBlog::try_from(record)?)
    }

    async fn update_blog(
        &self,
        blog_id: Id<BlogMarker>,
        update: BlogUpdate,
    ) -> Result<Option<PartialBlog>> {
        let likes = update.likes.map(stored_likes).transpose()?;

        let record = query_as::<_, PartialBlogRecord>(
            "
            UPDATE blogs.blogs
            SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                likes = COALESCE($4, likes)
            WHERE
                blog_snowflake = $1
            RETURNING blog_snowflake, title, author, url, likes, user_snowflake
            ",
        )
        .bind(blog_id.stored())
        .bind(update.title)
        .bind(update.author)
        .bind(likes)
        .fetch_optional(&self.pool)
        .await?;

        let blog = record.map(PartialBlog::try_from).transpose()?;
        Ok(blog)
    }

    async fn delete_blog(&self, blog_id: Id<BlogMarker>) -> Result<bool> {
        let result = query(
            "
            DELETE FROM blogs.blogs
            WHERE blog_snowflake = $1
            ",
        )
        .bind(blog_id.stored())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.name,
                COALESCE(
                    array_agg(blogs.blog_snowflake ORDER BY blogs.blog_snowflake)
                        FILTER (WHERE blogs.blog_snowflake IS NOT NULL),
                    '{}'
                ) AS blog_snowflakes
            FROM
                users.users LEFT JOIN blogs.blogs USING (user_snowflake)
            WHERE
                users.user_snowflake = $1
            GROUP BY
                users.user_snowflake
            ",
        )
        .bind(user_id.stored())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.name,
                COALESCE(
                    array_agg(blogs.blog_snowflake ORDER BY blogs.blog_snowflake)
                        FILTER (WHERE blogs.blog_snowflake IS NOT NULL),
                    '{}'
                ) AS blog_snowflakes
            FROM
                users.users LEFT JOIN blogs.blogs USING (user_snowflake)
            WHERE
                users.username = $1
            GROUP BY
                users.user_snowflake
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let user_id: Id<UserMarker> = self.next_id()?;

        let returned_snowflake = query_scalar::<_, i64>(
            "
            INSERT INTO users.users (user_snowflake, username, name)
            VALUES ($1, $2, $3)
            RETURNING user_snowflake
            ",
        )
        .bind(user_id.stored())
        .bind(user.username.get())
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if matches!(violation_kind(&err), Some(ErrorKind::UniqueViolation)) {
                DbError::UsernameTaken(user.username.get().to_owned())
            } else {
                err.into()
            }
        })?;

        Ok(Id::from_stored(returned_snowflake))
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                user_snowflake,
                token_hash,
                created_at,
                expires_after_seconds
            FROM
                users.authentications
            WHERE
                token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = authentication.created_at;

        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.stored())
        .bind(PrimitiveDateTime::new(created_at.date(), created_at.time()))
        .bind(
            authentication
                .lifetime
                .map(|lifetime| lifetime.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if matches!(violation_kind(&err), Some(ErrorKind::ForeignKeyViolation)) {
                DbError::UnknownOwner(authentication.user)
            } else {
                err.into()
            }
        })?;

        Ok(())
    }
}
