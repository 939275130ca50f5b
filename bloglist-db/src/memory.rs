use crate::store::{BlogStore, DbError, Result, stored_likes};
use async_trait::async_trait;
use bloglist_common::model::{
    BloglistSnowflakeGenerator, Id,
    auth::{AuthTokenHash, Authentication},
    blog::{Blog, BlogDetails, BlogMarker, BlogUpdate, PartialBlog},
    user::{CreateUser, User, UserMarker, Username},
};
use bloglist_common::snowflake::{ProcessId, WorkerId};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

/// [`BlogStore`] keeping everything in process memory. Nothing survives a
/// restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    snowflake_generator: Mutex<BloglistSnowflakeGenerator>,
}

#[derive(Debug, Default)]
struct MemoryData {
    users: HashMap<Id<UserMarker>, User>,
    /// Insertion order is creation order.
    blogs: Vec<PartialBlog>,
    authentications: HashMap<AuthTokenHash, Authentication>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(BloglistSnowflakeGenerator::new(worker_id, process_id));

        Self {
            data: RwLock::default(),
            snowflake_generator,
        }
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

impl MemoryData {
    fn populate(&self, blog: &PartialBlog) -> Result<Blog> {
        let owner = self
            .users
            .get(&blog.user)
            .ok_or(DbError::UnknownOwner(blog.user))?;

        Ok(Blog {
            id: blog.id,
            details: blog.details.clone(),
            user: owner.summary(),
        })
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn list_blogs(&self) -> Result<Vec<Blog>> {
        let data = self.data.read().await;

        data.blogs.iter().map(|blog| data.populate(blog)).collect()
    }

    async fn fetch_blog(&self, blog_id: Id<BlogMarker>) -> Result<Option<Blog>> {
        let data = self.data.read().await;

        data.blogs
            .iter()
            .find(|blog| blog.id == blog_id)
            .map(|blog| data.populate(blog))
            .transpose()
    }

    async fn create_blog(
        &self,
        owner: Id<UserMarker>,
        details: BlogDetails,
    ) -> Result<PartialBlog> {
        stored_likes(details.likes)?;

        let mut guard = self.data.write().await;
        let data = &mut *guard;

        let user = data
            .users
            .get_mut(&owner)
            .ok_or(DbError::UnknownOwner(owner))?;
        let blog = PartialBlog {
            id: self.next_id()?,
            details,
            user: owner,
        };
        user.blogs.push(blog.id);
        data.blogs.push(blog.clone());

        Ok(blog)
    }

    async fn update_blog(
        &self,
        blog_id: Id<BlogMarker>,
        update: BlogUpdate,
    ) -> Result<Option<PartialBlog>> {
        if let Some(likes) = update.likes {
            stored_likes(likes)?;
        }

        let mut data = self.data.write().await;

        let Some(blog) = data.blogs.iter_mut().find(|blog| blog.id == blog_id) else {
            return Ok(None);
        };
        update.apply_to(&mut blog.details);

        Ok(Some(blog.clone()))
    }

    async fn delete_blog(&self, blog_id: Id<BlogMarker>) -> Result<bool> {
        let mut data = self.data.write().await;

        let Some(index) = data.blogs.iter().position(|blog| blog.id == blog_id) else {
            return Ok(false);
        };
        let blog = data.blogs.remove(index);
        if let Some(owner) = data.users.get_mut(&blog.user) {
            owner.blogs.retain(|id| *id != blog_id);
        }

        Ok(true)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.data.read().await.users.get(&user_id).cloned())
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let data = self.data.read().await;

        Ok(data
            .users
            .values()
            .find(|user| &user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let mut data = self.data.write().await;

        if data.users.values().any(|other| other.username == user.username) {
            return Err(DbError::UsernameTaken(user.username.get().to_owned()));
        }

        let id = self.next_id()?;
        data.users.insert(
            id,
            User {
                id,
                username: user.username.clone(),
                name: user.name.clone(),
                blogs: Vec::new(),
            },
        );

        Ok(id)
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self
            .data
            .read()
            .await
            .authentications
            .get(token_hash)
            .cloned())
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let mut data = self.data.write().await;

        if !data.users.contains_key(&authentication.user) {
            return Err(DbError::UnknownOwner(authentication.user));
        }
        data.authentications
            .insert(authentication.token_hash.clone(), authentication.clone());

        Ok(())
    }
}
