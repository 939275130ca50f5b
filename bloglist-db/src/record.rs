use bloglist_common::model::{
    Id, ModelValidationError,
    auth::Authentication,
    blog::{Blog, BlogDetails, PartialBlog},
    user::{User, UserSummary, Username},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub name: String,
    pub blog_snowflakes: Vec<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullBlogRecord {
    pub blog_snowflake: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: i64,
    pub user_snowflake: i64,
    pub username: String,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PartialBlogRecord {
    pub blog_snowflake: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: i64,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

fn likes(value: i64) -> Result<u64, ModelValidationError> {
    u64::try_from(value).map_err(|_| ModelValidationError::NegativeLikes(value))
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_stored(value.user_snowflake),
            username: Username::new(value.username)?,
            name: value.name,
            blogs: value
                .blog_snowflakes
                .into_iter()
                .map(Id::from_stored)
                .collect(),
        })
    }
}

impl TryFrom<PartialBlogRecord> for PartialBlog {
    type Error = ModelValidationError;

    fn try_from(value: PartialBlogRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_stored(value.blog_snowflake),
            details: BlogDetails {
                title: value.title,
                author: value.author,
                url: value.url,
                likes: likes(value.likes)?,
            },
            user: Id::from_stored(value.user_snowflake),
        })
    }
}

impl TryFrom<FullBlogRecord> for Blog {
    type Error = ModelValidationError;

    fn try_from(value: FullBlogRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_stored(value.blog_snowflake),
            details: BlogDetails {
                title: value.title,
                author: value.author,
                url: value.url,
                likes: likes(value.likes)?,
            },
            user: UserSummary {
                id: Id::from_stored(value.user_snowflake),
                username: Username::new(value.username)?,
                name: value.name,
            },
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_stored(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at.as_utc(),
            lifetime: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{FullBlogRecord, PartialBlogRecord, UserRecord};
    use bloglist_common::model::{
        ModelValidationError,
        blog::{Blog, PartialBlog},
        user::User,
    };

    #[test]
    fn negative_likes_are_invalid() {
        let record = PartialBlogRecord {
            blog_snowflake: 1,
            title: Some("T".to_owned()),
            likes: -3,
            user_snowflake: 2,
            ..PartialBlogRecord::default()
        };

        assert_eq!(
            PartialBlog::try_from(record),
            Err(ModelValidationError::NegativeLikes(-3))
        );
    }

    #[test]
    fn full_record_carries_owner() {
        let record = FullBlogRecord {
            blog_snowflake: 10,
            title: Some("React patterns".to_owned()),
            author: Some("Michael Chan".to_owned()),
            url: Some("https://reactpatterns.com/".to_owned()),
            likes: 7,
            user_snowflake: 20,
            username: "mluukkai".to_owned(),
            name: "Matti Luukkainen".to_owned(),
        };

        let blog = Blog::try_from(record).unwrap();
        assert_eq!(u64::from(blog.id), 10);
        assert_eq!(blog.details.likes, 7);
        assert_eq!(u64::from(blog.user.id), 20);
        assert_eq!(blog.user.username.get(), "mluukkai");
    }

    #[test]
    fn user_record_keeps_blog_order() {
        let record = UserRecord {
            user_snowflake: 1,
            username: "hellas".to_owned(),
            name: "Arto Hellas".to_owned(),
            blog_snowflakes: vec![5, 9, 12],
        };

        let user = User::try_from(record).unwrap();
        let blogs: Vec<u64> = user.blogs.into_iter().map(u64::from).collect();
        assert_eq!(blogs, [5, 9, 12]);
    }
}
