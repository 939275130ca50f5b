use crate::model::{
    Id,
    user::{UserMarker, UserSummary},
};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

/// The largest like count a blog can have. Counts are stored as `BIGINT`.
pub const MAX_LIKES: u64 = i64::MAX.cast_unsigned();

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BlogMarker;

fn deserialize_likes<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u64>::deserialize(deserializer)? {
        Some(likes) if likes > MAX_LIKES => Err(D::Error::custom(format!(
            "like count {likes} is larger than {MAX_LIKES}"
        ))),
        likes => Ok(likes),
    }
}

/// The descriptive part of a blog entry, shared by every representation.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct BlogDetails {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: u64,
}

/// A blog together with a summary of the user owning it.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Blog {
    pub id: Id<BlogMarker>,
    #[serde(flatten)]
    pub details: BlogDetails,
    pub user: UserSummary,
}

/// A blog referencing its owner by id only.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PartialBlog {
    pub id: Id<BlogMarker>,
    #[serde(flatten)]
    pub details: BlogDetails,
    pub user: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct NewBlog {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_likes")]
    pub likes: Option<u64>,
}

/// Fields of a blog that can be changed after creation. Absent fields are
/// left untouched.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct BlogUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "deserialize_likes")]
    pub likes: Option<u64>,
}

impl NewBlog {
    /// A blog needs at least a title or a url to be worth keeping.
    #[must_use]
    pub fn is_identifiable(&self) -> bool {
        self.title.is_some() || self.url.is_some()
    }

    #[must_use]
    pub fn into_details(self) -> BlogDetails {
        BlogDetails {
            title: self.title,
            author: self.author,
            url: self.url,
            likes: self.likes.unwrap_or(0),
        }
    }
}

impl BlogUpdate {
    pub fn apply_to(self, details: &mut BlogDetails) {
        if let Some(title) = self.title {
            details.title = Some(title);
        }
        if let Some(author) = self.author {
            details.author = Some(author);
        }
        if let Some(likes) = self.likes {
            details.likes = likes;
        }
    }
}

impl Blog {
    #[must_use]
    pub fn into_partial(self) -> PartialBlog {
        PartialBlog {
            id: self.id,
            details: self.details,
            user: self.user.id,
        }
    }
}

impl AsRef<BlogDetails> for BlogDetails {
    fn as_ref(&self) -> &BlogDetails {
        self
    }
}

impl AsRef<BlogDetails> for Blog {
    fn as_ref(&self) -> &BlogDetails {
        &self.details
    }
}

impl AsRef<BlogDetails> for PartialBlog {
    fn as_ref(&self) -> &BlogDetails {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use crate::model::blog::{BlogDetails, BlogUpdate, MAX_LIKES, NewBlog, PartialBlog};

    #[test]
    fn presence_is_not_truthiness() {
        let author_only: NewBlog = serde_json::from_str(r#"{"author": "X"}"#).unwrap();
        assert!(!author_only.is_identifiable());

        let empty_title: NewBlog = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(empty_title.is_identifiable());

        let url_only: NewBlog =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();
        assert!(url_only.is_identifiable());
    }

    #[test]
    fn likes_default_to_zero() {
        let blog: NewBlog = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert_eq!(blog.into_details().likes, 0);

        let blog: NewBlog = serde_json::from_str(r#"{"title": "T", "likes": 7}"#).unwrap();
        assert_eq!(blog.into_details().likes, 7);
    }

    #[test]
    fn negative_likes_are_rejected() {
        assert!(serde_json::from_str::<NewBlog>(r#"{"title": "T", "likes": -1}"#).is_err());
        assert!(serde_json::from_str::<BlogUpdate>(r#"{"likes": -1}"#).is_err());
    }

    #[test]
    fn likes_beyond_the_limit_are_rejected() {
        let at_limit = format!(r#"{{"title": "T", "likes": {MAX_LIKES}}}"#);
        let blog: NewBlog = serde_json::from_str(&at_limit).unwrap();
        assert_eq!(blog.likes, Some(MAX_LIKES));

        let beyond = MAX_LIKES + 1;
        let new_blog = format!(r#"{{"title": "T", "likes": {beyond}}}"#);
        assert!(serde_json::from_str::<NewBlog>(&new_blog).is_err());
        let update = format!(r#"{{"likes": {}}}"#, u64::MAX);
        assert!(serde_json::from_str::<BlogUpdate>(&update).is_err());

        let explicit_null: BlogUpdate = serde_json::from_str(r#"{"likes": null}"#).unwrap();
        assert_eq!(explicit_null.likes, None);
    }

    #[test]
    fn update_applies_present_fields_only() {
        let mut details = BlogDetails {
            title: Some("Old".to_owned()),
            author: Some("Someone".to_owned()),
            url: Some("https://example.com".to_owned()),
            likes: 12,
        };

        let update: BlogUpdate =
            serde_json::from_str(r#"{"likes": 0, "url": "https://ignored.example"}"#).unwrap();
        update.apply_to(&mut details);

        assert_eq!(details.title.as_deref(), Some("Old"));
        assert_eq!(details.author.as_deref(), Some("Someone"));
        assert_eq!(details.url.as_deref(), Some("https://example.com"));
        assert_eq!(details.likes, 0);

        let update: BlogUpdate = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        update.apply_to(&mut details);
        assert_eq!(details.title.as_deref(), Some("New"));
    }

    #[test]
    fn details_are_flattened() {
        let blog = PartialBlog {
            id: 1_u64.into(),
            details: BlogDetails {
                title: Some("T".to_owned()),
                author: None,
                url: None,
                likes: 3,
            },
            user: 2_u64.into(),
        };

        let json = serde_json::to_value(&blog).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "title": "T",
                "author": null,
                "url": null,
                "likes": 3,
                "user": 2,
            })
        );
    }
}
