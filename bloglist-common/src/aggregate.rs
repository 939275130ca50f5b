//! Summary statistics over a list of blogs.

use crate::model::blog::BlogDetails;
use serde::{Deserialize, Serialize};

/// The most liked blog, reduced to what identifies it.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct FavoriteBlog {
    pub title: Option<String>,
    pub author: Option<String>,
    pub likes: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct BlogSummary {
    pub total_likes: u64,
    pub favorite: Option<FavoriteBlog>,
}

/// Sums the likes of all blogs. The sum saturates at [`u64::MAX`], so it is
/// never less than the likes of any single blog.
#[must_use]
pub fn total_likes<B: AsRef<BlogDetails>>(blogs: &[B]) -> u64 {
    if blogs.is_empty() {
        return 0;
    }

    blogs
        .iter()
        .map(|blog| blog.as_ref().likes)
        .fold(0, u64::saturating_add)
}

/// Returns the first blog with the highest like count, or `None` if there
/// are no blogs.
#[must_use]
pub fn favorite_blog<B: AsRef<BlogDetails>>(blogs: &[B]) -> Option<FavoriteBlog> {
    // `Iterator::max_by_key` would pick the last of several equal maxima.
    let favorite = blogs
        .iter()
        .map(AsRef::<BlogDetails>::as_ref)
        .reduce(|best, blog| if blog.likes > best.likes { blog } else { best })?;

    Some(FavoriteBlog {
        title: favorite.title.clone(),
        author: favorite.author.clone(),
        likes: favorite.likes,
    })
}

#[must_use]
pub fn summarize<B: AsRef<BlogDetails>>(blogs: &[B]) -> BlogSummary {
    BlogSummary {
        total_likes: total_likes(blogs),
        favorite: favorite_blog(blogs),
    }
}
