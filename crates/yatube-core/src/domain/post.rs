use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Author, Group};

/// Characters of the text a post displays as.
const DISPLAY_CHARS: usize = 15;

/// Post entity - a single blog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub group_id: Option<i32>,
}

impl Post {
    /// Canonical location of the post.
    pub fn url(&self) -> String {
        format!("/posts/{}/", self.id)
    }

    pub fn edit_url(&self) -> String {
        format!("/posts/{}/edit/", self.id)
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.text.chars().take(DISPLAY_CHARS).collect();
        f.write_str(&head)
    }
}

/// A post about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub group_id: Option<i32>,
}

impl NewPost {
    pub fn new(author_id: Uuid, text: String, group_id: Option<i32>) -> Self {
        Self {
            text,
            pub_date: Utc::now(),
            author_id,
            group_id,
        }
    }
}

/// The mutable part of a post. Author and publication date never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i32>,
}

/// A post loaded together with its author and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub author: Author,
    pub group: Option<Group>,
}

impl PostDetail {
    pub fn published(&self) -> String {
        self.post.pub_date.format("%d.%m.%Y %H:%M").to_string()
    }
}

/// Which posts a feed lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i32),
    Author(Uuid),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Group(id) => post.group_id == Some(*id),
            PostFilter::Author(id) => post.author_id == *id,
        }
    }
}
