use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const SLUG_MAX_CHARS: usize = 255;

/// Group entity - a category posts may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub fn url(&self) -> String {
        format!("/group/{}/", self.slug)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A group that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    /// Validate title and slug bounds before the group reaches the store.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        let slug = slug.into();

        if title.trim().is_empty() {
            return Err(DomainError::Validation("group title is required".into()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::Validation(format!(
                "group title must be at most {TITLE_MAX_CHARS} characters"
            )));
        }
        if !is_valid_slug(&slug) {
            return Err(DomainError::Validation(format!("invalid slug: {slug:?}")));
        }

        Ok(Self {
            title,
            slug,
            description: description.into(),
        })
    }
}

/// Letters, digits, hyphens and underscores only.
pub fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > SLUG_MAX_CHARS {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_displays_as_title() {
        let group = Group {
            id: 1,
            title: "Тестовая группа".to_string(),
            slug: "test-slug".to_string(),
            description: "Тестовое описание".to_string(),
        };
        assert_eq!(group.to_string(), "Тестовая группа");
        assert_eq!(group.url(), "/group/test-slug/");
    }

    #[test]
    fn slug_rules() {
        assert!(is_valid_slug("test-slug"));
        assert!(is_valid_slug("Under_score-42"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("слаг"));
        assert!(!is_valid_slug(&"a".repeat(SLUG_MAX_CHARS + 1)));
    }

    #[test]
    fn new_group_rejects_long_title() {
        let long = "x".repeat(TITLE_MAX_CHARS + 1);
        assert!(matches!(
            NewGroup::new(long, "slug", ""),
            Err(DomainError::Validation(_))
        ));
        assert!(NewGroup::new("x".repeat(TITLE_MAX_CHARS), "slug", "").is_ok());
    }
}
