//! In-memory store - used when no database is configured, and in tests.
//!
//! All three tables live behind one lock so the referential actions run
//! atomically with the delete that triggers them: removing a user removes
//! their posts, removing a group clears `group_id` on its posts.
//! Data is lost on process restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{
    Group, NewGroup, NewPost, Post, PostChanges, PostDetail, PostFilter, User,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, GroupRepository, PostRepository, UserRepository};

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i32, Group>,
    posts: BTreeMap<i32, Post>,
    last_group_id: i32,
    last_post_id: i32,
}

impl Tables {
    fn detail(&self, post: &Post) -> Result<PostDetail, RepoError> {
        let author = self
            .users
            .get(&post.author_id)
            .map(User::author)
            .ok_or_else(|| RepoError::Query(format!("post {} has no author row", post.id)))?;
        let group = post.group_id.and_then(|id| self.groups.get(&id).cloned());

        Ok(PostDetail {
            post: post.clone(),
            author,
            group,
        })
    }

    /// Posts matching `filter`, newest first.
    fn feed(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.values().filter(|p| filter.matches(p)).collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Shared tables backing the in-memory repositories.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn users(self: &Arc<Self>) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: Arc::clone(self),
        }
    }

    pub fn groups(self: &Arc<Self>) -> InMemoryGroupRepository {
        InMemoryGroupRepository {
            store: Arc::clone(self),
        }
    }

    pub fn posts(self: &Arc<Self>) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: Arc::clone(self),
        }
    }
}

pub struct InMemoryUserRepository {
    store: Arc<InMemoryStore>,
}

pub struct InMemoryGroupRepository {
    store: Arc<InMemoryStore>,
}

pub struct InMemoryPostRepository {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.tables.read().await.users.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        let before = tables.posts.len();
        tables.posts.retain(|_, post| post.author_id != id);
        tracing::debug!(
            user_id = %id,
            posts_removed = before - tables.posts.len(),
            "User deleted"
        );
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username {:?} already exists",
                user.username
            )));
        }
        if tables.users.contains_key(&user.id) {
            return Err(RepoError::Constraint(format!("user {} already exists", user.id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Group, i32> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, RepoError> {
        Ok(self.store.tables.read().await.groups.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.groups.remove(&id).ok_or(RepoError::NotFound)?;

        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        tracing::debug!(group_id = id, "Group deleted");
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "slug {:?} already exists",
                group.slug
            )));
        }

        tables.last_group_id += 1;
        let group = Group {
            id: tables.last_group_id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }
}

#[async_trait]
impl BaseRepository<Post, i32> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        Ok(self.store.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.posts.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn feed(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetail>, RepoError> {
        let tables = self.store.tables.read().await;
        tables
            .feed(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| tables.detail(post))
            .collect()
    }

    async fn find_detail(&self, id: i32) -> Result<Option<PostDetail>, RepoError> {
        let tables = self.store.tables.read().await;
        tables.posts.get(&id).map(|post| tables.detail(post)).transpose()
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint(format!(
                "author {} does not exist",
                post.author_id
            )));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(RepoError::Constraint(format!(
                    "group {group_id} does not exist"
                )));
            }
        }

        tables.last_post_id += 1;
        let post = Post {
            id: tables.last_post_id,
            text: post.text,
            pub_date: post.pub_date,
            author_id: post.author_id,
            group_id: post.group_id,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: i32, changes: PostChanges) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        if let Some(group_id) = changes.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(RepoError::Constraint(format!(
                    "group {group_id} does not exist"
                )));
            }
        }

        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.text = changes.text;
        post.group_id = changes.group_id;
        Ok(post.clone())
    }
}
