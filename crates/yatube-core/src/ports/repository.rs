use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Group, NewGroup, NewPost, Post, PostChanges, PostDetail, PostFilter, User};
use crate::error::RepoError;

/// Generic repository trait defining lookup and removal by primary key.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository. Deleting a user deletes their posts.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user; a taken username is a `Constraint` error.
    async fn create(&self, user: User) -> Result<User, RepoError>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError>;
}

/// Group repository. Deleting a group clears `group_id` on its posts.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, i32> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// All groups ordered by title, used as form choices.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;

    /// Insert a new group; a taken slug is a `Constraint` error.
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i32> {
    /// Number of posts the filter selects.
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError>;

    /// A window of the filtered feed, newest first, with author and group.
    async fn feed(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetail>, RepoError>;

    async fn find_detail(&self, id: i32) -> Result<Option<PostDetail>, RepoError>;

    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    /// Apply text/group changes; `NotFound` if the post is gone.
    async fn update(&self, id: i32, changes: PostChanges) -> Result<Post, RepoError>;
}
