//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use yatube_core::domain::{
    Author, Group, NewGroup, NewPost, Post, PostChanges, PostDetail, PostFilter, User,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{GroupRepository, PostRepository, UserRepository};

use super::entity::group::{self, Entity as GroupEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL group repository.
pub type PostgresGroupRepository = PostgresBaseRepository<GroupEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(%username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let active: user::ActiveModel = user.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(user_id = %model.id, "User created");
        Ok(model.into())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError> {
        let model = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        let mut active = model.into_active_model();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&self.db).await.map_err(map_db_err)?;

        Ok(())
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .order_by_asc(group::Column::Title)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let active: group::ActiveModel = group.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(group_id = model.id, slug = %model.slug, "Group created");
        Ok(model.into())
    }
}

fn feed_query(filter: PostFilter) -> Select<PostEntity> {
    let query = PostEntity::find();
    match filter {
        PostFilter::All => query,
        PostFilter::Group(id) => query.filter(post::Column::GroupId.eq(id)),
        PostFilter::Author(id) => query.filter(post::Column::AuthorId.eq(id)),
    }
}

impl PostgresPostRepository {
    /// Attach authors to posts already joined with their groups.
    async fn with_authors(
        &self,
        rows: Vec<(post::Model, Option<group::Model>)>,
    ) -> Result<Vec<PostDetail>, RepoError> {
        let mut author_ids: Vec<Uuid> = rows.iter().map(|(p, _)| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let authors: HashMap<Uuid, Author> = UserEntity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|model| {
                let user: User = model.into();
                (user.id, user.author())
            })
            .collect();

        rows.into_iter()
            .map(|(post, group)| {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    RepoError::Query(format!("post {} has no author row", post.id))
                })?;
                Ok(PostDetail {
                    post: post.into(),
                    author,
                    group: group.map(Into::into),
                })
            })
            .collect()
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        feed_query(filter).count(&self.db).await.map_err(map_db_err)
    }

    async fn feed(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetail>, RepoError> {
        tracing::debug!(?filter, offset, limit, "Loading feed window");

        let rows = feed_query(filter)
            .find_also_related(GroupEntity)
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.with_authors(rows).await
    }

    async fn find_detail(&self, id: i32) -> Result<Option<PostDetail>, RepoError> {
        let row = PostEntity::find_by_id(id)
            .find_also_related(GroupEntity)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        match row {
            Some(row) => Ok(self.with_authors(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let active: post::ActiveModel = post.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(post_id = model.id, author_id = %model.author_id, "Post created");
        Ok(model.into())
    }

    async fn update(&self, id: i32, changes: PostChanges) -> Result<Post, RepoError> {
        let model = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        let mut active = model.into_active_model();
        active.text = Set(changes.text);
        active.group_id = Set(changes.group_id);
        let model = active.update(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(post_id = model.id, "Post updated");
        Ok(model.into())
    }
}
