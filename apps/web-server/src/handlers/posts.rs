//! Feed, detail and authoring pages.

use actix_web::{HttpResponse, web};

use yatube_core::domain::{NewPost, PostFilter};
use yatube_core::error::DomainError;
use yatube_core::forms::{FormErrors, PostForm};
use yatube_core::pagination::feed_page;
use yatube_shared::{PageQuery, PostFormData};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::pages::{
    GroupPage, IndexPage, PostDetailPage, PostFormPage, ProfilePage, profile_location, redirect,
    render,
};
use crate::state::AppState;

/// Home feed: every post, newest first.
///
/// GET /
pub async fn index(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = feed_page(state.posts.as_ref(), PostFilter::All, query.page.as_deref()).await?;

    render(&IndexPage {
        viewer: viewer.0,
        page,
    })
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("group", slug.as_str()))?;

    let page = feed_page(
        state.posts.as_ref(),
        PostFilter::Group(group.id),
        query.page.as_deref(),
    )
    .await?;

    render(&GroupPage {
        viewer: viewer.0,
        group,
        page,
    })
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", username.as_str()))?;

    let page = feed_page(
        state.posts.as_ref(),
        PostFilter::Author(user.id),
        query.page.as_deref(),
    )
    .await?;

    render(&ProfilePage {
        viewer: viewer.0,
        author: user.author(),
        page,
    })
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let detail = state
        .posts
        .find_detail(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("post", post_id))?;

    let author_posts = state
        .posts
        .count(PostFilter::Author(detail.author.id))
        .await?;
    let can_edit = viewer
        .0
        .as_ref()
        .is_some_and(|identity| detail.post.is_authored_by(identity.user_id));

    render(&PostDetailPage {
        viewer: viewer.0,
        detail,
        can_edit,
        author_posts,
    })
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list().await?;
    render(&PostFormPage::create(
        identity,
        &PostForm::default(),
        &groups,
        FormErrors::new(),
    ))
}

/// POST /create/
///
/// The author is always the signed-in user; the form has no author field.
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PostFormData>,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list().await?;
    let form = PostForm::new(form.text.clone(), form.group.clone());

    match form.clean(&groups) {
        Ok(changes) => {
            let post = state
                .posts
                .create(NewPost::new(identity.user_id, changes.text, changes.group_id))
                .await?;
            tracing::info!(post_id = post.id, author = %identity.username, "Post created");

            Ok(redirect(&profile_location(&identity.username)))
        }
        Err(errors) => render(&PostFormPage::create(identity, &form, &groups, errors)),
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let (post, groups) = futures::try_join!(state.posts.find_by_id(post_id), state.groups.list())?;
    let post = post.ok_or_else(|| DomainError::not_found("post", post_id))?;

    if !post.is_authored_by(identity.user_id) {
        return Ok(redirect(&post.url()));
    }

    let form = PostForm {
        text: post.text,
        group: post.group_id.map(|id| id.to_string()),
    };
    render(&PostFormPage::edit(
        identity,
        post_id,
        &form,
        &groups,
        FormErrors::new(),
    ))
}

/// POST /posts/{post_id}/edit/
///
/// Only text and group change. A non-author is sent back to the post.
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<String>,
    form: web::Form<PostFormData>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&post_id)?;
    let (post, groups) = futures::try_join!(state.posts.find_by_id(post_id), state.groups.list())?;
    let post = post.ok_or_else(|| DomainError::not_found("post", post_id))?;

    if !post.is_authored_by(identity.user_id) {
        tracing::debug!(post_id, user = %identity.username, "Edit by non-author ignored");
        return Ok(redirect(&post.url()));
    }

    let form = PostForm::new(form.text.clone(), form.group.clone());
    match form.clean(&groups) {
        Ok(changes) => {
            let post = state.posts.update(post_id, changes).await?;
            tracing::info!(post_id, "Post updated");

            Ok(redirect(&post.url()))
        }
        Err(errors) => render(&PostFormPage::edit(identity, post_id, &form, &groups, errors)),
    }
}

/// A post id that is not an integer names no post.
fn parse_post_id(raw: &str) -> Result<i32, DomainError> {
    raw.parse().map_err(|_| DomainError::not_found("post", raw))
}
