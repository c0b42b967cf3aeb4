//! Page models for the askama templates.
//!
//! Every page carries the optional viewer so the shared layout can render
//! the navigation for guests and signed-in users.

use actix_web::HttpResponse;
use actix_web::http::header::{self, ContentType};
use askama::Template;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use yatube_core::Page;
use yatube_core::domain::{Author, Group, PostDetail};
use yatube_core::forms::{FormErrors, PostForm};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;

/// Characters that stay literal in a path segment of a redirect target.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@')
    .remove(b'+');

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexPage {
    pub viewer: Option<Identity>,
    pub page: Page<PostDetail>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupPage {
    pub viewer: Option<Identity>,
    pub group: Group,
    pub page: Page<PostDetail>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfilePage {
    pub viewer: Option<Identity>,
    pub author: Author,
    pub page: Page<PostDetail>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailPage {
    pub viewer: Option<Identity>,
    pub detail: PostDetail,
    pub can_edit: bool,
    pub author_posts: u64,
}

/// One `<option>` of the group select.
pub struct GroupChoice {
    pub id: i32,
    pub title: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormPage {
    pub viewer: Option<Identity>,
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupChoice>,
    pub no_group_selected: bool,
    pub errors: FormErrors,
}

impl PostFormPage {
    /// Form for a new post, empty or re-rendered with what was submitted.
    pub fn create(viewer: Identity, form: &PostForm, groups: &[Group], errors: FormErrors) -> Self {
        Self::build(viewer, false, "/create/".to_string(), form, groups, errors)
    }

    pub fn edit(
        viewer: Identity,
        post_id: i32,
        form: &PostForm,
        groups: &[Group],
        errors: FormErrors,
    ) -> Self {
        let action = format!("/posts/{}/edit/", post_id);
        Self::build(viewer, true, action, form, groups, errors)
    }

    fn build(
        viewer: Identity,
        is_edit: bool,
        action: String,
        form: &PostForm,
        groups: &[Group],
        errors: FormErrors,
    ) -> Self {
        let selected = form.selected_group();
        let groups: Vec<GroupChoice> = groups
            .iter()
            .map(|group| {
                let id = group.id.to_string();
                GroupChoice {
                    id: group.id,
                    title: group.title.clone(),
                    selected: selected == Some(id.as_str()),
                }
            })
            .collect();
        let no_group_selected = !groups.iter().any(|choice| choice.selected);

        Self {
            viewer: Some(viewer),
            is_edit,
            action,
            text: form.text.clone(),
            groups,
            no_group_selected,
            errors,
        }
    }
}

#[derive(Template, Default)]
#[template(path = "users/signup.html")]
pub struct SignupPage {
    pub viewer: Option<Identity>,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template, Default)]
#[template(path = "users/login.html")]
pub struct LoginPage {
    pub viewer: Option<Identity>,
    pub username: String,
    /// Empty when there is nowhere to return to.
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template, Default)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutPage {
    pub viewer: Option<Identity>,
}

#[derive(Template, Default)]
#[template(path = "users/password_change_form.html")]
pub struct PasswordChangePage {
    pub viewer: Option<Identity>,
    pub errors: FormErrors,
}

#[derive(Template, Default)]
#[template(path = "users/password_change_done.html")]
pub struct PasswordChangeDonePage {
    pub viewer: Option<Identity>,
}

#[derive(Template, Default)]
#[template(path = "core/404.html")]
pub struct NotFoundPage {
    pub viewer: Option<Identity>,
}

#[derive(Template, Default)]
#[template(path = "core/500.html")]
pub struct ServerErrorPage {
    pub viewer: Option<Identity>,
}

/// 200 with the rendered page.
pub fn render<T: Template>(page: &T) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page.render()?))
}

/// 302 to a local path.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// `/profile/{username}/` with the username percent-encoded for a header.
pub fn profile_location(username: &str) -> String {
    format!("/profile/{}/", utf8_percent_encode(username, PATH_SEGMENT))
}
