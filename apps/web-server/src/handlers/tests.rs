use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{NormalizePath, TrailingSlash, from_fn};
use actix_web::{App, test, web};
use tracing_actix_web::TracingLogger;

use yatube_core::domain::{Group, NewGroup, NewPost, Post, PostFilter, User};
use yatube_core::forms::{INVALID_LOGIN, USERNAME_TAKEN};
use yatube_core::ports::PasswordService;
use yatube_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

use super::{configure_routes, not_found};
use crate::middleware::auth::SESSION_COOKIE;
use crate::observability;
use crate::state::{AppState, Repositories};

const PASSWORD: &str = "correct-horse-42";
const POST_MARKER: &str = "<article class=\"post\">";

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .wrap(NormalizePath::new(TrailingSlash::Always))
                .wrap(from_fn(observability::request_id))
                .wrap(TracingLogger::default())
                .configure(configure_routes)
                .default_service(web::to(not_found)),
        )
        .await
    };
}

struct Fixture {
    state: AppState,
    passwords: Arc<Argon2PasswordService>,
    author: User,
    group: Group,
    post: Post,
}

impl Fixture {
    async fn new() -> Self {
        let passwords = Arc::new(Argon2PasswordService::with_cost(8, 1, 1).unwrap());
        let state = AppState::from_parts(
            Repositories::in_memory(),
            Arc::new(JwtTokenService::new(JwtConfig::default())),
            passwords.clone(),
            false,
        );

        let author = state
            .users
            .create(User::new(
                "HasNoName".to_string(),
                passwords.hash(PASSWORD).unwrap(),
            ))
            .await
            .unwrap();
        let group = state
            .groups
            .create(NewGroup::new("Тестовая группа", "test-slug", "Тестовое описание").unwrap())
            .await
            .unwrap();
        let post = state
            .posts
            .create(NewPost::new(
                author.id,
                "Тестовый пост".to_string(),
                Some(group.id),
            ))
            .await
            .unwrap();

        Self {
            state,
            passwords,
            author,
            group,
            post,
        }
    }

    async fn user(&self, username: &str) -> User {
        self.state
            .users
            .create(User::new(
                username.to_string(),
                self.passwords.hash(PASSWORD).unwrap(),
            ))
            .await
            .unwrap()
    }

    /// A session cookie for `user`, as if they had logged in.
    fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        Cookie::new(SESSION_COOKIE, token)
    }
}

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_of<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn public_pages_are_open_to_guests() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    for uri in [
        "/".to_string(),
        "/group/test-slug/".to_string(),
        "/profile/HasNoName/".to_string(),
        format!("/posts/{}/", fx.post.id),
        "/auth/signup/".to_string(),
        "/auth/login/".to_string(),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }
}

#[actix_web::test]
async fn guests_are_sent_to_login_with_next() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    for (uri, expected) in [
        ("/create/", "/auth/login/?next=/create/"),
        ("/posts/1/edit/", "/auth/login/?next=/posts/1/edit/"),
        ("/posts/999999/edit/", "/auth/login/?next=/posts/999999/edit/"),
        (
            "/auth/password_change/",
            "/auth/login/?next=/auth/password_change/",
        ),
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&resp), expected);
    }
}

#[actix_web::test]
async fn paths_without_trailing_slash_are_normalized() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::get().uri("/group/test-slug").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/create").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let req = test::TestRequest::get().uri("/unexisting_page").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn session_of_deleted_user_counts_as_guest() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let ghost = fx.user("ghost").await;
    let cookie = fx.session(&ghost);
    fx.state.users.delete(ghost.id).await.unwrap();

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(cookie.clone())
        .set_form(vec![("text", "Текст призрака"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
    assert_eq!(fx.state.posts.count(PostFilter::All).await.unwrap(), 1);

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("Регистрация"));
}

#[actix_web::test]
async fn author_can_open_create_and_edit_forms() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let cookie = fx.session(&fx.author);

    for uri in ["/create/".to_string(), fx.post.edit_url()] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }
}

#[actix_web::test]
async fn unknown_pages_are_not_found() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    for uri in [
        "/posts/999999/",
        "/posts/not-a-number/",
        "/unexisting_page/",
        "/group/no-such-group/",
        "/profile/nobody/",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn editing_an_unknown_post_is_not_found_for_signed_in_users() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/posts/999999/edit/")
        .cookie(fx.session(&fx.author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn created_post_belongs_to_the_signed_in_user() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let other = fx.user("someone-else").await;

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form(vec![
            ("text", "Тестовый текст2"),
            ("group", ""),
            ("author", other.id.to_string().as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/HasNoName/");

    let created = fx
        .state
        .posts
        .feed(PostFilter::All, 0, 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(created.post.text, "Тестовый текст2");
    assert_eq!(created.author.id, fx.author.id);
    assert_eq!(created.group, None);

    let req = test::TestRequest::get()
        .uri("/profile/HasNoName/")
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Тестовый текст2"));
}

#[actix_web::test]
async fn long_post_text_is_accepted() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let text = "Ж".repeat(3000);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form(vec![("text", text.as_str()), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/HasNoName/");

    assert_eq!(fx.state.posts.count(PostFilter::All).await.unwrap(), 2);
    let created = fx
        .state
        .posts
        .feed(PostFilter::All, 0, 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(created.post.text, text);
}

#[actix_web::test]
async fn blank_post_is_rejected_and_not_saved() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form(vec![("text", "   "), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("This field is required."));

    assert_eq!(fx.state.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[actix_web::test]
async fn post_with_unknown_group_is_rejected() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form(vec![("text", "Текст"), ("group", "4242")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("Select a valid choice."));

    assert_eq!(fx.state.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[actix_web::test]
async fn post_with_group_shows_on_its_feeds_only() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    fx.state
        .groups
        .create(NewGroup::new("Другая группа", "other-slug", "").unwrap())
        .await
        .unwrap();

    let group_id = fx.group.id.to_string();
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form(vec![("text", "Пост в группе"), ("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    for uri in ["/", "/group/test-slug/", "/profile/HasNoName/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body = body_of(test::call_service(&app, req).await).await;
        assert!(body.contains("Пост в группе"), "{uri}");
    }

    let req = test::TestRequest::get()
        .uri("/group/other-slug/")
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(!body.contains("Пост в группе"));
    assert_eq!(body.matches(POST_MARKER).count(), 0);
}

#[actix_web::test]
async fn author_edits_text_and_group() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri(&fx.post.edit_url())
        .cookie(fx.session(&fx.author))
        .set_form(vec![("text", "Изменённый текст"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), fx.post.url());

    let edited = fx.state.posts.find_by_id(fx.post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Изменённый текст");
    assert_eq!(edited.group_id, None);
    assert_eq!(edited.author_id, fx.author.id);
    assert_eq!(edited.pub_date, fx.post.pub_date);
}

#[actix_web::test]
async fn non_author_edit_redirects_without_changes() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let intruder = fx.user("intruder").await;
    let cookie = fx.session(&intruder);

    let req = test::TestRequest::get()
        .uri(&fx.post.edit_url())
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), fx.post.url());

    let req = test::TestRequest::post()
        .uri(&fx.post.edit_url())
        .cookie(cookie)
        .set_form(vec![("text", "Взлом"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), fx.post.url());

    let unchanged = fx.state.posts.find_by_id(fx.post.id).await.unwrap().unwrap();
    assert_eq!(unchanged, fx.post);
}

#[actix_web::test]
async fn detail_offers_edit_link_to_author_only() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let other = fx.user("reader").await;
    let uri = fx.post.url();

    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(fx.session(&fx.author))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("редактировать запись"));

    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(fx.session(&other))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(!body.contains("редактировать запись"));
}

#[actix_web::test]
async fn feeds_paginate_by_ten() {
    let fx = Fixture::new().await;
    for i in 0..12 {
        fx.state
            .posts
            .create(NewPost::new(
                fx.author.id,
                format!("Пост номер {i}"),
                Some(fx.group.id),
            ))
            .await
            .unwrap();
    }
    let app = app!(fx.state);

    for feed in ["/", "/group/test-slug/", "/profile/HasNoName/"] {
        for (page, expected) in [
            ("", 10),
            ("?page=2", 3),
            ("?page=99", 3),
            ("?page=abc", 10),
            ("?page=1&page=2", 3),
        ] {
            let uri = format!("{feed}{page}");
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let body = body_of(resp).await;
            assert_eq!(body.matches(POST_MARKER).count(), expected, "{uri}");
        }
    }
}

#[actix_web::test]
async fn deleting_group_keeps_its_posts() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    fx.state.groups.delete(fx.group.id).await.unwrap();

    let post = fx.state.posts.find_by_id(fx.post.id).await.unwrap().unwrap();
    assert_eq!(post.group_id, None);
    assert_eq!(post.text, fx.post.text);

    let req = test::TestRequest::get().uri(&fx.post.url()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::get().uri("/group/test-slug/").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn deleting_user_deletes_their_posts() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    fx.state.users.delete(fx.author.id).await.unwrap();

    assert!(fx.state.posts.find_by_id(fx.post.id).await.unwrap().is_none());
    let req = test::TestRequest::get().uri(&fx.post.url()).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn signup_then_login_returns_to_next() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form(vec![
            ("first_name", "Лев"),
            ("last_name", "Толстой"),
            ("username", "leo"),
            ("email", "leo@example.com"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp.response().cookies().next().is_none());

    let user = fx.state.users.find_by_username("leo").await.unwrap().unwrap();
    assert_eq!(user.first_name, "Лев");
    assert_ne!(user.password_hash, PASSWORD);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(vec![
            ("username", "leo"),
            ("password", PASSWORD),
            ("next", "/create/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();
    assert_eq!(session.http_only(), Some(true));

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(session)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn signup_rejects_taken_username() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form(vec![
            ("username", "HasNoName"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains(USERNAME_TAKEN));
}

#[actix_web::test]
async fn login_rejects_wrong_password_and_offsite_next() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(vec![("username", "HasNoName"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().next().is_none());
    assert!(body_of(resp).await.contains(INVALID_LOGIN));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(vec![
            ("username", "HasNoName"),
            ("password", PASSWORD),
            ("next", "//evil.example/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn logout_clears_session() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/logout/")
        .cookie(fx.session(&fx.author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert_eq!(cleared.value(), "");
}

#[actix_web::test]
async fn password_change_requires_old_password() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);
    let cookie = fx.session(&fx.author);
    let new_password = "brand-new-secret-7";

    let req = test::TestRequest::post()
        .uri("/auth/password_change/")
        .cookie(cookie.clone())
        .set_form(vec![
            ("old_password", "not-my-password"),
            ("new_password1", new_password),
            ("new_password2", new_password),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/password_change/")
        .cookie(cookie.clone())
        .set_form(vec![
            ("old_password", PASSWORD),
            ("new_password1", new_password),
            ("new_password2", new_password),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/password_change/done/");

    let user = fx
        .state
        .users
        .find_by_id(fx.author.id)
        .await
        .unwrap()
        .unwrap();
    assert!(fx.passwords.verify(new_password, &user.password_hash).unwrap());
    assert!(!fx.passwords.verify(PASSWORD, &user.password_hash).unwrap());

    let req = test::TestRequest::get()
        .uri("/auth/password_change/done/")
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn health_reports_storage_and_echoes_request_id() {
    let fx = Fixture::new().await;
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/health/")
        .insert_header(("x-request-id", "req-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "req-123"
    );

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["request_id"], "req-123");
}
