//! Session cookie authentication and extractors.

use std::fmt;

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use futures::future::LocalBoxFuture;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use uuid::Uuid;

use yatube_core::domain::User;
use yatube_core::ports::AuthError;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "yatube_session";

pub const LOGIN_URL: &str = "/auth/login/";

/// Unreserved characters plus `/` stay literal in the `next` parameter.
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Authenticated user identity extractor.
///
/// Handlers that take an `Identity` are login-only; a request without a
/// valid session is redirected to the login page with `next` set to the
/// requested path:
/// ```ignore
/// async fn post_create(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
        }
    }
}

impl Identity {
    /// The session's user, or `None` for a missing or invalid token and for
    /// a token whose user no longer exists.
    async fn from_session(req: &HttpRequest) -> Result<Option<Self>, AppError> {
        let state = req.app_data::<web::Data<AppState>>().cloned().ok_or_else(|| {
            tracing::error!("AppState not found in app data");
            AppError::Internal("Server configuration error".to_string())
        })?;

        let claims = match req
            .cookie(SESSION_COOKIE)
            .ok_or(AuthError::MissingAuth)
            .and_then(|cookie| state.tokens.validate_token(cookie.value()))
        {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(path = %req.path(), reason = %e, "No valid session");
                return Ok(None);
            }
        };

        match state.users.find_by_id(claims.user_id).await? {
            Some(user) => Ok(Some(Identity::from(user))),
            None => {
                tracing::debug!(user_id = %claims.user_id, "Session for a deleted user");
                Ok(None)
            }
        }
    }
}

/// Rejection for login-only routes: a redirect to the login form.
#[derive(Debug)]
pub struct LoginRequired {
    next: String,
}

impl LoginRequired {
    pub fn for_request(req: &HttpRequest) -> Self {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        Self { next }
    }

    pub fn location(&self) -> String {
        login_url(&self.next)
    }
}

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "login required for {}", self.next)
    }
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, self.location()))
            .finish()
    }
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match Identity::from_session(&req).await? {
                Some(identity) => Ok(identity),
                None => Err(LoginRequired::for_request(&req).into()),
            }
        })
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
#[derive(Debug, Clone, Default)]
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { Ok(OptionalIdentity(Identity::from_session(&req).await?)) })
    }
}

/// `/auth/login/?next=<path>`.
pub fn login_url(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", utf8_percent_encode(next, NEXT_PARAM))
}

/// Accept a post-login target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| {
        n.starts_with('/')
            && !n.starts_with("//")
            && !n.contains('\\')
            && n.bytes().all(|b| b.is_ascii_graphic())
    })
}

pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish();
    cookie.make_removal();
    cookie
}
