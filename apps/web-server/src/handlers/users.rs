//! Account pages: signup, login, logout, password change.

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, web};
use askama::Template;

use yatube_core::domain::User;
use yatube_core::error::{DomainError, RepoError};
use yatube_core::forms::{
    FormErrors, INVALID_LOGIN, LoginForm, PasswordChangeForm, SignupForm, USERNAME_TAKEN,
    WRONG_OLD_PASSWORD,
};
use yatube_shared::{LoginFormData, NextQuery, PasswordChangeFormData, SignupFormData};

use crate::middleware::auth::{
    Identity, OptionalIdentity, removal_cookie, safe_next, session_cookie,
};
use crate::middleware::error::AppResult;
use crate::pages::{
    LoggedOutPage, LoginPage, PasswordChangeDonePage, PasswordChangePage, SignupPage, redirect,
    render,
};
use crate::state::AppState;

const PASSWORD_CHANGE_DONE_URL: &str = "/auth/password_change/done/";

/// GET /auth/signup/
pub async fn signup_form(viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    render(&SignupPage {
        viewer: viewer.0,
        ..SignupPage::default()
    })
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    form: web::Form<SignupFormData>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let form = SignupForm {
        first_name: form.first_name,
        last_name: form.last_name,
        username: form.username,
        email: form.email,
        password1: form.password1,
        password2: form.password2,
    };

    let rerender = |errors: FormErrors| {
        render(&SignupPage {
            viewer: viewer.0.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            errors,
        })
    };

    let signup = match form.clean() {
        Ok(signup) => signup,
        Err(errors) => return rerender(errors),
    };

    if state.users.find_by_username(&signup.username).await?.is_some() {
        let mut errors = FormErrors::new();
        errors.add("username", USERNAME_TAKEN);
        return rerender(errors);
    }

    let passwords = state.passwords.clone();
    let password = signup.password;
    let password_hash = web::block(move || passwords.hash(&password)).await??;

    let user = User::new(signup.username, password_hash)
        .with_names(signup.first_name, signup.last_name)
        .with_email(signup.email);

    match state.users.create(user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
            Ok(redirect("/"))
        }
        // Lost a race with a concurrent signup for the same name.
        Err(RepoError::Constraint(_)) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            rerender(errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/login/
pub async fn login_form(
    viewer: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    render(&LoginPage {
        viewer: viewer.0,
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
        ..LoginPage::default()
    })
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginFormData>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref()).map(str::to_string);
    let login = LoginForm {
        username: form.username,
        password: form.password,
    };

    let rerender = |errors: FormErrors| {
        render(&LoginPage {
            viewer: None,
            username: login.username.clone(),
            next: next.clone().unwrap_or_default(),
            errors,
        })
    };

    let (username, password) = match login.clean() {
        Ok(credentials) => credentials,
        Err(errors) => return rerender(errors),
    };

    let user = match state.users.find_by_username(&username).await? {
        Some(user) => user,
        None => {
            tracing::debug!(username = %username, "Login for unknown user");
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            return rerender(errors);
        }
    };

    let passwords = state.passwords.clone();
    let hash = user.password_hash.clone();
    let valid = web::block(move || passwords.verify(&password, &hash)).await??;
    if !valid {
        tracing::warn!(username = %username, "Login with wrong password");
        let mut errors = FormErrors::new();
        errors.add_non_field(INVALID_LOGIN);
        return rerender(errors);
    }

    let token = state.tokens.generate_token(user.id, &user.username)?;
    let cookie = session_cookie(
        token,
        state.tokens.expiration_seconds(),
        state.secure_cookies,
    );
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Found()
        .cookie(cookie)
        .insert_header((header::LOCATION, next.as_deref().unwrap_or("/")))
        .finish())
}

/// GET|POST /auth/logout/
pub async fn logout(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let body = LoggedOutPage::default().render()?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(state.secure_cookies))
        .content_type(ContentType::html())
        .body(body))
}

/// GET /auth/password_change/
pub async fn password_change_form(identity: Identity) -> AppResult<HttpResponse> {
    render(&PasswordChangePage {
        viewer: Some(identity),
        errors: FormErrors::new(),
    })
}

/// POST /auth/password_change/
pub async fn password_change(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PasswordChangeFormData>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let form = PasswordChangeForm {
        old_password: form.old_password,
        new_password1: form.new_password1,
        new_password2: form.new_password2,
    };

    let change = match form.clean(&identity.username) {
        Ok(change) => change,
        Err(errors) => {
            return render(&PasswordChangePage {
                viewer: Some(identity),
                errors,
            });
        }
    };

    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user", identity.user_id))?;

    let passwords = state.passwords.clone();
    let old_password = change.old_password;
    let hash = user.password_hash;
    if !web::block(move || passwords.verify(&old_password, &hash)).await?? {
        let mut errors = FormErrors::new();
        errors.add("old_password", WRONG_OLD_PASSWORD);
        return render(&PasswordChangePage {
            viewer: Some(identity),
            errors,
        });
    }

    let passwords = state.passwords.clone();
    let new_password = change.new_password;
    let new_hash = web::block(move || passwords.hash(&new_password)).await??;
    state.users.update_password(user.id, new_hash).await?;
    tracing::info!(user_id = %user.id, "Password changed");

    Ok(redirect(PASSWORD_CHANGE_DONE_URL))
}

/// GET /auth/password_change/done/
pub async fn password_change_done(identity: Identity) -> AppResult<HttpResponse> {
    render(&PasswordChangeDonePage {
        viewer: Some(identity),
    })
}
