//! HTTP handlers and route configuration.

mod health;
mod posts;
mod users;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};

/// Largest accepted form body; post text has no length limit of its own.
const FORM_LIMIT: usize = 4 * 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(FORM_LIMIT))
        .route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/health/", web::get().to(health::health_check))
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(users::signup_form))
                        .route(web::post().to(users::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(users::login_form))
                        .route(web::post().to(users::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(users::logout))
                        .route(web::post().to(users::logout)),
                )
                .service(
                    web::resource("/password_change/")
                        .route(web::get().to(users::password_change_form))
                        .route(web::post().to(users::password_change)),
                )
                .route(
                    "/password_change/done/",
                    web::get().to(users::password_change_done),
                ),
        );
}

/// Fallback for unmatched paths.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    Err(AppError::NotFound(req.path().to_string()))
}
