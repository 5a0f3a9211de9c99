use crate::{
    api::{attendance, reports, settings, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::{ApiResponse, ServiceError},
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpRequest, HttpResponse, middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter. A zero rate is treated as one request per minute.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // finish() only fails on zero values
        .unwrap_or_default();
    Governor::new(&cfg)
}

// Malformed bodies, queries and path segments answer with the usual envelope.
fn malformed_input(err: impl std::fmt::Display, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::Validation(err.to_string()).into()
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::done("ok"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.app_data(web::JsonConfig::default().error_handler(malformed_input))
        .app_data(web::QueryConfig::default().error_handler(malformed_input))
        .app_data(web::PathConfig::default().error_handler(malformed_input));

    cfg.route("/health", web::get().to(health));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(from_fn(auth_middleware))
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .route("/me", web::get().to(handlers::me))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/latest")
                            .route(web::get().to(attendance::latest_attendance)),
                    )
                    .service(
                        web::resource("/status").route(web::get().to(attendance::clock_status)),
                    )
                    .service(
                        web::resource("/recent")
                            .route(web::get().to(attendance::recent_attendance)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(attendance::delete_attendance)),
                    )
                    .service(
                        web::resource("/{id}/check-out")
                            .route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/{id}/overtime")
                            .route(web::put().to(attendance::add_overtime)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::post().to(users::create_user))
                            .route(web::get().to(users::list_users)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(users::get_user))
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/summary").route(web::get().to(reports::summary))),
            )
            .service(
                web::scope("/settings")
                    .service(
                        web::resource("")
                            .route(web::get().to(settings::get_settings))
                            .route(web::put().to(settings::update_settings)),
                    )
                    .service(web::resource("/logos").route(web::get().to(settings::list_logos))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, the old refresh token is revoked
