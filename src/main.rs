// src/main.rs

mod admin;
mod app_state;
mod auth;
mod booking;
mod config;
mod db;
mod mentor;
mod models;
mod notify;
mod review;

use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};

use crate::admin::{approve_mentor, get_analytics, get_pending_mentors, reject_mentor};
use crate::app_state::AppState;
use crate::auth::{get_me, login, register, validate_jwt};
use crate::booking::{
    book_session, cancel_session, complete_session, get_session, get_user_sessions,
};
use crate::mentor::{
    complete_mentor_profile, get_mentor_profile, search_mentors, update_availability,
};
use crate::review::{get_user_reviews, submit_review};

#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present;
        // the caller's user id lands in request extensions for the handlers.
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim().to_string();
                    match verify_token(&token) {
                        Ok(user_id) => {
                            req.extensions_mut().insert(user_id);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .json(serde_json::json!({
                                    "success": false,
                                    "message": format!("Invalid token: {}", e),
                                }))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

fn verify_token(token: &str) -> Result<String, String> {
    let secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
    match validate_jwt(token, &secret) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => Err(format!("Token decode error: {}", e)),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);

    let frontend_origin =
        env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("Server running at http://0.0.0.0:8080");
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                config: config.clone(),
            }))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/me", web::get().to(get_me)),
            )
            // MENTORS
            .service(
                web::scope("/mentors")
                    .route("/search", web::get().to(search_mentors))
                    .route("/profile", web::put().to(complete_mentor_profile))
                    .route("/availability", web::put().to(update_availability))
                    .route("/{id}", web::get().to(get_mentor_profile)),
            )
            // SESSIONS
            .service(
                web::scope("/sessions")
                    .route("", web::post().to(book_session))
                    .route("", web::get().to(get_user_sessions))
                    .route("/{id}", web::get().to(get_session))
                    .route("/{id}/complete", web::post().to(complete_session))
                    .route("/{id}/cancel", web::post().to(cancel_session)),
            )
            // REVIEWS
            .service(
                web::scope("/reviews")
                    .route("", web::post().to(submit_review))
                    .route("/user/{id}", web::get().to(get_user_reviews)),
            )
            // ADMIN
            .service(
                web::scope("/admin")
                    .route("/mentors/pending", web::get().to(get_pending_mentors))
                    .route("/mentors/{id}/approve", web::post().to(approve_mentor))
                    .route("/mentors/{id}/reject", web::post().to(reject_mentor))
                    .route("/analytics", web::get().to(get_analytics)),
            )
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
