use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use mongodb::bson::doc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::user::{Profile, Role, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Deserialize)]
pub struct RegisterInfo {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email regex is valid"))
        .is_match(email)
}

fn user_summary(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.user_id,
        "email": user.email,
        "role": user.role,
        "is_approved": user.is_approved,
    })
}

/// POST /auth/register
pub async fn register(
    data: web::Data<AppState>,
    info: web::Json<RegisterInfo>,
) -> impl Responder {
    if !is_valid_email(&info.email) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Please use a valid email" }));
    }
    if info.password.len() < 6 {
        return HttpResponse::BadRequest().json(
            serde_json::json!({ "success": false, "message": "Password must be at least 6 characters" }),
        );
    }

    let users = data.mongodb.db.collection::<User>("users");
    match users.find_one(doc! { "email": info.email.to_lowercase() }).await {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "success": false, "message": "User already exists" }));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Error checking existing user: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error creating user" }));
        }
    }

    let hashed_password = match hash(&info.password, DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            error!("Error hashing password: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error creating user" }));
        }
    };

    // Mentors start unapproved; mentees and admins are approved on creation.
    let new_user = User {
        user_id: Uuid::new_v4().to_string(),
        email: info.email.to_lowercase(),
        password: hashed_password,
        role: info.role,
        is_approved: info.role != Role::Mentor,
        is_active: true,
        profile: Profile {
            full_name: info.full_name.clone(),
            ..Profile::default()
        },
        created_at: Utc::now(),
    };

    if let Err(e) = users.insert_one(&new_user).await {
        error!("Error inserting user: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error creating user" }));
    }

    let token = match create_jwt(&new_user.user_id, &data.config.jwt_secret) {
        Ok(t) => t,
        Err(e) => {
            error!("Error signing token: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error creating user" }));
        }
    };

    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "token": token,
        "user": user_summary(&new_user),
    }))
}

/// POST /auth/login
pub async fn login(data: web::Data<AppState>, info: web::Json<LoginInfo>) -> impl Responder {
    let users = data.mongodb.db.collection::<User>("users");
    let user = match users.find_one(doc! { "email": info.email.to_lowercase() }).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Invalid credentials" }));
        }
        Err(e) => {
            error!("Error logging in: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error logging in" }));
        }
    };

    if !user.is_active || !verify(&info.password, &user.password).unwrap_or(false) {
        return HttpResponse::Unauthorized()
            .json(serde_json::json!({ "success": false, "message": "Invalid credentials" }));
    }

    let token = match create_jwt(&user.user_id, &data.config.jwt_secret) {
        Ok(t) => t,
        Err(e) => {
            error!("Error signing token: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error logging in" }));
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "user": user_summary(&user),
    }))
}

/// GET /auth/me
pub async fn get_me(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };

    let users = data.mongodb.db.collection::<User>("users");
    match users.find_one(doc! { "user_id": &current_user }).await {
        Ok(Some(user)) => HttpResponse::Ok()
            .json(serde_json::json!({ "success": true, "user": user.sanitized() })),
        Ok(None) => HttpResponse::NotFound()
            .json(serde_json::json!({ "success": false, "message": "User not found" })),
        Err(e) => {
            error!("Error fetching current user: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching user" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip() {
        let token = create_jwt("user-123", "secret").unwrap();
        let claims = validate_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-123");
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("user-123", "secret").unwrap();
        assert!(validate_jwt(&token, "other").is_err());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("mentee@uni.edu"));
        assert!(is_valid_email("a.b+c@example.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }
}
