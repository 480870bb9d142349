use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::doc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::models::user::{Role, User};
use crate::notify::{send_email, Email};

#[derive(Debug, Deserialize)]
pub struct RejectMentorRequest {
    pub reason: Option<String>,
}

async fn require_admin(req: &HttpRequest, data: &AppState) -> Result<User, HttpResponse> {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return Err(HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" })));
        }
    };
    let users = data.mongodb.db.collection::<User>("users");
    match users.find_one(doc! { "user_id": &current_user }).await {
        Ok(Some(user)) if user.role == Role::Admin => Ok(user),
        Ok(_) => Err(HttpResponse::Forbidden()
            .json(serde_json::json!({ "success": false, "message": "Admin access required" }))),
        Err(e) => {
            error!("Error checking admin role: {}", e);
            Err(HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error checking access" })))
        }
    }
}

/// GET /admin/mentors/pending
pub async fn get_pending_mentors(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_admin(&req, data.get_ref()).await {
        return resp;
    }

    let users = data.mongodb.db.collection::<User>("users");
    let filter = doc! { "role": "mentor", "is_approved": false, "is_active": true };
    let mut cursor = match users.find(filter).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching pending mentors: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching mentors" }));
        }
    };

    let mut mentors = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(user) => mentors.push(user.sanitized()),
            Err(e) => {
                error!("Cursor error while fetching pending mentors: {}", e);
                return HttpResponse::InternalServerError().json(
                    serde_json::json!({ "success": false, "message": "Error reading mentors" }),
                );
            }
        }
    }

    HttpResponse::Ok().json(serde_json::json!({ "success": true, "mentors": mentors }))
}

/// POST /admin/mentors/{id}/approve
pub async fn approve_mentor(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_admin(&req, data.get_ref()).await {
        return resp;
    }
    let mentor_id = path.into_inner();

    let users = data.mongodb.db.collection::<User>("users");
    let mentor = match users.find_one(doc! { "user_id": &mentor_id }).await {
        Ok(Some(u)) if u.role == Role::Mentor => u,
        Ok(_) => {
            return HttpResponse::NotFound()
                .json(serde_json::json!({ "success": false, "message": "Mentor not found" }));
        }
        Err(e) => {
            error!("Error fetching mentor {}: {}", mentor_id, e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error approving mentor" }));
        }
    };

    if let Err(e) = users
        .update_one(
            doc! { "user_id": &mentor_id },
            doc! { "$set": { "is_approved": true } },
        )
        .await
    {
        error!("Error approving mentor {}: {}", mentor_id, e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error approving mentor" }));
    }
    info!("Mentor {} approved", mentor_id);

    send_email(
        &data.config.email_from,
        &Email {
            to: mentor.email,
            subject: "You're Now a Verified Mentor!".to_string(),
            body: format!(
                "Congratulations, {}! Your mentor profile is approved.",
                mentor.profile.full_name
            ),
        },
    );

    HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": "Mentor approved" }))
}

/// POST /admin/mentors/{id}/reject
///
/// Rejection deactivates the account; the mentor stays visible only in the
/// database, never in search or booking.
pub async fn reject_mentor(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<RejectMentorRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&req, data.get_ref()).await {
        return resp;
    }
    let mentor_id = path.into_inner();

    let users = data.mongodb.db.collection::<User>("users");
    let mentor = match users.find_one(doc! { "user_id": &mentor_id }).await {
        Ok(Some(u)) if u.role == Role::Mentor => u,
        Ok(_) => {
            return HttpResponse::NotFound()
                .json(serde_json::json!({ "success": false, "message": "Mentor not found" }));
        }
        Err(e) => {
            error!("Error fetching mentor {}: {}", mentor_id, e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error rejecting mentor" }));
        }
    };

    if let Err(e) = users
        .update_one(
            doc! { "user_id": &mentor_id },
            doc! { "$set": { "is_active": false } },
        )
        .await
    {
        error!("Error rejecting mentor {}: {}", mentor_id, e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error rejecting mentor" }));
    }
    info!("Mentor {} rejected", mentor_id);

    let reason = payload
        .reason
        .clone()
        .unwrap_or_else(|| "Your application did not meet our requirements.".to_string());
    send_email(
        &data.config.email_from,
        &Email {
            to: mentor.email,
            subject: "Mentor Application Update".to_string(),
            body: format!(
                "Hi {}, your mentor application was not approved. {}",
                mentor.profile.full_name, reason
            ),
        },
    );

    HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": "Mentor rejected" }))
}

/// GET /admin/analytics
pub async fn get_analytics(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_admin(&req, data.get_ref()).await {
        return resp;
    }

    let users = data.mongodb.db.collection::<User>("users");
    let sessions = data
        .mongodb
        .db
        .collection::<mongodb::bson::Document>("sessions");

    let counts = async {
        Ok::<_, mongodb::error::Error>((
            users.count_documents(doc! {}).await?,
            users
                .count_documents(doc! { "role": "mentor", "is_approved": true })
                .await?,
            users.count_documents(doc! { "role": "mentee" }).await?,
            users
                .count_documents(doc! { "role": "mentor", "is_approved": false, "is_active": true })
                .await?,
            sessions.count_documents(doc! {}).await?,
            sessions.count_documents(doc! { "status": "completed" }).await?,
        ))
    };

    match counts.await {
        Ok((total_users, total_mentors, total_mentees, pending_mentors, total_sessions, completed_sessions)) => {
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "total_users": total_users,
                "total_mentors": total_mentors,
                "total_mentees": total_mentees,
                "pending_mentors": pending_mentors,
                "total_sessions": total_sessions,
                "completed_sessions": completed_sessions,
            }))
        }
        Err(e) => {
            error!("Error computing analytics: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error computing analytics" }))
        }
    }
}
