use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::models::user::{Profile, Role, User};
use crate::notify::{send_email, Email};

#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub university: String,
    pub program: String,
    pub graduation_year: Option<i32>,
    pub expertise: Option<Vec<String>>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub availability: Option<Vec<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability: Vec<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct MentorSearchQuery {
    pub university: Option<String>,
    pub program: Option<String>,
    pub expertise: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

const MAX_SEARCH_PAGE: u64 = 10_000;

/// Documents to skip for a page, saturating so an oversized page number can
/// never overflow.
fn search_skip(page: u64, limit: i64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit as u64)
}

async fn load_current_user(req: &HttpRequest, data: &AppState) -> Result<User, HttpResponse> {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return Err(HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" })));
        }
    };
    let users = data.mongodb.db.collection::<User>("users");
    match users.find_one(doc! { "user_id": &current_user }).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(HttpResponse::Unauthorized()
            .json(serde_json::json!({ "success": false, "message": "Unauthorized" }))),
        Err(e) => {
            error!("Error loading current user: {}", e);
            Err(HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error loading user" })))
        }
    }
}

/// PUT /mentors/profile
///
/// Submitting (or re-submitting) the academic profile always puts the mentor
/// back into the pending-approval pool.
pub async fn complete_mentor_profile(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CompleteProfileRequest>,
) -> impl Responder {
    let user = match load_current_user(&req, data.get_ref()).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if user.role != Role::Mentor {
        return HttpResponse::Forbidden().json(
            serde_json::json!({ "success": false, "message": "Only mentors can complete this profile" }),
        );
    }

    let profile = Profile {
        full_name: user.profile.full_name.clone(),
        university: Some(payload.university.clone()),
        program: Some(payload.program.clone()),
        graduation_year: payload.graduation_year,
        expertise: payload.expertise.clone().unwrap_or_default(),
        bio: payload.bio.clone(),
        phone: payload.phone.clone(),
        availability: payload.availability.clone().unwrap_or_default(),
        rating: user.profile.rating,
        total_reviews: user.profile.total_reviews,
    };

    let profile_bson = match to_bson(&profile) {
        Ok(b) => b,
        Err(e) => {
            error!("Error serializing profile: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error saving profile" }));
        }
    };

    let users = data.mongodb.db.collection::<User>("users");
    if let Err(e) = users
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": { "profile": profile_bson, "is_approved": false } },
        )
        .await
    {
        error!("Error saving mentor profile: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error saving profile" }));
    }
    info!("Mentor {} submitted profile for approval", user.user_id);

    // Best-effort heads-up to every admin; booking of this mentor stays
    // blocked until one of them approves.
    match users.find(doc! { "role": "admin" }).await {
        Ok(mut cursor) => {
            while let Some(admin) = cursor.next().await {
                if let Ok(admin) = admin {
                    send_email(
                        &data.config.email_from,
                        &Email {
                            to: admin.email,
                            subject: "New Mentor Application".to_string(),
                            body: format!(
                                "{} from {} applied to be a mentor.",
                                user.profile.full_name, payload.university
                            ),
                        },
                    );
                }
            }
        }
        Err(e) => error!("Error fetching admins for notification: {}", e),
    }

    HttpResponse::Ok()
        .json(serde_json::json!({ "success": true, "message": "Profile submitted for approval" }))
}

/// PUT /mentors/availability
///
/// Replaces the offered-slot list. Unlike a profile edit this does not reset
/// the approval flag.
pub async fn update_availability(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateAvailabilityRequest>,
) -> impl Responder {
    let user = match load_current_user(&req, data.get_ref()).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if user.role != Role::Mentor {
        return HttpResponse::Forbidden().json(
            serde_json::json!({ "success": false, "message": "Only mentors can set availability" }),
        );
    }

    let mut slots = payload.availability.clone();
    slots.sort();
    slots.dedup();

    let slots_bson = match to_bson(&slots) {
        Ok(b) => b,
        Err(e) => {
            error!("Error serializing availability: {}", e);
            return HttpResponse::InternalServerError().json(
                serde_json::json!({ "success": false, "message": "Error saving availability" }),
            );
        }
    };

    let users = data.mongodb.db.collection::<User>("users");
    match users
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": { "profile.availability": slots_bson } },
        )
        .await
    {
        Ok(_) => HttpResponse::Ok()
            .json(serde_json::json!({ "success": true, "message": "Availability updated" })),
        Err(e) => {
            error!("Error saving availability: {}", e);
            HttpResponse::InternalServerError().json(
                serde_json::json!({ "success": false, "message": "Error saving availability" }),
            )
        }
    }
}

/// GET /mentors/search
pub async fn search_mentors(
    data: web::Data<AppState>,
    query: web::Query<MentorSearchQuery>,
) -> impl Responder {
    let page = query.page.unwrap_or(1).clamp(1, MAX_SEARCH_PAGE);
    let limit = query.limit.unwrap_or(10).clamp(1, 50);

    let mut filter = doc! {
        "role": "mentor",
        "is_approved": true,
        "is_active": true,
    };
    if let Some(university) = &query.university {
        filter.insert(
            "profile.university",
            doc! { "$regex": university, "$options": "i" },
        );
    }
    if let Some(program) = &query.program {
        filter.insert("profile.program", doc! { "$regex": program, "$options": "i" });
    }
    if let Some(expertise) = &query.expertise {
        filter.insert("profile.expertise", doc! { "$in": [expertise] });
    }

    let users = data.mongodb.db.collection::<User>("users");
    let total = match users.count_documents(filter.clone()).await {
        Ok(n) => n,
        Err(e) => {
            error!("Error counting mentors: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error searching mentors" }));
        }
    };

    let mut cursor = match users
        .find(filter)
        .skip(search_skip(page, limit))
        .limit(limit)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Error searching mentors: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error searching mentors" }));
        }
    };

    let mut mentors = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(user) => mentors.push(user.sanitized()),
            Err(e) => {
                error!("Cursor error while searching mentors: {}", e);
                return HttpResponse::InternalServerError().json(
                    serde_json::json!({ "success": false, "message": "Error reading mentors" }),
                );
            }
        }
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "mentors": mentors,
        "pagination": {
            "total": total,
            "page": page,
            "pages": (total + limit as u64 - 1) / limit as u64,
        },
    }))
}

/// GET /mentors/{id}
pub async fn get_mentor_profile(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    let mentor_id = path.into_inner();
    let users = data.mongodb.db.collection::<User>("users");
    match users.find_one(doc! { "user_id": &mentor_id }).await {
        Ok(Some(user)) if user.role == Role::Mentor && user.is_approved && user.is_active => {
            HttpResponse::Ok().json(serde_json::json!({ "success": true, "mentor": user.sanitized() }))
        }
        Ok(_) => HttpResponse::NotFound().json(
            serde_json::json!({ "success": false, "message": "Mentor not found or not approved" }),
        ),
        Err(e) => {
            error!("Error fetching mentor {}: {}", mentor_id, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching mentor" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_skips_nothing() {
        assert_eq!(search_skip(1, 10), 0);
        assert_eq!(search_skip(0, 10), 0);
    }

    #[test]
    fn later_pages_skip_whole_pages() {
        assert_eq!(search_skip(2, 10), 10);
        assert_eq!(search_skip(5, 25), 100);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        assert_eq!(search_skip(u64::MAX, 50), u64::MAX);
    }
}
