use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::doc;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::session::{
    session_window, windows_overlap, Session, SessionStatus,
};
use crate::models::user::{Role, User};
use crate::notify::{send_email, Email};

#[derive(Debug, Deserialize)]
pub struct BookSessionRequest {
    pub mentor_id: String,
    pub start_time: DateTime<Utc>,
    pub topic: String,
}

/// A mentor with no declared availability takes any slot; a declared list
/// restricts booking to exactly those start instants.
pub fn slot_offered(availability: &[DateTime<Utc>], start: DateTime<Utc>) -> bool {
    availability.is_empty() || availability.contains(&start)
}

fn generate_meeting_link() -> String {
    format!("https://meet.mentorconnect.dev/{}", Uuid::new_v4())
}

/// POST /sessions
///
/// Check-then-insert: a narrow race between two concurrent requests for the
/// same slot is possible, matching the original service.
pub async fn book_session(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<BookSessionRequest>,
) -> impl Responder {
    let mentee_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };
    if payload.topic.trim().is_empty() || payload.topic.len() > 200 {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Topic required" }));
    }

    let users = data.mongodb.db.collection::<User>("users");
    let mentor = match users.find_one(doc! { "user_id": &payload.mentor_id }).await {
        Ok(Some(u)) if u.role == Role::Mentor && u.is_approved && u.is_active => u,
        Ok(_) => {
            return HttpResponse::BadRequest().json(
                serde_json::json!({ "success": false, "message": "Invalid or unapproved mentor" }),
            );
        }
        Err(e) => {
            error!("Error fetching mentor: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error booking session" }));
        }
    };

    let (start, end) = session_window(payload.start_time);

    if !slot_offered(&mentor.profile.availability, start) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Slot not offered" }));
    }

    // Conflict scan over the mentor's scheduled sessions.
    let sessions = data.mongodb.db.collection::<Session>("sessions");
    let mut cursor = match sessions
        .find(doc! { "mentor_id": &payload.mentor_id, "status": "scheduled" })
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Error checking session conflicts: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error booking session" }));
        }
    };
    while let Some(res) = cursor.next().await {
        match res {
            Ok(existing) => {
                if windows_overlap(existing.start_time, existing.end_time, start, end) {
                    return HttpResponse::BadRequest().json(
                        serde_json::json!({ "success": false, "message": "Time slot already booked" }),
                    );
                }
            }
            Err(e) => {
                error!("Cursor error while checking conflicts: {}", e);
                return HttpResponse::InternalServerError().json(
                    serde_json::json!({ "success": false, "message": "Error booking session" }),
                );
            }
        }
    }

    let new_session = Session {
        session_id: Uuid::new_v4().to_string(),
        mentee_id: mentee_id.clone(),
        mentor_id: payload.mentor_id.clone(),
        start_time: start,
        end_time: end,
        topic: payload.topic.trim().to_string(),
        meeting_link: generate_meeting_link(),
        status: SessionStatus::Scheduled,
        reviewed_by_mentee: false,
        reviewed_by_mentor: false,
        created_at: Utc::now(),
    };

    if let Err(e) = sessions.insert_one(&new_session).await {
        error!("Error inserting session: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error booking session" }));
    }
    info!(
        "Session {} booked: mentee={} mentor={} start={}",
        new_session.session_id, mentee_id, payload.mentor_id, start
    );

    // Confirmation emails are best-effort; the booking stands even if they
    // never go out.
    let mentee_email = users
        .find_one(doc! { "user_id": &mentee_id })
        .await
        .ok()
        .flatten()
        .map(|u| u.email)
        .unwrap_or_default();
    send_email(
        &data.config.email_from,
        &Email {
            to: mentee_email,
            subject: "Session Confirmed!".to_string(),
            body: format!(
                "Your session with {} at {} is booked.\nTopic: {}\nJoin: {}",
                mentor.profile.full_name, start, new_session.topic, new_session.meeting_link
            ),
        },
    );
    send_email(
        &data.config.email_from,
        &Email {
            to: mentor.email,
            subject: "New Session Booking".to_string(),
            body: format!(
                "You have a new session at {}.\nTopic: {}",
                start, new_session.topic
            ),
        },
    );

    HttpResponse::Created().json(serde_json::json!({ "success": true, "session": new_session }))
}

/// GET /sessions — caller's sessions as mentee or mentor, newest first.
pub async fn get_user_sessions(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };

    let sessions = data.mongodb.db.collection::<Session>("sessions");
    let filter = doc! {
        "$or": [ { "mentee_id": &current_user }, { "mentor_id": &current_user } ],
    };
    let mut cursor = match sessions.find(filter).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching sessions: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching sessions" }));
        }
    };

    let mut result: Vec<Session> = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(session) => result.push(session),
            Err(e) => {
                error!("Cursor error while fetching sessions: {}", e);
                return HttpResponse::InternalServerError().json(
                    serde_json::json!({ "success": false, "message": "Error reading sessions" }),
                );
            }
        }
    }
    result.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    HttpResponse::Ok().json(serde_json::json!({ "success": true, "sessions": result }))
}

/// GET /sessions/{id} — participants only.
pub async fn get_session(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };
    let session_id = path.into_inner();

    let sessions = data.mongodb.db.collection::<Session>("sessions");
    match sessions.find_one(doc! { "session_id": &session_id }).await {
        Ok(Some(session)) => {
            if !session.is_participant(&current_user) {
                return HttpResponse::Forbidden()
                    .json(serde_json::json!({ "success": false, "message": "Not authorized" }));
            }
            HttpResponse::Ok().json(serde_json::json!({ "success": true, "session": session }))
        }
        Ok(None) => HttpResponse::NotFound()
            .json(serde_json::json!({ "success": false, "message": "Session not found" })),
        Err(e) => {
            error!("Error fetching session {}: {}", session_id, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching session" }))
        }
    }
}

async fn transition_session(
    req: HttpRequest,
    data: web::Data<AppState>,
    session_id: String,
    target: SessionStatus,
) -> HttpResponse {
    let current_user = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };

    let sessions = data.mongodb.db.collection::<Session>("sessions");
    let session = match sessions.find_one(doc! { "session_id": &session_id }).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(serde_json::json!({ "success": false, "message": "Session not found" }));
        }
        Err(e) => {
            error!("Error fetching session {}: {}", session_id, e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error updating session" }));
        }
    };

    if !session.is_participant(&current_user) {
        return HttpResponse::Forbidden()
            .json(serde_json::json!({ "success": false, "message": "Not authorized" }));
    }
    if !session.status.can_transition() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Invalid session" }));
    }

    let status = match target {
        SessionStatus::Completed => "completed",
        SessionStatus::Cancelled => "cancelled",
        SessionStatus::Scheduled => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "success": false, "message": "Invalid session" }));
        }
    };
    match sessions
        .update_one(
            doc! { "session_id": &session_id },
            doc! { "$set": { "status": status } },
        )
        .await
    {
        Ok(_) => {
            info!("Session {} marked {}", session_id, status);
            HttpResponse::Ok().json(
                serde_json::json!({ "success": true, "message": format!("Session marked as {}", status) }),
            )
        }
        Err(e) => {
            error!("Error updating session {}: {}", session_id, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error updating session" }))
        }
    }
}

/// POST /sessions/{id}/complete
pub async fn complete_session(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    transition_session(req, data, path.into_inner(), SessionStatus::Completed).await
}

/// POST /sessions/{id}/cancel
///
/// Soft cancel: the record is retained with a terminal status.
pub async fn cancel_session(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    transition_session(req, data, path.into_inner(), SessionStatus::Cancelled).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn empty_availability_accepts_any_slot() {
        assert!(slot_offered(&[], at(10)));
    }

    #[test]
    fn declared_availability_restricts_slots() {
        let offered = vec![at(9), at(14)];
        assert!(slot_offered(&offered, at(9)));
        assert!(slot_offered(&offered, at(14)));
        assert!(!slot_offered(&offered, at(10)));
    }

    #[test]
    fn meeting_links_are_unique() {
        assert_ne!(generate_meeting_link(), generate_meeting_link());
    }
}
