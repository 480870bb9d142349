use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::doc;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::review::{average_rating, Review};
use crate::models::session::{Session, SessionStatus};
use crate::models::user::User;

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub session_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReviewRejection {
    SessionNotCompleted,
    NotParticipant,
    AlreadyReviewed,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReviewTarget {
    pub reviewee_id: String,
    pub by_mentee: bool,
}

/// Decides whether the reviewer may review this session and, if so, who the
/// review is about. A review needs a completed session, a reviewer who took
/// part in it, and no earlier review from the same side.
pub fn review_target(session: &Session, reviewer_id: &str) -> Result<ReviewTarget, ReviewRejection> {
    if session.status != SessionStatus::Completed {
        return Err(ReviewRejection::SessionNotCompleted);
    }
    let is_mentee = session.mentee_id == reviewer_id;
    let is_mentor = session.mentor_id == reviewer_id;
    if !is_mentee && !is_mentor {
        return Err(ReviewRejection::NotParticipant);
    }
    if (is_mentee && session.reviewed_by_mentee) || (is_mentor && session.reviewed_by_mentor) {
        return Err(ReviewRejection::AlreadyReviewed);
    }
    Ok(ReviewTarget {
        reviewee_id: if is_mentee {
            session.mentor_id.clone()
        } else {
            session.mentee_id.clone()
        },
        by_mentee: is_mentee,
    })
}

/// POST /reviews
///
/// Gated on a completed session, participation, and one review per reviewer
/// per session. The reviewee's aggregate is recomputed from the full review
/// set rather than maintained incrementally.
pub async fn submit_review(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<SubmitReviewRequest>,
) -> impl Responder {
    let reviewer_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return HttpResponse::Unauthorized()
                .json(serde_json::json!({ "success": false, "message": "Unauthorized" }));
        }
    };

    if !(1..=5).contains(&payload.rating) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Rating must be 1-5" }));
    }
    if payload.comment.as_deref().map_or(false, |c| c.len() > 1000) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "success": false, "message": "Comment too long" }));
    }

    let sessions = data.mongodb.db.collection::<Session>("sessions");
    let session = match sessions
        .find_one(doc! { "session_id": &payload.session_id })
        .await
    {
        Ok(Some(s)) => s,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(serde_json::json!({ "success": false, "message": "Session not found" }));
        }
        Err(e) => {
            error!("Error fetching session for review: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error submitting review" }));
        }
    };

    let target = match review_target(&session, &reviewer_id) {
        Ok(t) => t,
        Err(ReviewRejection::SessionNotCompleted) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "success": false, "message": "Session not completed" }));
        }
        Err(ReviewRejection::NotParticipant) => {
            return HttpResponse::Forbidden().json(
                serde_json::json!({ "success": false, "message": "Not part of this session" }),
            );
        }
        Err(ReviewRejection::AlreadyReviewed) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({ "success": false, "message": "You already reviewed" }));
        }
    };
    let reviewee_id = target.reviewee_id.clone();

    let new_review = Review {
        review_id: Uuid::new_v4().to_string(),
        session_id: payload.session_id.clone(),
        reviewer_id: reviewer_id.clone(),
        reviewee_id: reviewee_id.clone(),
        rating: payload.rating,
        comment: payload.comment.clone(),
        created_at: Utc::now(),
    };

    let reviews = data.mongodb.db.collection::<Review>("reviews");
    if let Err(e) = reviews.insert_one(&new_review).await {
        error!("Error inserting review: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error submitting review" }));
    }

    // Recompute the reviewee's aggregate over everything they have received.
    let mut ratings: Vec<i32> = Vec::new();
    match reviews.find(doc! { "reviewee_id": &reviewee_id }).await {
        Ok(mut cursor) => {
            while let Some(res) = cursor.next().await {
                match res {
                    Ok(review) => ratings.push(review.rating),
                    Err(e) => {
                        error!("Cursor error while recomputing rating: {}", e);
                        return HttpResponse::InternalServerError().json(
                            serde_json::json!({ "success": false, "message": "Error submitting review" }),
                        );
                    }
                }
            }
        }
        Err(e) => {
            error!("Error fetching reviews for aggregate: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error submitting review" }));
        }
    }

    let users = data.mongodb.db.collection::<User>("users");
    if let Err(e) = users
        .update_one(
            doc! { "user_id": &reviewee_id },
            doc! { "$set": {
                "profile.rating": average_rating(&ratings),
                "profile.total_reviews": ratings.len() as i64,
            } },
        )
        .await
    {
        error!("Error updating reviewee aggregate: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error submitting review" }));
    }

    let flag_update = if target.by_mentee {
        doc! { "$set": { "reviewed_by_mentee": true } }
    } else {
        doc! { "$set": { "reviewed_by_mentor": true } }
    };
    if let Err(e) = sessions
        .update_one(doc! { "session_id": &payload.session_id }, flag_update)
        .await
    {
        error!("Error flagging session as reviewed: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({ "success": false, "message": "Error submitting review" }));
    }

    info!(
        "Review {} submitted: session={} reviewer={} rating={}",
        new_review.review_id, payload.session_id, reviewer_id, payload.rating
    );
    HttpResponse::Created().json(serde_json::json!({ "success": true, "review": new_review }))
}

/// GET /reviews/user/{id} — reviews received by a user, newest first.
pub async fn get_user_reviews(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    let reviewee_id = path.into_inner();
    let reviews = data.mongodb.db.collection::<Review>("reviews");
    let mut cursor = match reviews.find(doc! { "reviewee_id": &reviewee_id }).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching reviews: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "message": "Error fetching reviews" }));
        }
    };

    let mut result: Vec<Review> = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(review) => result.push(review),
            Err(e) => {
                error!("Cursor error while fetching reviews: {}", e);
                return HttpResponse::InternalServerError().json(
                    serde_json::json!({ "success": false, "message": "Error reading reviews" }),
                );
            }
        }
    }
    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    HttpResponse::Ok().json(serde_json::json!({ "success": true, "reviews": result }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(status: SessionStatus) -> Session {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        Session {
            session_id: "s-1".to_string(),
            mentee_id: "mentee-1".to_string(),
            mentor_id: "mentor-1".to_string(),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            topic: "Essay review".to_string(),
            meeting_link: "https://meet.mentorconnect.dev/x".to_string(),
            status,
            reviewed_by_mentee: false,
            reviewed_by_mentor: false,
            created_at: start,
        }
    }

    #[test]
    fn review_requires_completed_session() {
        let s = session(SessionStatus::Scheduled);
        assert_eq!(
            review_target(&s, "mentee-1"),
            Err(ReviewRejection::SessionNotCompleted)
        );
        let s = session(SessionStatus::Cancelled);
        assert_eq!(
            review_target(&s, "mentee-1"),
            Err(ReviewRejection::SessionNotCompleted)
        );
    }

    #[test]
    fn review_requires_participation() {
        let s = session(SessionStatus::Completed);
        assert_eq!(
            review_target(&s, "someone-else"),
            Err(ReviewRejection::NotParticipant)
        );
    }

    #[test]
    fn each_side_reviews_the_other() {
        let s = session(SessionStatus::Completed);
        let by_mentee = review_target(&s, "mentee-1").unwrap();
        assert_eq!(by_mentee.reviewee_id, "mentor-1");
        assert!(by_mentee.by_mentee);
        let by_mentor = review_target(&s, "mentor-1").unwrap();
        assert_eq!(by_mentor.reviewee_id, "mentee-1");
        assert!(!by_mentor.by_mentee);
    }

    #[test]
    fn second_review_from_the_same_side_is_rejected() {
        let mut s = session(SessionStatus::Completed);
        s.reviewed_by_mentee = true;
        assert_eq!(
            review_target(&s, "mentee-1"),
            Err(ReviewRejection::AlreadyReviewed)
        );
        // The mentor's slot is still open.
        assert!(review_target(&s, "mentor-1").is_ok());
        s.reviewed_by_mentor = true;
        assert_eq!(
            review_target(&s, "mentor-1"),
            Err(ReviewRejection::AlreadyReviewed)
        );
    }
}
