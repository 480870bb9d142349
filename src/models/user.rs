use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentee,
    Mentor,
    Admin,
}

/// Profile sub-document. Academic fields are only meaningful for mentors;
/// mentees and admins carry the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Profile {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Offered start instants; empty means the mentor takes any future slot.
    #[serde(default)]
    pub availability: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub is_approved: bool,
    pub is_active: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// JSON view with the password hash stripped, for API responses.
    pub fn sanitized(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("password");
        }
        value
    }
}
