use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    pub review_id: String,
    pub session_id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Arithmetic mean over every rating the reviewee has received. Zero reviews
/// yields 0.0.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ratings_average_to_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn single_rating_is_its_own_mean() {
        assert_eq!(average_rating(&[5]), 5.0);
    }

    #[test]
    fn mean_of_all_ratings() {
        assert_eq!(average_rating(&[5, 4]), 4.5);
        assert_eq!(average_rating(&[1, 2, 3, 4, 5]), 3.0);
        assert_eq!(average_rating(&[2, 2, 5]), 3.0);
    }
}
