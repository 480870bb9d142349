use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sessions run exactly one hour from the booked start.
pub const SESSION_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Only a scheduled session may move to a terminal state. Completed and
    /// cancelled are terminal.
    pub fn can_transition(self) -> bool {
        matches!(self, SessionStatus::Scheduled)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub session_id: String,
    pub mentee_id: String,
    pub mentor_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub topic: String,
    pub meeting_link: String,
    pub status: SessionStatus,
    pub reviewed_by_mentee: bool,
    pub reviewed_by_mentor: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.mentee_id == user_id || self.mentor_id == user_id
    }
}

/// The booked window is the half-open hour [start, start + 1h).
pub fn session_window(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::minutes(SESSION_DURATION_MINUTES))
}

/// Standard interval-overlap test on half-open windows. Exact abutment
/// (existing.end == new start) does not count as overlap.
pub fn windows_overlap(
    existing_start: DateTime<Utc>,
    existing_end: DateTime<Utc>,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> bool {
    existing_start < new_end && existing_end > new_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn half_hour_shift_overlaps() {
        let (s1, e1) = session_window(at(10, 0));
        let (s2, e2) = session_window(at(10, 30));
        assert!(windows_overlap(s1, e1, s2, e2));
    }

    #[test]
    fn identical_window_overlaps() {
        let (s, e) = session_window(at(10, 0));
        assert!(windows_overlap(s, e, s, e));
    }

    #[test]
    fn containment_overlaps() {
        let earlier = at(9, 30);
        let later = earlier + Duration::hours(2);
        let (s, e) = session_window(at(10, 0));
        assert!(windows_overlap(earlier, later, s, e));
    }

    #[test]
    fn exact_abutment_is_not_a_conflict() {
        let (s1, e1) = session_window(at(10, 0));
        let (s2, e2) = session_window(at(11, 0));
        assert_eq!(e1, s2);
        assert!(!windows_overlap(s1, e1, s2, e2));
        // Abutting on the other side as well.
        let (s0, e0) = session_window(at(9, 0));
        assert!(!windows_overlap(s0, e0, s1, e1));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        let (s1, e1) = session_window(at(8, 0));
        let (s2, e2) = session_window(at(14, 0));
        assert!(!windows_overlap(s1, e1, s2, e2));
    }

    #[test]
    fn only_scheduled_can_transition() {
        assert!(SessionStatus::Scheduled.can_transition());
        assert!(!SessionStatus::Completed.can_transition());
        assert!(!SessionStatus::Cancelled.can_transition());
    }

    #[test]
    fn session_window_is_one_hour() {
        let (start, end) = session_window(at(10, 0));
        assert_eq!(end - start, Duration::hours(1));
    }

    #[test]
    fn only_the_two_participants_belong_to_a_session() {
        let (start, end) = session_window(at(10, 0));
        let session = Session {
            session_id: "s-1".to_string(),
            mentee_id: "mentee-1".to_string(),
            mentor_id: "mentor-1".to_string(),
            start_time: start,
            end_time: end,
            topic: "Essay review".to_string(),
            meeting_link: "https://meet.mentorconnect.dev/x".to_string(),
            status: SessionStatus::Scheduled,
            reviewed_by_mentee: false,
            reviewed_by_mentor: false,
            created_at: start,
        };
        assert!(session.is_participant("mentee-1"));
        assert!(session.is_participant("mentor-1"));
        assert!(!session.is_participant("someone-else"));
        assert!(!session.is_participant(""));
    }
}
