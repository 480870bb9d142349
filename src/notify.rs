use log::{info, warn};

pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Simulated email delivery: the message is written to the log. Failures are
/// logged and swallowed so a missed notification never fails the request
/// that triggered it.
pub fn send_email(from: &str, email: &Email) {
    if email.to.is_empty() {
        warn!("Dropping email with no recipient: {}", email.subject);
        return;
    }
    info!(
        "EMAIL from={} to={} subject={:?}\n{}",
        from, email.to, email.subject, email.body
    );
}
