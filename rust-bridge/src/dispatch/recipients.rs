//! Per-recipient do-not-contact entries built from SES details.

use crate::mautic::DncReason;
use crate::sns::{BounceDetail, ComplaintDetail};

/// Prefix of every DNC comment written by this service.
pub const COMMENT_PREFIX: &str = "Automatically added by SES webhook";

/// One recipient to flag, before its contact id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DncEntry {
    pub email: String,
    pub reason: DncReason,
    pub comments: String,
}

/// Entries for every bounced recipient, in payload order.
pub fn bounce_entries(bounce: &BounceDetail) -> Vec<DncEntry> {
    let bounce_type = bounce.bounce_type.as_deref().unwrap_or("unknown");

    bounce
        .bounced_recipients
        .iter()
        .map(|recipient| DncEntry {
            email: recipient.email_address.clone(),
            reason: DncReason::Bounce,
            comments: format_comment(
                DncReason::Bounce,
                &[
                    ("bounceType", bounce_type),
                    (
                        "diagnosticCode",
                        recipient.diagnostic_code.as_deref().unwrap_or(""),
                    ),
                ],
            ),
        })
        .collect()
}

/// Entries for every complained recipient, in payload order.
pub fn complaint_entries(complaint: &ComplaintDetail) -> Vec<DncEntry> {
    let feedback_type = complaint
        .complaint_feedback_type
        .as_deref()
        .unwrap_or("unknown");

    complaint
        .complained_recipients
        .iter()
        .map(|recipient| DncEntry {
            email: recipient.email_address.clone(),
            reason: DncReason::Complaint,
            comments: format_comment(
                DncReason::Complaint,
                &[("complaintFeedbackType", feedback_type)],
            ),
        })
        .collect()
}

/// `<prefix> - <reason>` followed by one `key: value` line per detail.
pub fn format_comment(reason: DncReason, details: &[(&str, &str)]) -> String {
    let mut comment = format!("{} - {}", COMMENT_PREFIX, reason.as_str());
    for (key, value) in details {
        comment.push('\n');
        comment.push_str(key);
        comment.push_str(": ");
        comment.push_str(value);
    }
    comment
}

/// Key used to detect the same address twice in one notification.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
