//! SNS envelope and SES notification types.
//!
//! The SNS wrapper uses PascalCase fields (`Type`, `Message`,
//! `SubscribeURL`), the SES payload camelCase. Details are decoded field by
//! field in [`crate::sns::parser`] so one malformed recipient cannot hide
//! the others.

/// SNS `Type` value for the subscription handshake.
pub const SUBSCRIPTION_CONFIRMATION: &str = "SubscriptionConfirmation";

/// SNS `Type` value for a delivered message.
pub const NOTIFICATION: &str = "Notification";

/// Outer classification of an inbound body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// SNS asks the endpoint to confirm the subscription.
    SubscriptionConfirmation,
    /// SNS delivers a JSON-encoded SES message.
    Notification,
    /// An SES message posted without the SNS wrapper.
    Direct,
    /// Any other SNS `Type` (e.g. `UnsubscribeConfirmation`).
    Other(String),
}

/// A decoded inbound request.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    /// SNS `MessageId`, used only for log correlation
    pub message_id: Option<String>,
    pub subscribe_url: Option<String>,
    /// `None` when the inner message was absent or could not be decoded
    pub message: Option<InnerMessage>,
}

/// SES `notificationType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationType {
    Bounce,
    Complaint,
    /// Unrecognized or missing type; carries the raw value for logging.
    Other(String),
}

impl NotificationType {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("Bounce") => NotificationType::Bounce,
            Some("Complaint") => NotificationType::Complaint,
            Some(other) => NotificationType::Other(other.to_string()),
            None => NotificationType::Other(String::new()),
        }
    }
}

/// SES notification carried inside the SNS `Message` field.
#[derive(Debug, Clone)]
pub struct InnerMessage {
    pub notification_type: NotificationType,
    pub bounce: Option<BounceDetail>,
    pub complaint: Option<ComplaintDetail>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BounceDetail {
    pub bounce_type: Option<String>,
    pub bounced_recipients: Vec<BouncedRecipient>,
}

/// An `emailAddress` that was missing or not a string is kept as `""` so
/// the dispatcher can count it as skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct BouncedRecipient {
    pub email_address: String,
    pub diagnostic_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintDetail {
    pub complaint_feedback_type: Option<String>,
    pub complained_recipients: Vec<ComplainedRecipient>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplainedRecipient {
    pub email_address: String,
}
