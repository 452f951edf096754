//! Decoding of raw webhook bodies into [`Envelope`]s.
//!
//! Only the outer JSON decode is fatal. Everything below it degrades to
//! "unknown" values that the dispatcher logs and ignores.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::ParseError;
use crate::sns::types::{
    BounceDetail, BouncedRecipient, ComplainedRecipient, ComplaintDetail, Envelope,
    EnvelopeKind, InnerMessage, NotificationType, NOTIFICATION, SUBSCRIPTION_CONFIRMATION,
};

/// Parse a raw request body.
pub fn parse(raw_body: &[u8]) -> Result<Envelope, ParseError> {
    if raw_body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let data: Value = serde_json::from_slice(raw_body)?;

    // A null `Type` counts as absent.
    let Some(kind) = data.get("Type").filter(|kind| !kind.is_null()) else {
        info!("sns_envelope_absent");
        return Ok(Envelope {
            kind: EnvelopeKind::Direct,
            message_id: None,
            subscribe_url: None,
            message: decode_message(&data),
        });
    };

    let kind = value_as_text(kind);
    let message_id = data
        .get("MessageId")
        .and_then(Value::as_str)
        .map(str::to_string);

    info!(sns_type = %kind, message_id = ?message_id, "sns_envelope_parsed");

    let envelope = match kind.as_str() {
        SUBSCRIPTION_CONFIRMATION => Envelope {
            kind: EnvelopeKind::SubscriptionConfirmation,
            message_id,
            subscribe_url: data
                .get("SubscribeURL")
                .and_then(Value::as_str)
                .map(str::to_string),
            message: None,
        },
        NOTIFICATION => Envelope {
            kind: EnvelopeKind::Notification,
            message_id,
            subscribe_url: None,
            message: data.get("Message").and_then(decode_wrapped_message),
        },
        _ => Envelope {
            kind: EnvelopeKind::Other(kind),
            message_id,
            subscribe_url: None,
            message: None,
        },
    };

    Ok(envelope)
}

/// SNS carries the SES payload as a JSON string inside `Message`.
fn decode_wrapped_message(message: &Value) -> Option<InnerMessage> {
    let Some(text) = message.as_str() else {
        warn!("sns_message_not_a_string");
        return None;
    };

    match serde_json::from_str::<Value>(text) {
        Ok(inner) => decode_message(&inner),
        Err(e) => {
            warn!(
                error = %e,
                message_preview = %preview(text, 200),
                "sns_message_decode_failed"
            );
            None
        }
    }
}

fn decode_message(data: &Value) -> Option<InnerMessage> {
    if !data.is_object() {
        warn!("ses_message_not_an_object");
        return None;
    }

    let notification_type = match data.get("notificationType") {
        Some(Value::String(tag)) => NotificationType::from_tag(Some(tag.as_str())),
        Some(other) => NotificationType::Other(other.to_string()),
        None => {
            warn!("ses_notification_type_missing");
            NotificationType::from_tag(None)
        }
    };

    Some(InnerMessage {
        notification_type,
        bounce: detail_object(data, "bounce").map(decode_bounce),
        complaint: detail_object(data, "complaint").map(decode_complaint),
    })
}

fn detail_object<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    let detail = data.get(field).filter(|v| !v.is_null())?;
    if detail.is_object() {
        Some(detail)
    } else {
        warn!(field = field, "ses_detail_not_an_object");
        None
    }
}

fn decode_bounce(detail: &Value) -> BounceDetail {
    BounceDetail {
        bounce_type: optional_text(detail, "bounceType"),
        bounced_recipients: recipient_list(detail, "bouncedRecipients")
            .map(|recipient| BouncedRecipient {
                email_address: email_address(recipient),
                diagnostic_code: optional_text(recipient, "diagnosticCode"),
            })
            .collect(),
    }
}

fn decode_complaint(detail: &Value) -> ComplaintDetail {
    ComplaintDetail {
        complaint_feedback_type: optional_text(detail, "complaintFeedbackType"),
        complained_recipients: recipient_list(detail, "complainedRecipients")
            .map(|recipient| ComplainedRecipient {
                email_address: email_address(recipient),
            })
            .collect(),
    }
}

/// Entries of a recipient array; anything else yields no recipients.
fn recipient_list<'a>(detail: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    let list: &[Value] = match detail.get(field) {
        Some(Value::Array(list)) => list.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => {
            warn!(field = field, "ses_recipients_not_a_list");
            &[]
        }
    };
    list.iter()
}

/// `emailAddress` of one recipient, or `""` when unusable.
fn email_address(recipient: &Value) -> String {
    match recipient.get("emailAddress") {
        Some(Value::String(email)) => email.clone(),
        other => {
            warn!(email_address = ?other, "ses_recipient_without_email");
            String::new()
        }
    }
}

/// Scalar field rendered as text; null, missing, arrays and objects are `None`.
fn optional_text(data: &Value, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => {
            warn!(field = field, "ses_field_not_a_scalar");
            None
        }
        scalar => Some(value_as_text(scalar)),
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(parse(b""), Err(ParseError::Empty)));
        assert!(matches!(parse(b"  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse(b"{not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_subscription_confirmation() {
        let body = br#"{
            "Type": "SubscriptionConfirmation",
            "MessageId": "165545c9-2a5c-472c-8df2-7ff2be2b3b1b",
            "SubscribeURL": "https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription&Token=abc",
            "Token": "abc"
        }"#;

        let envelope = parse(body).unwrap();

        assert_eq!(envelope.kind, EnvelopeKind::SubscriptionConfirmation);
        assert_eq!(
            envelope.subscribe_url.as_deref(),
            Some("https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription&Token=abc")
        );
        assert_eq!(
            envelope.message_id.as_deref(),
            Some("165545c9-2a5c-472c-8df2-7ff2be2b3b1b")
        );
        assert!(envelope.message.is_none());
    }

    #[test]
    fn test_parse_wrapped_bounce() {
        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Bounce\",\"bounce\":{\"bounceType\":\"Permanent\",\"bouncedRecipients\":[{\"emailAddress\":\"a@example.com\",\"diagnosticCode\":\"550 5.1.1\"},{\"emailAddress\":\"b@example.com\"}]}}"}"#;

        let envelope = parse(body).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Notification);

        let message = envelope.message.unwrap();
        assert_eq!(message.notification_type, NotificationType::Bounce);

        let bounce = message.bounce.unwrap();
        assert_eq!(bounce.bounce_type.as_deref(), Some("Permanent"));
        assert_eq!(
            bounce.bounced_recipients,
            vec![
                BouncedRecipient {
                    email_address: "a@example.com".to_string(),
                    diagnostic_code: Some("550 5.1.1".to_string()),
                },
                BouncedRecipient {
                    email_address: "b@example.com".to_string(),
                    diagnostic_code: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_wrapped_complaint() {
        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Complaint\",\"complaint\":{\"complaintFeedbackType\":\"abuse\",\"complainedRecipients\":[{\"emailAddress\":\"c@example.com\"}]},\"mail\":{\"source\":\"news@example.org\"}}"}"#;

        let message = parse(body).unwrap().message.unwrap();

        assert_eq!(message.notification_type, NotificationType::Complaint);
        let complaint = message.complaint.unwrap();
        assert_eq!(complaint.complaint_feedback_type.as_deref(), Some("abuse"));
        assert_eq!(
            complaint.complained_recipients,
            vec![ComplainedRecipient {
                email_address: "c@example.com".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_direct_message() {
        let body = br#"{"notificationType":"Bounce","bounce":{"bounceType":"Transient","bouncedRecipients":[]}}"#;

        let envelope = parse(body).unwrap();

        assert_eq!(envelope.kind, EnvelopeKind::Direct);
        let message = envelope.message.unwrap();
        assert_eq!(message.notification_type, NotificationType::Bounce);
        assert!(message.bounce.unwrap().bounced_recipients.is_empty());
    }

    #[test]
    fn test_parse_unknown_outer_type() {
        let envelope = parse(br#"{"Type":"UnsubscribeConfirmation"}"#).unwrap();
        assert_eq!(
            envelope.kind,
            EnvelopeKind::Other("UnsubscribeConfirmation".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_inner_type() {
        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Delivery\"}"}"#;
        let message = parse(body).unwrap().message.unwrap();
        assert_eq!(
            message.notification_type,
            NotificationType::Other("Delivery".to_string())
        );
    }

    #[test]
    fn test_parse_missing_notification_type_degrades() {
        let message = parse(br#"{"mail":{}}"#).unwrap().message.unwrap();
        assert_eq!(
            message.notification_type,
            NotificationType::Other(String::new())
        );
    }

    #[test]
    fn test_parse_undecodable_inner_message_degrades() {
        let envelope = parse(br#"{"Type":"Notification","Message":"not json"}"#).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Notification);
        assert!(envelope.message.is_none());

        let envelope = parse(br#"{"Type":"Notification"}"#).unwrap();
        assert!(envelope.message.is_none());
    }

    #[test]
    fn test_parse_malformed_detail_degrades() {
        let body = br#"{"notificationType":"Bounce","bounce":{"bouncedRecipients":"nope"}}"#;
        let message = parse(body).unwrap().message.unwrap();
        assert_eq!(message.notification_type, NotificationType::Bounce);
        assert!(message.bounce.unwrap().bounced_recipients.is_empty());

        let body = br#"{"notificationType":"Complaint","complaint":"nope"}"#;
        assert!(parse(body).unwrap().message.unwrap().complaint.is_none());
    }

    #[test]
    fn test_parse_bad_recipient_keeps_the_others() {
        let body = br#"{"notificationType":"Bounce","bounce":{"bounceType":"Permanent","bouncedRecipients":[
            {"emailAddress":"good@example.com"},
            {"status":"5.1.1"},
            {"emailAddress":"coded@example.com","diagnosticCode":550}
        ]}}"#;

        let bounce = parse(body).unwrap().message.unwrap().bounce.unwrap();

        assert_eq!(
            bounce.bounced_recipients,
            vec![
                BouncedRecipient {
                    email_address: "good@example.com".to_string(),
                    diagnostic_code: None,
                },
                BouncedRecipient {
                    email_address: String::new(),
                    diagnostic_code: None,
                },
                BouncedRecipient {
                    email_address: "coded@example.com".to_string(),
                    diagnostic_code: Some("550".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_parse_non_string_bounce_type() {
        let body = br#"{"notificationType":"Bounce","bounce":{"bounceType":5,"bouncedRecipients":[{"emailAddress":"a@example.com"}]}}"#;

        let bounce = parse(body).unwrap().message.unwrap().bounce.unwrap();

        assert_eq!(bounce.bounce_type.as_deref(), Some("5"));
        assert_eq!(bounce.bounced_recipients.len(), 1);
    }

    #[test]
    fn test_parse_null_type_is_direct() {
        let body = br#"{"Type":null,"notificationType":"Complaint","complaint":{"complainedRecipients":[{"emailAddress":"c@example.com"}]}}"#;

        let envelope = parse(body).unwrap();

        assert_eq!(envelope.kind, EnvelopeKind::Direct);
        let message = envelope.message.unwrap();
        assert_eq!(message.notification_type, NotificationType::Complaint);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("abc", 10), "abc");
    }
}
