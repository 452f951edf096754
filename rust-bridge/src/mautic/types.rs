//! Mautic API request and response types.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Channel every DNC entry is recorded against.
pub const EMAIL_CHANNEL: &str = "email";

/// Mautic's do-not-contact reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DncReason {
    Bounce,
    Complaint,
}

impl DncReason {
    /// Numeric code sent to the API.
    pub fn code(self) -> u8 {
        match self {
            DncReason::Bounce => 1,
            DncReason::Complaint => 2,
        }
    }

    /// Lowercase name used in comments and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DncReason::Bounce => "bounce",
            DncReason::Complaint => "complaint",
        }
    }
}

impl Serialize for DncReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// A do-not-contact request for one contact.
///
/// The contact id is part of the URL, so only `reason`, `channel` and
/// `comments` are serialized into the body.
#[derive(Debug, Clone, Serialize)]
pub struct DncRequest {
    #[serde(skip)]
    pub contact_id: String,
    pub reason: DncReason,
    pub channel: &'static str,
    pub comments: String,
}

impl DncRequest {
    pub fn new(contact_id: String, reason: DncReason, comments: String) -> Self {
        Self {
            contact_id,
            reason,
            channel: EMAIL_CHANNEL,
            comments,
        }
    }
}

/// Response of `GET /api/contacts?search=..`.
///
/// `contacts` is an object keyed by contact id, or an empty array when
/// nothing matched.
#[derive(Debug, Deserialize)]
pub struct ContactSearchResponse {
    #[serde(default)]
    pub contacts: Value,
}

impl ContactSearchResponse {
    /// Id of the first matching contact, in response order.
    pub fn first_contact_id(&self) -> Option<String> {
        match &self.contacts {
            Value::Object(map) => map.keys().next().cloned(),
            Value::Array(list) => list.first().and_then(|c| match c.get("id")? {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            }),
            _ => None,
        }
    }
}
