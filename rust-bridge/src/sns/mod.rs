//! Amazon SNS / SES notification handling.
//!
//! ```text
//! raw body → parse() → Envelope { kind, message: InnerMessage { bounce | complaint } }
//! ```

pub mod confirm;
pub mod parser;
pub mod types;

pub use confirm::confirm_subscription;
pub use parser::{parse, preview};
pub use types::{
    BounceDetail, BouncedRecipient, ComplainedRecipient, ComplaintDetail, Envelope,
    EnvelopeKind, InnerMessage, NotificationType,
};
