//! Routing of parsed notifications to their side effects.
//!
//! ```text
//! SubscriptionConfirmation → GET SubscribeURL (failure fails the request)
//! Notification / Direct    → Bounce    → DNC reason 1 per bounced recipient
//!                          → Complaint → DNC reason 2 per complained recipient
//!                          → other     → warning, no-op
//! other SNS type           → warning, no-op
//! ```
//!
//! Recipients are handled one at a time in payload order. Their outcomes
//! are logged and summarized but never change the HTTP status.

pub mod recipients;

use std::collections::HashSet;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::error::ConfirmError;
use crate::mautic::{DncRequest, MauticClient};
use crate::sns::{confirm_subscription, Envelope, EnvelopeKind, InnerMessage, NotificationType};

pub use recipients::{bounce_entries, complaint_entries, format_comment, DncEntry};

/// What a request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    SubscriptionConfirmed,
    Processed(BatchSummary),
    Ignored,
}

/// Per-recipient tallies for one notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// DNC add was delivered
    pub marked: usize,
    /// No contact matched the address
    pub not_found: usize,
    /// Lookup or DNC add failed in transport
    pub failed: usize,
    /// Duplicate or empty address in the same notification
    pub skipped: usize,
}

enum RecipientOutcome {
    Marked,
    NotFound,
    Failed,
}

/// Dispatches notifications to the Mautic API.
#[derive(Clone)]
pub struct Dispatcher {
    http: Client,
    mautic: MauticClient,
}

impl Dispatcher {
    /// `http` is used for subscription confirmations and should carry the
    /// same timeout as the Mautic client.
    pub fn new(http: Client, mautic: MauticClient) -> Self {
        Self { http, mautic }
    }

    pub async fn dispatch(&self, envelope: Envelope) -> Result<DispatchOutcome, ConfirmError> {
        match envelope.kind {
            EnvelopeKind::SubscriptionConfirmation => {
                let url = envelope.subscribe_url.ok_or(ConfirmError::MissingUrl)?;
                confirm_subscription(&self.http, &url).await?;
                Ok(DispatchOutcome::SubscriptionConfirmed)
            }
            EnvelopeKind::Notification | EnvelopeKind::Direct => match envelope.message {
                Some(message) => Ok(self.handle_message(message).await),
                None => {
                    warn!(message_id = ?envelope.message_id, "ses_message_missing");
                    Ok(DispatchOutcome::Ignored)
                }
            },
            EnvelopeKind::Other(kind) => {
                warn!(sns_type = %kind, "sns_unknown_message_type");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn handle_message(&self, message: InnerMessage) -> DispatchOutcome {
        let entries = match message.notification_type {
            NotificationType::Bounce => {
                let Some(bounce) = message.bounce else {
                    warn!("ses_bounce_without_recipients");
                    return DispatchOutcome::Ignored;
                };
                bounce_entries(&bounce)
            }
            NotificationType::Complaint => {
                let Some(complaint) = message.complaint else {
                    warn!("ses_complaint_without_recipients");
                    return DispatchOutcome::Ignored;
                };
                complaint_entries(&complaint)
            }
            NotificationType::Other(kind) => {
                warn!(notification_type = %kind, "ses_unknown_notification_type");
                return DispatchOutcome::Ignored;
            }
        };

        let summary = self.mark_all(&entries).await;

        info!(
            recipients = entries.len(),
            marked = summary.marked,
            not_found = summary.not_found,
            failed = summary.failed,
            skipped = summary.skipped,
            "ses_notification_processed"
        );

        DispatchOutcome::Processed(summary)
    }

    /// Flag each entry in order, at most once per address.
    async fn mark_all(&self, entries: &[DncEntry]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut seen = HashSet::new();

        for entry in entries {
            let key = recipients::normalize_email(&entry.email);
            if key.is_empty() {
                warn!(reason = entry.reason.as_str(), "dnc_recipient_without_email");
                summary.skipped += 1;
                continue;
            }
            if !seen.insert(key) {
                info!(email = %entry.email, "dnc_recipient_duplicate");
                summary.skipped += 1;
                continue;
            }

            match self.mark_do_not_contact(entry).await {
                RecipientOutcome::Marked => summary.marked += 1,
                RecipientOutcome::NotFound => summary.not_found += 1,
                RecipientOutcome::Failed => summary.failed += 1,
            }
        }

        summary
    }

    async fn mark_do_not_contact(&self, entry: &DncEntry) -> RecipientOutcome {
        info!(
            email = %entry.email,
            reason = entry.reason.as_str(),
            "dnc_processing"
        );

        let contact_id = match self.mautic.find_contact_id_by_email(&entry.email).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(email = %entry.email, "dnc_contact_not_found");
                return RecipientOutcome::NotFound;
            }
            Err(e) => {
                error!(email = %entry.email, error = %e, "dnc_contact_lookup_failed");
                return RecipientOutcome::Failed;
            }
        };

        let request = DncRequest::new(contact_id, entry.reason, entry.comments.clone());

        match self.mautic.add_to_do_not_contact(&request).await {
            Ok(()) => {
                info!(
                    email = %entry.email,
                    contact_id = %request.contact_id,
                    "dnc_contact_added"
                );
                RecipientOutcome::Marked
            }
            Err(e) => {
                error!(
                    email = %entry.email,
                    contact_id = %request.contact_id,
                    error = %e,
                    "dnc_contact_add_failed"
                );
                RecipientOutcome::Failed
            }
        }
    }
}
