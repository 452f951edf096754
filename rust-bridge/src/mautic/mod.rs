//! Mautic contacts API.
//!
//! Two calls are used:
//! - `GET /api/contacts?search=<email>` to resolve a contact id
//! - `POST /api/contacts/<id>/dnc/email/add` to flag it do-not-contact

pub mod client;
pub mod types;

pub use client::MauticClient;
pub use types::{ContactSearchResponse, DncReason, DncRequest, EMAIL_CHANNEL};
