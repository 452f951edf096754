//! Bounce Bridge - SNS/SES bounce and complaint handler for Mautic.
//!
//! Receives Amazon SNS webhooks carrying SES bounce and complaint
//! notifications and flags the affected contacts as do-not-contact in
//! Mautic.
//!
//! ## Architecture
//!
//! ```text
//! SNS → web (axum) → sns::parse → dispatch → mautic → Mautic API
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod mautic;
pub mod sns;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{BatchSummary, DispatchOutcome, Dispatcher};
pub use error::{ApiError, ConfirmError, ParseError, RequestError};
pub use mautic::MauticClient;
pub use web::AppState;
