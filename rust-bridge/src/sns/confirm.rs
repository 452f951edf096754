//! SNS subscription handshake.

use reqwest::Client;
use tracing::{error, info};

use crate::error::ConfirmError;

/// Confirm an SNS subscription by fetching its `SubscribeURL`.
///
/// This is a plain GET with no credentials. Unlike the Mautic calls, any
/// failure here is returned to the caller and fails the request, so SNS
/// will redeliver the confirmation.
pub async fn confirm_subscription(
    client: &Client,
    subscribe_url: &str,
) -> Result<(), ConfirmError> {
    info!(url = subscribe_url, "sns_subscription_confirming");

    let response = match client.get(subscribe_url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            if e.is_timeout() {
                error!(url = subscribe_url, error = %e, "sns_subscription_confirm_timeout");
            } else {
                error!(url = subscribe_url, error = %e, "sns_subscription_confirm_error");
            }
            return Err(ConfirmError::Transport(e));
        }
    };

    let status = response.status();
    if !status.is_success() {
        error!(
            url = subscribe_url,
            status_code = status.as_u16(),
            "sns_subscription_confirm_rejected"
        );
        return Err(ConfirmError::Status(status.as_u16()));
    }

    info!(status_code = status.as_u16(), "sns_subscription_confirmed");
    Ok(())
}
