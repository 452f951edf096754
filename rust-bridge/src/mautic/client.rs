//! Authenticated client for the Mautic contacts API.

use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::error::ApiError;
use crate::mautic::types::{ContactSearchResponse, DncRequest, EMAIL_CHANNEL};

/// Mautic REST client using HTTP Basic authentication.
///
/// Cheap to clone; the underlying `reqwest::Client` is shared and carries
/// the request timeout.
#[derive(Clone)]
pub struct MauticClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl MauticClient {
    pub fn new(http: Client, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Look up a contact by email address.
    ///
    /// Returns `Ok(None)` when the search matched nothing or the response
    /// body was not usable; `Err` only when no response arrived.
    pub async fn find_contact_id_by_email(
        &self,
        email: &str,
    ) -> Result<Option<String>, ApiError> {
        let mut url = self.endpoint("/api/contacts")?;
        url.query_pairs_mut().append_pair("search", email);

        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        match serde_json::from_slice::<ContactSearchResponse>(&body) {
            Ok(search) => {
                let contact_id = search.first_contact_id();
                info!(
                    email = email,
                    status_code = status,
                    contact_id = ?contact_id,
                    "mautic_contact_search_complete"
                );
                Ok(contact_id)
            }
            Err(e) => {
                warn!(
                    email = email,
                    status_code = status,
                    error = %e,
                    "mautic_contact_search_invalid_body"
                );
                Ok(None)
            }
        }
    }

    /// Add a contact to the email do-not-contact list.
    ///
    /// Any HTTP response counts as delivered; the body is not inspected.
    pub async fn add_to_do_not_contact(&self, request: &DncRequest) -> Result<(), ApiError> {
        let url = self.endpoint(&format!(
            "/api/contacts/{}/dnc/{}/add",
            request.contact_id, EMAIL_CHANNEL
        ))?;

        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                contact_id = %request.contact_id,
                status_code = status.as_u16(),
                "mautic_dnc_add_unexpected_status"
            );
        }

        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }
}
