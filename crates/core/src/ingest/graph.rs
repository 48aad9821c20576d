//! Microsoft Graph mail provider.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use factum_shared::config::MailConfig;

use super::types::{MailAttachment, MailMessage, MailProvider};
use super::IngestError;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Client-credentials token with its expiry.
struct CachedToken {
    value: String,
    expires_at: std::time::Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    id: String,
    subject: Option<String>,
    from: Option<GraphRecipient>,
    received_date_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttachment {
    id: String,
    name: String,
    content_type: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content_bytes: Option<String>,
}

/// Mail provider backed by the Microsoft Graph API, authenticating with
/// client credentials. The token is cached until shortly before expiry.
pub struct GraphMailProvider {
    http: reqwest::Client,
    config: MailConfig,
    graph_base: String,
    login_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl GraphMailProvider {
    /// Create a provider for the configured mailbox.
    #[must_use]
    pub fn new(config: MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            graph_base: GRAPH_BASE_URL.to_string(),
            login_base: LOGIN_BASE_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Override both endpoint bases. Used by tests.
    #[must_use]
    pub fn with_base_urls(mut self, graph_base: impl Into<String>, login_base: impl Into<String>) -> Self {
        self.graph_base = graph_base.into();
        self.login_base = login_base.into();
        self
    }

    async fn access_token(&self) -> Result<String, IngestError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > std::time::Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base, self.config.tenant_id
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", "https://graph.microsoft.com/.default"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| IngestError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(IngestError::Auth(format!(
                "token endpoint returned {status}: {detail}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Auth(e.to_string()))?;

        // Refresh a minute early.
        let expires_at = std::time::Instant::now()
            + std::time::Duration::from_secs(token.expires_in.saturating_sub(60));
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        debug!("Refreshed graph access token");
        Ok(value)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, IngestError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IngestError::Collaborator(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(IngestError::Collaborator(format!(
                "graph returned {status}: {detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IngestError::Collaborator(e.to_string()))
    }
}

impl MailProvider for GraphMailProvider {
    async fn fetch_unread_with_attachments(
        &self,
        limit: u64,
    ) -> Result<Vec<MailMessage>, IngestError> {
        let url = format!(
            "{}/users/{}/messages?$filter=isRead eq false and hasAttachments eq true&$top={limit}&$select=id,subject,from,receivedDateTime",
            self.graph_base, self.config.mailbox
        );
        let list: ListResponse<GraphMessage> = self.get_json(&url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|m| MailMessage {
                id: m.id,
                sender: m
                    .from
                    .and_then(|f| f.email_address)
                    .and_then(|a| a.address),
                subject: m.subject,
                received_at: m.received_date_time,
            })
            .collect())
    }

    async fn list_attachments(
        &self,
        message_id: &str,
    ) -> Result<Vec<MailAttachment>, IngestError> {
        let url = format!(
            "{}/users/{}/messages/{message_id}/attachments?$select=id,name,contentType,size",
            self.graph_base, self.config.mailbox
        );
        let list: ListResponse<GraphAttachment> = self.get_json(&url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|a| MailAttachment {
                id: a.id,
                name: a.name,
                content_type: a.content_type,
                size: a.size,
            })
            .collect())
    }

    async fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, IngestError> {
        let url = format!(
            "{}/users/{}/messages/{message_id}/attachments/{attachment_id}",
            self.graph_base, self.config.mailbox
        );
        let attachment: GraphAttachment = self.get_json(&url).await?;
        let encoded = attachment
            .content_bytes
            .ok_or_else(|| IngestError::Collaborator("attachment has no content".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| IngestError::Collaborator(format!("invalid attachment encoding: {e}")))
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), IngestError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/users/{}/messages/{message_id}",
            self.graph_base, self.config.mailbox
        );
        let response = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .json(&json!({ "isRead": true }))
            .send()
            .await
            .map_err(|e| IngestError::Collaborator(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IngestError::Collaborator(format!(
                "mark read returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_list_deserializes() {
        let json = r#"{
            "value": [
                {
                    "id": "AAMk1",
                    "subject": "Faktura F-1001",
                    "from": { "emailAddress": { "name": "Billing", "address": "billing@nordicparts.dk" } },
                    "receivedDateTime": "2026-01-09T08:15:00Z"
                },
                { "id": "AAMk2" }
            ]
        }"#;
        let list: ListResponse<GraphMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(list.value.len(), 2);
        assert_eq!(
            list.value[0]
                .from
                .as_ref()
                .and_then(|f| f.email_address.as_ref())
                .and_then(|a| a.address.as_deref()),
            Some("billing@nordicparts.dk")
        );
        assert_eq!(
            list.value[0].received_date_time.map(|t| t.to_rfc3339()),
            Some("2026-01-09T08:15:00+00:00".to_string())
        );
        assert!(list.value[1].from.is_none());
        assert!(list.value[1].received_date_time.is_none());
    }

    #[test]
    fn test_attachment_deserializes() {
        let json = r#"{
            "id": "att1",
            "name": "faktura.pdf",
            "contentType": "application/pdf",
            "size": 52341,
            "contentBytes": "JVBERi0xLjQ="
        }"#;
        let a: GraphAttachment = serde_json::from_str(json).unwrap();
        assert_eq!(a.name, "faktura.pdf");
        assert_eq!(a.size, 52341);
        assert!(a.content_bytes.is_some());
    }
}
