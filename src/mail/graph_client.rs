//! Microsoft Graph-backed `MailSource` (§4.2, §6 "Mail provider API"),
//! grounded on `mail.py`'s `endless_email_read_generator` /
//! `set_email_seen_status` / `delete_emails` / `send_email`, reimplemented
//! against the plain Graph REST API with `reqwest` rather than the
//! `msgraph` Python SDK.

use super::{MailAdapterError, MailMessage, MailSource, ReadOptions};
use crate::config::AzureConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
const TOKEN_URL_TEMPLATE: &str = "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";
/// The remote's hard cap on sub-operations per `$batch` call (§6).
const BATCH_LIMIT: usize = 20;

pub struct GraphMailAdapter {
    http: reqwest::Client,
    config: AzureConfig,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct MessagePage {
    #[serde(default)]
    value: Vec<GraphMessage>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct GraphMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    sender: Option<GraphRecipient>,
    #[serde(default, rename = "toRecipients")]
    to_recipients: Vec<GraphRecipient>,
    #[serde(default, rename = "receivedDateTime")]
    received_date_time: String,
    #[serde(default, rename = "isRead")]
    is_read: bool,
    #[serde(default, rename = "uniqueBody")]
    unique_body: Option<GraphBody>,
}

#[derive(Deserialize)]
struct GraphRecipient {
    #[serde(rename = "emailAddress")]
    email_address: Option<GraphEmailAddress>,
}

#[derive(Deserialize)]
struct GraphEmailAddress {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
struct GraphBody {
    #[serde(default)]
    content: String,
}

fn recipient_address(recipient: &Option<GraphRecipient>) -> String {
    recipient
        .as_ref()
        .and_then(|r| r.email_address.as_ref())
        .map(|a| a.address.clone())
        .unwrap_or_default()
}

impl From<GraphMessage> for MailMessage {
    fn from(msg: GraphMessage) -> Self {
        // §3 Email.recipients: comma-joined, first 50.
        let recipients = msg
            .to_recipients
            .iter()
            .take(50)
            .filter_map(|r| r.email_address.as_ref())
            .map(|a| a.address.clone())
            .collect::<Vec<_>>()
            .join(", ");

        MailMessage {
            id: msg.id,
            subject: msg.subject,
            sender: recipient_address(&msg.sender),
            recipients,
            date_received: msg.received_date_time,
            is_read: msg.is_read,
            body: msg.unique_body.map(|b| b.content).unwrap_or_default(),
        }
    }
}

impl GraphMailAdapter {
    pub fn new(config: AzureConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, MailAdapterError> {
        if let Some(cached) = self.token.lock().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let url = TOKEN_URL_TEMPLATE.replace("{tenant}", &self.config.tenant_id);
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret_value.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
            ("grant_type", "client_credentials"),
        ];

        let response = self.http.post(&url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(MailAdapterError::Provider(format!(
                "token request failed with status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailAdapterError::Malformed(e.to_string()))?;

        let expires_at = Instant::now() + Duration::from_secs(body.expires_in.saturating_sub(60));
        *self.token.lock() = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at,
        });

        Ok(body.access_token)
    }

    fn me_url(&self) -> String {
        format!("{GRAPH_BASE}/users/{}", self.config.user_id)
    }

    async fn fetch_page(
        &self,
        url: &str,
        is_first: bool,
        options: &ReadOptions,
    ) -> Result<MessagePage, MailAdapterError> {
        let token = self.access_token().await?;

        let request = if is_first {
            // §6: properties in `orderby` must also appear in `filter`, in
            // the same prefix order — the folder clause leads, matching
            // `endless_email_read_generator`'s filter construction.
            let folder_filter = options
                .folders
                .iter()
                .map(|f| format!("parentFolderId eq '{f}'"))
                .collect::<Vec<_>>()
                .join(" or ");
            let filter = if options.unseen_only {
                format!("{folder_filter} and isRead eq false")
            } else {
                folder_filter
            };
            let orderby = if options.most_recent_first {
                "receivedDateTime desc"
            } else {
                "receivedDateTime asc"
            };

            self.http
                .get(format!("{}/messages", self.me_url()))
                .bearer_auth(&token)
                .header("Prefer", "outlook.body-content-type=\"text\"")
                .query(&[
                    ("$top", options.batch_size.min(options.n).to_string()),
                    ("$filter", filter),
                    ("$orderby", orderby.to_string()),
                    (
                        "$select",
                        "id,subject,sender,toRecipients,receivedDateTime,uniqueBody,isRead"
                            .to_string(),
                    ),
                ])
        } else {
            self.http
                .get(url)
                .bearer_auth(&token)
                .header("Prefer", "outlook.body-content-type=\"text\"")
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailAdapterError::Provider(format!(
                "messages request failed with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MailAdapterError::Malformed(e.to_string()))
    }

    async fn post_batch(&self, requests: &[Value]) -> Result<(), MailAdapterError> {
        if requests.is_empty() {
            return Ok(());
        }

        let token = self.access_token().await?;
        for chunk in requests.chunks(BATCH_LIMIT) {
            let response = self
                .http
                .post(format!("{GRAPH_BASE}/$batch"))
                .bearer_auth(&token)
                .json(&json!({ "requests": chunk }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(MailAdapterError::Provider(format!(
                    "batch request failed with status {}",
                    response.status()
                )));
            }
        }

        Ok(())
    }

    async fn mark_as_read(&self, ids: &[String]) -> Result<(), MailAdapterError> {
        let requests: Vec<Value> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "id": i.to_string(),
                    "method": "PATCH",
                    "url": format!("/users/{}/messages/{}", self.config.user_id, id),
                    "headers": { "Content-Type": "application/json" },
                    "body": { "isRead": true },
                })
            })
            .collect();
        self.post_batch(&requests).await
    }

    async fn delete_messages(&self, ids: &[String]) -> Result<(), MailAdapterError> {
        let requests: Vec<Value> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "id": (i + 1).to_string(),
                    "method": "DELETE",
                    "url": format!("/users/{}/messages/{}", self.config.user_id, id),
                })
            })
            .collect();
        self.post_batch(&requests).await
    }
}

#[async_trait]
impl MailSource for GraphMailAdapter {
    async fn read_batches(
        &self,
        options: ReadOptions,
        stop: &CancellationToken,
    ) -> Result<Vec<Vec<MailMessage>>, MailAdapterError> {
        let mut pages = Vec::new();
        let mut yielded = 0usize;
        let mut next_link: Option<String> = None;
        let mut is_first = true;

        loop {
            let page = tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    log::info!("mail read cancelled; returning {} page(s) already fetched", pages.len());
                    break;
                }
                result = self.fetch_page(next_link.as_deref().unwrap_or(""), is_first, &options) => result?,
            };
            is_first = false;

            if page.value.is_empty() {
                break;
            }

            let mut kept = Vec::new();
            let mut to_delete = Vec::new();
            let mut to_mark_read = Vec::new();

            for message in page.value {
                if options.remove_undelivered && super::bounce::is_bounce_subject(&message.subject)
                {
                    to_delete.push(message.id.clone());
                    continue;
                }
                if options.set_to_read {
                    to_mark_read.push(message.id.clone());
                }
                kept.push(MailMessage::from(message));
            }

            yielded += kept.len();
            if !kept.is_empty() {
                pages.push(kept);
            }

            if options.set_to_read && !to_mark_read.is_empty() {
                self.mark_as_read(&to_mark_read).await?;
            }
            if options.remove_undelivered && !to_delete.is_empty() {
                self.delete_messages(&to_delete).await?;
            }

            match page.next_link {
                Some(link) if yielded < options.n => next_link = Some(link),
                _ => break,
            }
        }

        Ok(pages)
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, MailAdapterError> {
        let token = self.access_token().await?;
        let payload = json!({
            "message": {
                "subject": subject,
                "body": { "contentType": "Text", "content": body },
                "toRecipients": [{ "emailAddress": { "address": to } }],
            },
            "saveToSentItems": true,
        });

        let response = self
            .http
            .post(format!("{}/sendMail", self.me_url()))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
