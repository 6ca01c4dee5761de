//! HTTP client for the Univia API and the pieces the watcher binary needs.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use univia_core::poller::{LocalNotification, MessageSource, Notifier};
use univia_core::{Actor, CoreError};
use univia_types::api::{LoginRequest, LoginResponse, PostMessageRequest, RegisterRequest, RegisterResponse, SubmitQuery};
use univia_types::models::{Message, Submission};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.read().await;
        let token = token.as_deref().ok_or_else(|| anyhow!("not signed in"))?;
        Ok(req.header(AUTHORIZATION, format!("Bearer {}", token)))
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let resp = self.http.post(self.url("/auth/register")).json(request).send().await;
        let registered: RegisterResponse = parse(resp.context("register request failed")?).await?;
        *self.token.write().await = Some(registered.token.clone());
        Ok(registered)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.http.post(self.url("/auth/login")).json(&body).send().await;
        let session: LoginResponse = parse(resp.context("login request failed")?).await?;
        *self.token.write().await = Some(session.token.clone());
        info!("Signed in as {} ({})", session.name, session.role.as_str());
        Ok(session)
    }

    pub async fn messages(&self) -> Result<Vec<Message>> {
        let req = self.authorized(self.http.get(self.url("/messages"))).await?;
        parse(req.send().await.context("message list request failed")?).await
    }

    pub async fn post_message(&self, content: &str) -> Result<Message> {
        let body = PostMessageRequest {
            content: content.to_string(),
        };
        let req = self.authorized(self.http.post(self.url("/messages")).json(&body)).await?;
        parse(req.send().await.context("post message request failed")?).await
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<()> {
        let req = self
            .authorized(self.http.post(self.url(&format!("/messages/{}/read", id))))
            .await?;
        check(req.send().await.context("mark read request failed")?).await?;
        Ok(())
    }

    /// Upload a document with its form fields.
    pub async fn submit(&self, query: &SubmitQuery, content_type: &str, document: Bytes) -> Result<Submission> {
        debug!("Submitting {} bytes as {}", document.len(), query.category);
        let req = self
            .http
            .post(self.url("/submissions"))
            .query(query)
            .header(CONTENT_TYPE, content_type)
            .body(document);
        let req = self.authorized(req).await?;
        parse(req.send().await.context("submission request failed")?).await
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("Univia API error: {} - {}", status, body))
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = check(resp).await?.text().await.context("response read failed")?;
    serde_json::from_str(&body).context("response parse failed")
}

#[async_trait]
impl MessageSource for ApiClient {
    /// The API already scopes read marks to the signed-in user.
    async fn fetch_messages(&self, _viewer: Actor) -> Result<Vec<Message>, CoreError> {
        Ok(self.messages().await?)
    }
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &LocalNotification) {
        info!(
            unread = notification.unread,
            "{}: {}", notification.title, notification.body
        );
    }
}
