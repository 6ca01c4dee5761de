use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::links::drive_view_link;
use crate::{DocumentStore, Progress, ProgressTracker, StorageError, StoredDocument, UploadRequest, sha256_hex};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,webViewLink&supportsAllDrives=true";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const UPLOAD_CHUNK: usize = 256 * 1024;
/// Refresh this long before the token actually expires.
const TOKEN_SKEW_SECS: i64 = 60;

/// The subset of a Google service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

/// Google Drive backend authenticated as a service account.
pub struct DriveStore {
    http: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    upload_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl DriveStore {
    /// Load service-account credentials from a JSON key file. A missing or
    /// malformed file is fatal: there is no way to upload without it.
    pub async fn from_credentials_file(path: &Path) -> Result<Self, StorageError> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            StorageError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        let key: ServiceAccountKey = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::Credentials(format!("malformed key file: {}", e)))?;
        let store = Self::new(key)?;
        info!("Drive storage configured for {}", store.key.client_email);
        Ok(store)
    }

    pub fn new(key: ServiceAccountKey) -> Result<Self, StorageError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let http = Client::builder().timeout(Duration::from_secs(300)).build()?;
        Ok(Self {
            http,
            key,
            signing_key,
            upload_url: DEFAULT_UPLOAD_URL.into(),
            token: Mutex::new(None),
        })
    }

    /// Send uploads to another multipart endpoint instead of Google's.
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_SKEW_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;

        debug!("Obtained Drive access token valid for {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl DocumentStore for DriveStore {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Progress<'_>,
    ) -> Result<StoredDocument, StorageError> {
        if request.bytes.is_empty() {
            return Err(StorageError::Empty);
        }

        let token = self.access_token().await?;
        let boundary = format!("univia-{}", Uuid::new_v4().simple());
        let (head, tail) = multipart_frame(&boundary, &request.name, &request.folder, &request.content_type);
        let content_length = head.len() + request.bytes.len() + tail.len();

        // The body stream reports how many document bytes hyper has pulled;
        // progress is forwarded from here while the request is in flight.
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<usize>();
        let document = request.bytes.clone();
        let stream = async_stream::stream! {
            yield Ok::<Bytes, std::io::Error>(head);
            let mut offset = 0;
            while offset < document.len() {
                let end = (offset + UPLOAD_CHUNK).min(document.len());
                let chunk = document.slice(offset..end);
                let _ = sent_tx.send(chunk.len());
                yield Ok(chunk);
                offset = end;
            }
            yield Ok(tail);
        };

        let mut tracker = ProgressTracker::start(request.bytes.len() as u64, progress);
        let send = self
            .http
            .post(&self.upload_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(stream))
            .send();
        tokio::pin!(send);

        let response = loop {
            tokio::select! {
                Some(n) = sent_rx.recv() => tracker.advance(n as u64),
                result = &mut send => break result?,
            }
        };
        while let Ok(n) = sent_rx.try_recv() {
            tracker.advance(n as u64);
        }

        let file: DriveFile = check(response).await?.json().await?;
        tracker.finish();
        info!("Uploaded '{}' to Drive folder {} as {}", request.name, request.folder, file.id);

        Ok(StoredDocument {
            link: drive_view_link(&file.id),
            file_id: file.id,
            size: request.bytes.len() as u64,
            sha256: sha256_hex(&request.bytes),
        })
    }

    fn backend(&self) -> &'static str {
        "drive"
    }
}

/// Opening and closing parts of a `multipart/related` upload body; the
/// document bytes go between them.
fn multipart_frame(boundary: &str, name: &str, folder: &str, content_type: &str) -> (Bytes, Bytes) {
    let metadata = serde_json::json!({ "name": name, "parents": [folder] });
    let head = format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {ct}\r\n\r\n",
        b = boundary,
        m = metadata,
        ct = content_type,
    );
    let tail = format!("\r\n--{}--\r\n", boundary);
    (Bytes::from(head), Bytes::from(tail))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected {
        status: status.as_u16(),
        body,
    })
}
