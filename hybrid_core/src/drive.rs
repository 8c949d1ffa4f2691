//! Drive backup.
//!
//! Backing up takes two steps:
//! 1. Obtain a bearer token. An [`AuthorizationSurface`] (a browser window,
//!    a terminal prompt) is opened on the provider's consent URL and polled
//!    at a fixed interval until it yields a redirect carrying
//!    `access_token`, or is closed by the user. A surface that cannot be
//!    opened at all is reported as blocked.
//! 2. Upload the export envelope as a `multipart/related` body.
//!
//! The token is kept for the lifetime of [`DriveSync`], so later backups in
//! the same process skip step 1.

use crate::config::DriveConfig;
use crate::timer::Clock;
use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde_json::{json, Value};
use std::time::Duration;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

// ============================================================================
// Authorization
// ============================================================================

/// What a poll of the authorization surface observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Still waiting on the user
    Pending,
    /// The user closed the surface
    Closed,
    /// The surface landed on a redirect URL (or bare fragment)
    Redirected(String),
}

/// Something the user completes the consent flow in
pub trait AuthorizationSurface {
    /// Show the consent URL; `false` when the environment refuses to open it
    fn open(&mut self, url: &str) -> bool;

    fn poll(&mut self) -> SurfaceStatus;

    fn close(&mut self);
}

/// Result of the authorization task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Obtained(String),
    Cancelled,
    Blocked,
}

/// Consent URL for the implicit (token) flow
pub fn authorization_url(config: &DriveConfig, state_nonce: &str) -> Result<String> {
    let url = Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "token"),
            ("scope", DRIVE_SCOPE),
            ("state", state_nonce),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid drive authorization URL: {}", e)))?;
    Ok(url.into())
}

/// Extract `access_token` from a redirect URL, its fragment, or a bare
/// `key=value&...` string
pub fn access_token_from_redirect(redirect: &str) -> Option<String> {
    let redirect = redirect.trim();
    let params = match redirect.split_once('#') {
        Some((_, fragment)) => fragment,
        None => redirect.trim_start_matches('?'),
    };
    let url = Url::parse(&format!("http://localhost/?{}", params)).ok()?;
    url.query_pairs()
        .find(|(k, v)| k == "access_token" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Run the authorization task to completion
///
/// Polls every `interval` on `clock`. There is no timeout: a pending
/// surface is polled until the user closes it.
pub fn authorize(
    surface: &mut dyn AuthorizationSurface,
    auth_url: &str,
    clock: &dyn Clock,
    interval: Duration,
) -> AuthOutcome {
    if !surface.open(auth_url) {
        tracing::warn!("Authorization surface could not be opened");
        return AuthOutcome::Blocked;
    }

    loop {
        match surface.poll() {
            SurfaceStatus::Closed => {
                tracing::info!("Authorization surface closed before a token was received");
                return AuthOutcome::Cancelled;
            }
            SurfaceStatus::Redirected(location) => {
                if let Some(token) = access_token_from_redirect(&location) {
                    surface.close();
                    tracing::info!("Drive access token obtained");
                    return AuthOutcome::Obtained(token);
                }
                tracing::debug!("Redirect without access token, still waiting");
            }
            SurfaceStatus::Pending => {}
        }
        clock.sleep(interval);
    }
}

// ============================================================================
// Upload
// ============================================================================

/// Sends a backup file to the drive
pub trait Uploader {
    /// Upload `content` with the given file metadata; returns the file id
    fn upload(&self, token: &str, metadata: &Value, content: &[u8]) -> Result<String>;
}

/// Metadata for a backup file named after the current time
pub fn backup_metadata() -> Value {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    json!({
        "name": format!("hybrid_master_51_backup_{}.json", stamp),
        "mimeType": "application/json",
    })
}

/// `multipart/related` body: JSON metadata part, then the file content
pub fn multipart_body(boundary: &str, metadata: &Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());
    body
}

/// Uploads over HTTPS with a blocking client
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint: UPLOAD_ENDPOINT.to_string(),
        })
    }

    /// Override the upload endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, token: &str, metadata: &Value, content: &[u8]) -> Result<String> {
        let boundary = format!("----HybridBoundary{}", uuid::Uuid::new_v4().simple());
        let body = multipart_body(&boundary, metadata, content);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .map_err(|e| {
                tracing::error!("Drive upload request failed: {}", e);
                Error::Upload("unable to send the file to the drive".into())
            })?;

        let status = response.status();
        let reply: Value = response.json().map_err(|e| {
            tracing::error!("Drive upload returned {} with unreadable body: {}", status, e);
            Error::Upload("unable to send the file to the drive".into())
        })?;

        file_id_from_reply(&reply)
    }
}

/// Success is a reply carrying the new file's `id`
fn file_id_from_reply(reply: &Value) -> Result<String> {
    match reply.get("id").and_then(Value::as_str) {
        Some(id) => Ok(id.to_string()),
        None => {
            tracing::error!("Drive upload rejected: {}", reply);
            Err(Error::Upload("unable to send the file to the drive".into()))
        }
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Drive backup with a cached access token
pub struct DriveSync<U: Uploader> {
    config: DriveConfig,
    uploader: U,
    token: Option<String>,
}

impl<U: Uploader> DriveSync<U> {
    pub fn new(config: DriveConfig, uploader: U) -> Self {
        Self {
            config,
            uploader,
            token: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Authorize if needed, then upload `snapshot`; returns the file id
    pub fn backup(
        &mut self,
        snapshot: &[u8],
        surface: &mut dyn AuthorizationSurface,
        clock: &dyn Clock,
    ) -> Result<String> {
        if !self.is_enabled() {
            return Err(Error::Config(format!(
                "drive backup is disabled; set drive.client_id (scope {}) in the config file",
                DRIVE_SCOPE
            )));
        }

        let token = match self.token.clone() {
            Some(token) => token,
            None => {
                let nonce = format!("hybrid_master_51_{}", Utc::now().timestamp_millis());
                let url = authorization_url(&self.config, &nonce)?;
                match authorize(surface, &url, clock, self.config.poll_interval()) {
                    AuthOutcome::Obtained(token) => {
                        self.token = Some(token.clone());
                        token
                    }
                    AuthOutcome::Cancelled => {
                        return Err(Error::Authorization(
                            "authorization window closed before a token was received".into(),
                        ))
                    }
                    AuthOutcome::Blocked => {
                        return Err(Error::Authorization(
                            "authorization window was blocked".into(),
                        ))
                    }
                }
            }
        };

        let file_id = self.uploader.upload(&token, &backup_metadata(), snapshot)?;
        tracing::info!(file_id = %file_id, "Drive backup uploaded");
        Ok(file_id)
    }
}
