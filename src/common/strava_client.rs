//! Strava API client for uploading GPX tracks.
//!
//! Uploads are asynchronous on Strava's side: the upload request returns an
//! upload id, and the activity only exists once processing finishes. The
//! client polls the upload status until it reports an activity id or an
//! error, bounded by the configured timeout.

use crate::common::config::{Config, HttpConfig, StravaApiConfig, StravaCredentials};
use crate::common::error::UploadError;
use crate::common::types::{ActivityType, UploadedActivity};
use crate::tour_sync::ActivityUploader;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upload status as returned by `POST /uploads` and `GET /uploads/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadStatus {
    pub id: u64,
    pub external_id: Option<String>,
    pub error: Option<String>,
    pub status: Option<String>,
    pub activity_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadProgress {
    Processing,
    Ready(u64),
    Failed(String),
}

impl UploadStatus {
    pub fn progress(&self) -> UploadProgress {
        if let Some(error) = &self.error {
            return UploadProgress::Failed(error.clone());
        }
        match self.activity_id {
            Some(activity_id) => UploadProgress::Ready(activity_id),
            None => UploadProgress::Processing,
        }
    }
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    poll_interval: Duration,
    upload_timeout: Duration,
}

impl StravaClient {
    pub fn new(
        api: &StravaApiConfig,
        http: &HttpConfig,
        credentials: &StravaCredentials,
    ) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout)
            .timeout(http.request_timeout)
            .build()?;

        Ok(Self {
            http: client,
            base_url: api.api_url.trim_end_matches('/').to_string(),
            access_token: credentials.access_token.clone(),
            poll_interval: api.upload_poll_interval,
            upload_timeout: api.upload_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        Self::new(&config.strava_api, &config.http, &config.strava)
    }

    /// Submit a GPX file as a new upload.
    pub async fn submit_upload(
        &self,
        path: &Path,
        name: &str,
        activity_type: Option<ActivityType>,
    ) -> Result<UploadStatus, UploadError> {
        let contents = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track.gpx".to_string());
        let file = Part::bytes(contents)
            .file_name(file_name)
            .mime_str("application/gpx+xml")?;

        let mut form = Form::new()
            .part("file", file)
            .text("data_type", "gpx")
            .text("name", name.to_string());
        if let Some(activity_type) = activity_type {
            form = form.text("activity_type", activity_type.upload_param());
        }

        let response = self
            .http
            .post(format!("{}/uploads", self.base_url))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;

        self.check_response_json(response).await
    }

    /// Get the current status of an upload.
    pub async fn upload_status(&self, upload_id: u64) -> Result<UploadStatus, UploadError> {
        let response = self
            .http
            .get(format!("{}/uploads/{upload_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        self.check_response_json(response).await
    }

    /// Poll an upload until Strava reports an activity id or an error.
    pub async fn wait_for_activity(
        &self,
        initial: UploadStatus,
    ) -> Result<UploadedActivity, UploadError> {
        let upload_id = initial.id;
        tokio::time::timeout(self.upload_timeout, self.poll_upload(initial))
            .await
            .map_err(|_| UploadError::Timeout {
                upload_id,
                waited: self.upload_timeout,
            })?
    }

    async fn poll_upload(&self, initial: UploadStatus) -> Result<UploadedActivity, UploadError> {
        let upload_id = initial.id;
        let mut status = initial;
        loop {
            match status.progress() {
                UploadProgress::Ready(activity_id) => {
                    return Ok(UploadedActivity {
                        upload_id,
                        activity_id,
                    });
                }
                UploadProgress::Failed(message) => {
                    return Err(UploadError::Processing { upload_id, message });
                }
                UploadProgress::Processing => {
                    debug!(upload_id, status = ?status.status, "Upload still processing");
                    tokio::time::sleep(self.poll_interval).await;
                    status = self.upload_status(upload_id).await?;
                }
            }
        }
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, UploadError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("Strava rate limit hit (429)");
                return Err(UploadError::RateLimited);
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(UploadError::Unauthorized);
            }

            return Err(UploadError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

impl ActivityUploader for StravaClient {
    async fn upload(
        &self,
        path: &Path,
        name: &str,
        activity_type: Option<ActivityType>,
    ) -> Result<UploadedActivity, UploadError> {
        info!(path = %path.display(), activity_type = ?activity_type, "Uploading to Strava");
        let status = self.submit_upload(path, name, activity_type).await?;
        debug!(upload_id = status.id, "Upload accepted");
        self.wait_for_activity(status).await
    }
}
