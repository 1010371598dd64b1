use anyhow::{Context, Result, anyhow};
use reqwest::multipart;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{
    CaptionService, FILE_FIELD, LANGUAGE_FIELD, SubmissionResult, UploadError, UploadFuture,
    UploadOutcome, UploadRequest,
};
use crate::settings::Endpoints;

#[derive(Debug, Clone)]
pub struct HttpCaptionService {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpCaptionService {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Plain GET of a server-assigned asset under the uploads directory.
    pub async fn fetch_asset(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.endpoints.asset_url(name);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch asset: {}", url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("asset {} returned {}", url, status));
        }
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read asset body: {}", url))?;
        Ok(bytes.to_vec())
    }

    /// Downloads the stored image and its narration into `dir`.
    pub async fn save_assets(&self, result: &SubmissionResult, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create asset directory: {}", dir.display()))?;
        let mut saved = Vec::new();
        for name in [&result.filename, &result.audio_file] {
            let bytes = self.fetch_asset(name).await?;
            let dest = dir.join(local_name(name)?);
            tokio::fs::write(&dest, &bytes)
                .await
                .with_context(|| format!("failed to write asset: {}", dest.display()))?;
            info!("saved {} ({} bytes)", dest.display(), bytes.len());
            saved.push(dest);
        }
        Ok(saved)
    }

    async fn send(&self, request: UploadRequest) -> UploadOutcome {
        let url = self.endpoints.upload_url();
        let file = request.file;
        debug!(
            "uploading {} ({}, {} bytes) to {} for {}",
            file.name,
            file.mime,
            file.len(),
            url,
            request.language
        );
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(UploadError::Transport)?;
        let form = multipart::Form::new()
            .part(FILE_FIELD, part)
            .text(LANGUAGE_FIELD, request.language.as_str());

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(UploadError::Transport)?;
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                message: extract_service_error(&text).unwrap_or(text),
            });
        }
        parse_submission(&text)
    }
}

impl CaptionService for HttpCaptionService {
    fn upload(&self, request: UploadRequest) -> UploadFuture<'_> {
        Box::pin(self.send(request))
    }
}

fn parse_submission(text: &str) -> UploadOutcome {
    serde_json::from_str(text).map_err(|err| UploadError::MalformedBody(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

fn extract_service_error(text: &str) -> Option<String> {
    serde_json::from_str::<ServiceError>(text)
        .ok()
        .map(|body| body.error)
        .filter(|message| !message.trim().is_empty())
}

/// Server-assigned names are used as local file names; reject anything that
/// would escape the target directory.
fn local_name(name: &str) -> Result<&str> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| anyhow!("asset name is not a file name: {}", name))?;
    if file_name != name {
        return Err(anyhow!("asset name is not a file name: {}", name));
    }
    Ok(file_name)
}
