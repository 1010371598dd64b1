use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::languages::Language;
use crate::selection::SelectedFile;

mod http;

pub use http::HttpCaptionService;

/// Multipart field names the upload endpoint reads.
pub const FILE_FIELD: &str = "file";
pub const LANGUAGE_FIELD: &str = "language";

/// One upload: the picked image and the target language.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: SelectedFile,
    pub language: Language,
}

/// Body of a successful `/api/upload` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub filename: String,
    pub caption: String,
    pub translated: String,
    pub audio_file: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

pub type UploadOutcome = Result<SubmissionResult, UploadError>;

pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = UploadOutcome> + Send + 'a>>;

/// The remote caption/translate/narrate pipeline.
pub trait CaptionService: Send + Sync {
    fn upload(&self, request: UploadRequest) -> UploadFuture<'_>;
}
