//! Upload form controller.
//!
//! Owns the picked file, the target language and the submission lifecycle:
//! `Idle -> Pending -> ShowingResult -> Idle`. Every transition goes through
//! one of the four user operations (`select_file`, `select_language`,
//! `submit`, `reset`); the network call is split into [`UploadForm::begin_submit`]
//! and [`UploadForm::settle`] so an event loop can dispatch it on its own.

use std::fmt;
use tracing::{debug, error, warn};

use crate::languages::Language;
use crate::selection::{ACCEPTED_EXTENSIONS, SelectedFile};
use crate::service::{CaptionService, SubmissionResult, UploadOutcome, UploadRequest};

/// Identifies one dispatch. Only the newest ticket may settle the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending(Ticket),
    ShowingResult(SubmissionResult),
}

/// User-visible notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SelectFile,
    UploadFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::SelectFile => "Please select a file before submitting.",
            Notice::UploadFailed => "Error uploading file or processing the request.",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A request that has been accepted and must now be sent.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub request: UploadRequest,
}

#[derive(Debug, Clone)]
pub struct UploadForm {
    file: Option<SelectedFile>,
    language: Language,
    phase: Phase,
    next_ticket: u64,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl UploadForm {
    pub fn new(language: Language) -> Self {
        Self {
            file: None,
            language,
            phase: Phase::Idle,
            next_ticket: 0,
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.phase, Phase::Pending(_))
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        match &self.phase {
            Phase::ShowingResult(result) => Some(result),
            _ => None,
        }
    }

    pub fn select_file(&mut self, file: SelectedFile) {
        if file.is_empty() {
            warn!("{} is empty; uploading anyway", file.name);
        }
        if !file.has_accepted_extension() {
            warn!(
                "{} is not one of .{}; uploading anyway",
                file.name,
                ACCEPTED_EXTENSIONS.join(", .")
            );
        }
        self.file = Some(file);
    }

    pub fn select_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Clears the result and returns to the form. File and language stay.
    pub fn reset(&mut self) {
        if matches!(self.phase, Phase::ShowingResult(_)) {
            self.phase = Phase::Idle;
        }
    }

    /// Checks the precondition and moves to `Pending`, clearing any result.
    /// A dispatch made while another is pending supersedes it.
    pub fn begin_submit(&mut self) -> Result<Dispatch, Notice> {
        let Some(file) = self.file.clone() else {
            return Err(Notice::SelectFile);
        };
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        if let Phase::Pending(previous) = self.phase {
            debug!("dispatch {:?} supersedes {:?}", ticket, previous);
        }
        self.phase = Phase::Pending(ticket);
        Ok(Dispatch {
            ticket,
            request: UploadRequest {
                file,
                language: self.language,
            },
        })
    }

    /// Applies the outcome of a dispatch. Settlements for any ticket other
    /// than the pending one are dropped without touching state.
    pub fn settle(&mut self, ticket: Ticket, outcome: UploadOutcome) -> Result<(), Notice> {
        if self.phase != Phase::Pending(ticket) {
            debug!("discarding stale settlement for {:?}", ticket);
            return Ok(());
        }
        match outcome {
            Ok(result) => {
                debug!("upload {:?} produced {}", ticket, result.filename);
                self.phase = Phase::ShowingResult(result);
                Ok(())
            }
            Err(err) => {
                error!("upload failed: {}", err);
                self.phase = Phase::Idle;
                Err(Notice::UploadFailed)
            }
        }
    }

    pub async fn submit<S>(&mut self, service: &S) -> Result<(), Notice>
    where
        S: CaptionService + ?Sized,
    {
        let Dispatch { ticket, request } = self.begin_submit()?;
        let outcome = service.upload(request).await;
        self.settle(ticket, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{UploadError, UploadFuture};
    use std::sync::Mutex;

    struct StubService {
        outcome: fn() -> UploadOutcome,
        calls: Mutex<Vec<UploadRequest>>,
    }

    impl StubService {
        fn new(outcome: fn() -> UploadOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<UploadRequest> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl CaptionService for StubService {
        fn upload(&self, request: UploadRequest) -> UploadFuture<'_> {
            self.calls.lock().expect("calls lock").push(request);
            let outcome = (self.outcome)();
            Box::pin(async move { outcome })
        }
    }

    fn dog() -> UploadOutcome {
        Ok(SubmissionResult {
            filename: "a.jpg".to_string(),
            caption: "a dog".to_string(),
            translated: "एक कुत्ता".to_string(),
            audio_file: "a.mp3".to_string(),
        })
    }

    fn server_error() -> UploadOutcome {
        Err(UploadError::Status {
            status: 500,
            message: "Failed to generate caption for the image".to_string(),
        })
    }

    fn picked() -> SelectedFile {
        SelectedFile::from_bytes(vec![1, 2, 3], "a.jpg")
    }

    #[tokio::test]
    async fn submit_without_file_never_calls_service() {
        let service = StubService::new(dog);
        let mut form = UploadForm::default();

        assert_eq!(form.submit(&service).await, Err(Notice::SelectFile));
        assert!(service.calls().is_empty());
        assert_eq!(form.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn successful_submit_stores_result_and_clears_in_flight() {
        let service = StubService::new(dog);
        let mut form = UploadForm::default();
        form.select_file(picked());
        form.select_language(Language::Tamil);

        assert_eq!(form.submit(&service).await, Ok(()));
        assert!(!form.in_flight());
        assert_eq!(form.result().map(|r| r.caption.as_str()), Some("a dog"));
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].language, Language::Tamil);
        assert_eq!(calls[0].file.name, "a.jpg");
    }

    #[tokio::test]
    async fn failed_submit_leaves_no_result() {
        let service = StubService::new(server_error);
        let mut form = UploadForm::default();
        form.select_file(picked());

        assert_eq!(form.submit(&service).await, Err(Notice::UploadFailed));
        assert!(!form.in_flight());
        assert!(form.result().is_none());
        assert_eq!(form.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn resubmitting_clears_previous_result_before_dispatch() {
        let service = StubService::new(dog);
        let mut form = UploadForm::default();
        form.select_file(picked());
        form.submit(&service).await.expect("first submit");
        assert!(form.result().is_some());

        let dispatch = form.begin_submit().expect("dispatch");
        assert!(form.in_flight());
        assert!(form.result().is_none());
        form.settle(dispatch.ticket, server_error())
            .expect_err("failure notice");
        assert!(form.result().is_none());
    }

    #[tokio::test]
    async fn reset_keeps_selection_and_is_idempotent() {
        let service = StubService::new(dog);
        let mut form = UploadForm::default();
        form.select_file(picked());
        form.select_language(Language::Kannada);
        form.submit(&service).await.expect("submit");

        form.reset();
        assert_eq!(form.phase(), &Phase::Idle);
        assert_eq!(form.language(), Language::Kannada);
        assert_eq!(form.file().map(|f| f.name.as_str()), Some("a.jpg"));

        let before = form.clone();
        form.reset();
        assert_eq!(form.phase(), before.phase());
        assert_eq!(form.language(), before.language());
        assert_eq!(form.file(), before.file());
    }

    #[test]
    fn reset_does_not_cancel_a_pending_dispatch() {
        let mut form = UploadForm::default();
        form.select_file(picked());
        let dispatch = form.begin_submit().expect("dispatch");
        form.reset();
        assert!(form.in_flight());
        form.settle(dispatch.ticket, dog()).expect("settle");
        assert!(form.result().is_some());
    }

    #[test]
    fn empty_file_is_still_submitted() {
        let mut form = UploadForm::default();
        form.select_file(SelectedFile::from_bytes(Vec::new(), "blank.png"));
        let dispatch = form.begin_submit().expect("dispatch");
        assert!(dispatch.request.file.is_empty());
        assert_eq!(dispatch.request.file.name, "blank.png");
    }

    #[test]
    fn stale_settlements_are_discarded() {
        let mut form = UploadForm::default();
        form.select_file(picked());
        let first = form.begin_submit().expect("first");
        let second = form.begin_submit().expect("second");
        assert!(first.ticket < second.ticket);

        form.settle(second.ticket, dog()).expect("newest settles");
        assert_eq!(form.result().map(|r| r.filename.as_str()), Some("a.jpg"));

        assert_eq!(form.settle(first.ticket, server_error()), Ok(()));
        assert!(form.result().is_some());
    }

    #[test]
    fn older_failure_does_not_end_newer_pending_dispatch() {
        let mut form = UploadForm::default();
        form.select_file(picked());
        let first = form.begin_submit().expect("first");
        let second = form.begin_submit().expect("second");

        assert_eq!(form.settle(first.ticket, server_error()), Ok(()));
        assert_eq!(form.phase(), &Phase::Pending(second.ticket));
    }

    #[test]
    fn dispatch_carries_every_language_verbatim() {
        let mut form = UploadForm::default();
        form.select_file(picked());
        for lang in Language::ALL {
            form.select_language(lang);
            let dispatch = form.begin_submit().expect("dispatch");
            assert_eq!(dispatch.request.language.as_str(), lang.as_str());
        }
    }

    #[test]
    fn notice_texts() {
        assert_eq!(
            Notice::SelectFile.to_string(),
            "Please select a file before submitting."
        );
        assert_eq!(
            Notice::UploadFailed.to_string(),
            "Error uploading file or processing the request."
        );
    }
}
