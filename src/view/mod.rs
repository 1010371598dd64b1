use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::form::UploadForm;
use crate::languages::{self, Language};
use crate::selection::ACCEPTED_EXTENSIONS;
use crate::settings::Endpoints;

pub const TITLE: &str = "Image Caption Translator";
pub const SUBMIT_LABEL: &str = "Upload and Process";
pub const PROCESSING_LABEL: &str = "Processing...";
pub const RESET_LABEL: &str = "Upload Another Image";
pub const NARRATION_MIME: &str = "audio/mp3";

const FORM_TEXT_TEMPLATE: &str = include_str!("templates/form.txt.tera");
const RESULT_HTML_TEMPLATE: &str = include_str!("templates/result.html.tera");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitControl {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub image_url: String,
    pub caption: String,
    pub translated_label: String,
    pub translated: String,
    pub audio_url: String,
    pub audio_mime: &'static str,
}

/// Everything a front-end needs to draw the form and, when present, the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub title: &'static str,
    pub file: Option<String>,
    pub accept: String,
    pub language: Language,
    pub languages: Vec<&'static str>,
    pub submit: SubmitControl,
    pub result: Option<ResultView>,
}

impl FormView {
    pub fn build(form: &UploadForm, endpoints: &Endpoints) -> Self {
        let submit = if form.in_flight() {
            SubmitControl {
                label: PROCESSING_LABEL,
                enabled: false,
            }
        } else {
            SubmitControl {
                label: SUBMIT_LABEL,
                enabled: true,
            }
        };
        // The label follows the current selection, not the one submitted.
        let result = form.result().map(|result| ResultView {
            image_url: endpoints.asset_url(&result.filename).to_string(),
            caption: result.caption.clone(),
            translated_label: format!("Translated Caption ({})", form.language()),
            translated: result.translated.clone(),
            audio_url: endpoints.asset_url(&result.audio_file).to_string(),
            audio_mime: NARRATION_MIME,
        });
        Self {
            title: TITLE,
            file: form.file().map(|file| file.name.clone()),
            accept: accept_hint(),
            language: form.language(),
            languages: languages::supported_names(),
            submit,
            result,
        }
    }
}

fn accept_hint() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_text(view: &FormView) -> Result<String> {
    let mut context =
        TeraContext::from_serialize(view).with_context(|| "failed to build view context")?;
    context.insert("reset_label", RESET_LABEL);
    Tera::one_off(FORM_TEXT_TEMPLATE, &context, false)
        .with_context(|| "failed to render form view")
}

pub fn render_html(view: &FormView) -> Result<String> {
    let context =
        TeraContext::from_serialize(view).with_context(|| "failed to build page context")?;
    Tera::one_off(RESULT_HTML_TEMPLATE, &context, true)
        .with_context(|| "failed to render result page")
}
