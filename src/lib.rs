use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub mod form;
pub mod languages;
pub mod logging;
pub mod selection;
pub mod service;
pub mod settings;
mod test_util;
pub mod view;

pub use form::{Notice, Phase, UploadForm};
pub use languages::Language;
pub use service::{CaptionService, HttpCaptionService, SubmissionResult, UploadError};
pub use view::FormView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Html,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: Option<String>,
    pub lang: Option<String>,
    pub base_url: Option<String>,
    pub settings_path: Option<String>,
    pub format: OutputFormat,
    pub output: Option<String>,
    pub save_assets: Option<String>,
    pub show_languages: bool,
}

/// The form controller wired to the HTTP service.
pub struct App {
    pub form: UploadForm,
    pub service: HttpCaptionService,
}

impl App {
    pub fn new(settings: &settings::Settings) -> Result<Self> {
        let endpoints = settings.endpoints()?;
        Ok(Self {
            form: UploadForm::new(settings.default_language),
            service: HttpCaptionService::new(endpoints),
        })
    }

    pub fn view(&self) -> FormView {
        FormView::build(&self.form, self.service.endpoints())
    }

    pub fn select_file_path(&mut self, path: &Path) -> Result<()> {
        let file = selection::load_file(path)?;
        self.form.select_file(file);
        Ok(())
    }

    pub async fn submit(&mut self) -> Result<(), Notice> {
        self.form.submit(&self.service).await
    }

    pub async fn save_assets(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let result = self
            .form
            .result()
            .ok_or_else(|| anyhow!("no result to save; submit an image first"))?;
        self.service.save_assets(result, dir).await
    }
}

pub fn load_app(config: &Config) -> Result<App> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(base_url) = config.base_url.as_deref()
        && !base_url.trim().is_empty()
    {
        settings.base_url = base_url.trim().to_string();
    }
    let mut app = App::new(&settings)?;
    if let Some(lang) = config.lang.as_deref() {
        app.form.select_language(lang.parse()?);
    }
    if let Some(path) = config.file.as_deref() {
        app.select_file_path(Path::new(path))?;
    }
    Ok(app)
}

pub async fn run(config: Config) -> Result<String> {
    if config.show_languages {
        return Ok(format_languages());
    }

    let mut app = load_app(&config)?;
    app.submit().await.map_err(|notice| anyhow!("{}", notice))?;

    let mut output = format_view(&app.view(), config.format)?;
    if let Some(dir) = config.save_assets.as_deref() {
        let saved = app.save_assets(Path::new(dir)).await?;
        if config.output.is_none() && config.format == OutputFormat::Text {
            for path in saved {
                output.push_str(&format!("saved: {}\n", path.display()));
            }
        }
    }

    if let Some(path) = config.output.as_deref() {
        std::fs::write(path, &output)
            .with_context(|| format!("failed to write output: {}", path))?;
        return Ok(format!("wrote {}", path));
    }
    Ok(output.trim_end().to_string())
}

pub fn format_view(view: &FormView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => view::render_text(view),
        OutputFormat::Json => serde_json::to_string_pretty(view)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .with_context(|| "failed to serialize view"),
        OutputFormat::Html => view::render_html(view),
    }
}

fn format_languages() -> String {
    Language::ALL
        .iter()
        .map(|lang| {
            let default_marker = if *lang == Language::default() {
                " (default)"
            } else {
                ""
            };
            format!(
                "{}\t{}\t{}{}",
                lang.iso_code(),
                lang.as_str(),
                lang.autonym(),
                default_marker
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn language_listing_marks_default() {
        let listing = format_languages();
        assert_eq!(listing.lines().count(), 6);
        assert!(listing.contains("hi\tHindi\tहिन्दी (default)"));
        assert!(listing.contains("kn\tKannada\tಕನ್ನಡ"));
    }

    #[test]
    fn run_without_file_reports_select_file_notice() {
        with_temp_home(|_| {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            let err = runtime.block_on(run(Config::default())).unwrap_err();
            assert_eq!(err.to_string(), "Please select a file before submitting.");
        });
    }

    #[test]
    fn load_app_applies_cli_overrides() {
        with_temp_home(|home| {
            let image = home.join("cat.png");
            std::fs::write(&image, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
                .expect("write image");
            let config = Config {
                file: Some(image.to_string_lossy().into_owned()),
                lang: Some("telugu".to_string()),
                base_url: Some("http://captions.internal:8080".to_string()),
                ..Config::default()
            };
            let app = load_app(&config).expect("app");
            assert_eq!(app.form.language(), Language::Telugu);
            assert_eq!(app.form.file().map(|f| f.mime.as_str()), Some("image/png"));
            assert_eq!(
                app.service.endpoints().upload_url().as_str(),
                "http://captions.internal:8080/api/upload"
            );
        });
    }

    #[test]
    fn base_url_env_overrides_settings_and_cli_overrides_env() {
        with_temp_home(|_| {
            // SAFETY: with_temp_home holds the env lock and restores the variable.
            unsafe { std::env::set_var(settings::BASE_URL_ENV, "http://env-host:9000") };

            let settings = settings::load_settings(None).expect("settings");
            assert_eq!(settings.base_url, "http://env-host:9000");
            let app = load_app(&Config::default()).expect("env app");
            assert_eq!(
                app.service.endpoints().upload_url().as_str(),
                "http://env-host:9000/api/upload"
            );

            let config = Config {
                base_url: Some("http://cli-host:1".to_string()),
                ..Config::default()
            };
            let app = load_app(&config).expect("cli app");
            assert_eq!(
                app.service.endpoints().upload_url().as_str(),
                "http://cli-host:1/api/upload"
            );
        });
        assert_ne!(
            std::env::var(settings::BASE_URL_ENV).ok().as_deref(),
            Some("http://env-host:9000")
        );
    }
}
