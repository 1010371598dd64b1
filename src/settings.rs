use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::languages::Language;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
pub const BASE_URL_ENV: &str = "CAPTION_TRANSLATOR_BASE_URL";

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub upload_path: String,
    pub assets_path: String,
    pub default_language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            upload_path: "/api/upload".to_string(),
            assets_path: "static/uploads".to_string(),
            default_language: Language::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api: Option<ApiSettings>,
    form: Option<FormSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSettings {
    base_url: Option<String>,
    upload_path: Option<String>,
    assets_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FormSettings {
    default_language: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))?)?;
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge(parse_settings(&content, &path)?)?;
        }
    }

    if let Ok(base_url) = std::env::var(BASE_URL_ENV)
        && !base_url.trim().is_empty()
    {
        settings.base_url = base_url.trim().to_string();
    }

    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", path.display()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(api) = incoming.api {
            if let Some(base_url) = api.base_url
                && !base_url.trim().is_empty()
            {
                self.base_url = base_url.trim().to_string();
            }
            if let Some(path) = api.upload_path
                && !path.trim().is_empty()
            {
                self.upload_path = path.trim().to_string();
            }
            if let Some(path) = api.assets_path {
                self.assets_path = path.trim().to_string();
            }
        }
        if let Some(form) = incoming.form
            && let Some(lang) = form.default_language
        {
            self.default_language = lang
                .parse()
                .with_context(|| "invalid [form] default_language")?;
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(&self.base_url, &self.upload_path, &self.assets_path)
    }
}

/// Resolved service locations: the upload endpoint and the asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    upload_path: String,
    assets_path: String,
}

impl Endpoints {
    pub fn new(base_url: &str, upload_path: &str, assets_path: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid base url: {}", base_url.trim()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("base url must be http or https: {}", base));
        }
        if base.cannot_be_a_base() {
            return Err(anyhow!("base url cannot hold a path: {}", base));
        }
        Ok(Self {
            base,
            upload_path: upload_path.to_string(),
            assets_path: assets_path.to_string(),
        })
    }

    pub fn upload_url(&self) -> Url {
        self.join_segments(split_path(&self.upload_path))
    }

    /// URL of a server-assigned asset such as the stored image or narration.
    pub fn asset_url(&self, name: &str) -> Url {
        self.join_segments(split_path(&self.assets_path).chain(std::iter::once(name)))
    }

    fn join_segments<'a>(&self, segments: impl Iterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".caption-translator"))
        }
    })
}
