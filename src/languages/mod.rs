use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target languages the caption service can translate and narrate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    English,
    #[default]
    Hindi,
    Tamil,
    Telugu,
    Marathi,
    Kannada,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
        Language::Marathi,
        Language::Kannada,
    ];

    /// Canonical spelling sent in the `language` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
            Language::Kannada => "Kannada",
        }
    }

    /// ISO 639-1 code, also the narration voice the service picks.
    pub fn iso_code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Marathi => "mr",
            Language::Kannada => "kn",
        }
    }

    pub fn autonym(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "हिन्दी",
            Language::Tamil => "தமிழ்",
            Language::Telugu => "తెలుగు",
            Language::Marathi => "मराठी",
            Language::Kannada => "ಕನ್ನಡ",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = normalize_code(value);
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.as_str().eq_ignore_ascii_case(&normalized) || lang.iso_code() == normalized
            })
            .ok_or_else(|| {
                anyhow!(
                    "unsupported language: {} (expected one of {})",
                    value.trim(),
                    supported_names().join(", ")
                )
            })
    }
}

pub fn supported_names() -> Vec<&'static str> {
    Language::ALL.iter().map(Language::as_str).collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
