use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Extensions the file picker offers. A hint only; other files still upload.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An image the user picked. The blob is shared, so handing it to a
/// dispatch does not copy the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub bytes: Arc<[u8]>,
    pub mime: String,
    pub name: String,
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, name: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let name = name.into();
        let mime = resolve_mime(&bytes, &name);
        Self { bytes, mime, name }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_accepted_extension(&self) -> bool {
        extension_of(&self.name)
            .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

pub fn load_file(path: &Path) -> Result<SelectedFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .map(|value| value.to_string())
        .with_context(|| format!("image path has no file name: {}", path.display()))?;
    Ok(SelectedFile::from_bytes(bytes, name))
}

fn resolve_mime(bytes: &[u8], name: &str) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    match extension_of(name).as_deref() {
        Some("png") => PNG_MIME.to_string(),
        Some("jpg" | "jpeg") => JPEG_MIME.to_string(),
        _ => OCTET_STREAM_MIME.to_string(),
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn sniffs_png_regardless_of_name() {
        let file = SelectedFile::from_bytes(PNG_HEADER.to_vec(), "photo.bin");
        assert_eq!(file.mime, PNG_MIME);
        assert!(!file.has_accepted_extension());
    }

    #[test]
    fn falls_back_to_extension_then_octet_stream() {
        let jpeg = SelectedFile::from_bytes(b"not really".to_vec(), "Cat.JPEG");
        assert_eq!(jpeg.mime, JPEG_MIME);
        assert!(jpeg.has_accepted_extension());

        let other = SelectedFile::from_bytes(b"plain".to_vec(), "notes");
        assert_eq!(other.mime, OCTET_STREAM_MIME);
    }

    #[test]
    fn load_file_keeps_file_name_and_bytes() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("dog.png");
        std::fs::write(&path, PNG_HEADER).expect("write");

        let file = load_file(&path).expect("load");
        assert_eq!(file.name, "dog.png");
        assert_eq!(file.len(), PNG_HEADER.len());
        assert_eq!(file.mime, PNG_MIME);
    }

    #[test]
    fn load_file_reports_missing_path() {
        let dir = tempdir().expect("tempdir");
        let err = load_file(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(err.to_string().contains("failed to read image file"));
    }
}
