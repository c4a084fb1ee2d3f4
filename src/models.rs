use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Largest upload accepted before any network interaction (4 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Suggested file name for the downloadable result.
pub const RESULT_FILE_NAME: &str = "edited-image.png";

/// Image media types accepted by the upload surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    WebP,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Guess the media type the way a file picker does, from the extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A file picked by the user, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// Declared MIME type; empty when the extension is unknown.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Identity of an accepted upload. Responses computed for one selection are
/// discarded once another selection replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionId(Uuid);

impl SelectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for display.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SelectionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSelection {
    pub id: SelectionId,
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Arc<[u8]>,
}

impl ImageSelection {
    pub fn new(name: String, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            id: SelectionId::new(),
            name,
            media_type,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Image bytes in their transportable (base64) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: MediaType,
}

impl EncodedImage {
    pub fn encode(bytes: &[u8], media_type: MediaType) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type,
        }
    }
}

/// The edited image returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub base64: String,
    pub created_at: DateTime<Local>,
}

impl GeneratedImage {
    pub fn new(base64: String) -> Self {
        Self {
            base64,
            created_at: Local::now(),
        }
    }

    /// Displayable resource for the result.
    pub fn data_url(&self) -> String {
        format!("{DATA_URL_PREFIX}{}", self.base64)
    }

    /// Head of the data URL, with an ellipsis when cut.
    pub fn data_url_preview(&self, max_chars: usize) -> String {
        let encoded = self.base64.trim();
        match encoded.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{DATA_URL_PREFIX}{}...", &encoded[..cut]),
            None => self.data_url(),
        }
    }

    /// Decoded payload size, computed from the base64 length.
    pub fn byte_len(&self) -> usize {
        let encoded = self.base64.trim();
        let padding = encoded.bytes().rev().take_while(|&b| b == b'=').count();
        (encoded.len() / 4 * 3).saturating_sub(padding)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.base64.trim())
            .context("Generated image is not valid base64")
    }

    /// Write the result as `edited-image.png` inside `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let bytes = self.decode()?;
        fs::create_dir_all(dir).context("Failed to create download directory")?;
        let path = dir.join(RESULT_FILE_NAME);
        fs::write(&path, bytes).context("Failed to write edited image")?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub edit_model: String,
    pub tag_model: String,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

const fn default_timeout() -> u64 {
    120
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            edit_model: "gemini-2.5-flash-image".to_string(),
            tag_model: "gemini-2.5-flash".to_string(),
            request_timeout: default_timeout(),
            download_dir: None,
            log_filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_mime("IMAGE/JPEG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("image/webp"), Some(MediaType::WebP));
        assert_eq!(MediaType::from_mime("image/gif"), None);
        assert_eq!(MediaType::from_mime(""), None);
    }

    #[test]
    fn test_media_type_from_path() {
        assert_eq!(
            MediaType::from_path(Path::new("shoe.PNG")),
            Some(MediaType::Png)
        );
        assert_eq!(
            MediaType::from_path(Path::new("/tmp/a.jpeg")),
            Some(MediaType::Jpeg)
        );
        assert_eq!(
            MediaType::from_path(Path::new("a.webp")),
            Some(MediaType::WebP)
        );
        assert_eq!(MediaType::from_path(Path::new("a.tiff")), None);
        assert_eq!(MediaType::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_selection_ids_are_unique() {
        let a = ImageSelection::new("a.png".into(), MediaType::Png, vec![1]);
        let b = ImageSelection::new("a.png".into(), MediaType::Png, vec![1]);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.short().len(), 8);
    }

    #[test]
    fn test_encoded_image() {
        let encoded = EncodedImage::encode(b"hello", MediaType::Jpeg);
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.media_type.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_generated_image_data_url() {
        let image = GeneratedImage::new("QUJD".to_string());
        assert_eq!(image.data_url(), "data:image/png;base64,QUJD");
        assert_eq!(image.decode().unwrap(), b"ABC");
        assert_eq!(image.byte_len(), 3);
        assert_eq!(GeneratedImage::new("QUI=".to_string()).byte_len(), 2);
    }

    #[test]
    fn test_generated_image_preview() {
        let image = GeneratedImage::new("QUJDREVG".to_string());
        assert_eq!(image.data_url_preview(20), "data:image/png;base64,QUJDREVG");
        assert_eq!(image.data_url_preview(4), "data:image/png;base64,QUJD...");
        assert_eq!(image.data_url_preview(8), "data:image/png;base64,QUJDREVG");
    }

    #[test]
    fn test_generated_image_preview_cuts_on_char_boundary() {
        let image = GeneratedImage::new("QUJ\u{e9}REVG".to_string());
        assert_eq!(image.data_url_preview(4), "data:image/png;base64,QUJ\u{e9}...");
        assert_eq!(image.data_url_preview(3), "data:image/png;base64,QUJ...");
    }

    #[test]
    fn test_generated_image_save_to() {
        let temp_dir = TempDir::new().unwrap();
        let image = GeneratedImage::new("QUJD".to_string());

        let path = image.save_to(temp_dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), RESULT_FILE_NAME);
        assert_eq!(fs::read(path).unwrap(), b"ABC");
    }

    #[test]
    fn test_generated_image_rejects_bad_base64() {
        let image = GeneratedImage::new("not base64!!".to_string());
        assert!(image.decode().is_err());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.edit_model, "gemini-2.5-flash-image");
        assert_eq!(config.request_timeout, 120);
        assert_eq!(config.download_dir(), PathBuf::from("."));
    }
}
