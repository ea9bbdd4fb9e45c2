//! Core types for image requests and results.

use crate::error::{Result, StudioError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of images produced by generation and editing.
pub const BATCH_SIZE: usize = 4;

/// Media type assumed for anything we cannot identify.
const OCTET_STREAM: &str = "application/octet-stream";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Common aspect ratios for image generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A locally supplied image, not yet read or encoded.
///
/// The declared media type is carried as given; nothing checks it against
/// the actual content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawImage {
    /// An image file on disk, read lazily by the encoder.
    File {
        /// Location of the file.
        path: PathBuf,
        /// Declared media type.
        mime_type: String,
    },
    /// An image already held in memory.
    Memory {
        /// Image bytes.
        bytes: Arc<[u8]>,
        /// Declared media type.
        mime_type: String,
    },
}

impl RawImage {
    /// Creates a file-backed image, declaring its media type from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or(OCTET_STREAM)
            .to_string();
        Self::File { path, mime_type }
    }

    /// Creates a file-backed image with an explicit media type.
    pub fn file(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates an in-memory image with an explicit media type.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self::Memory {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Returns the declared media type.
    pub fn mime_type(&self) -> &str {
        match self {
            Self::File { mime_type, .. } | Self::Memory { mime_type, .. } => mime_type,
        }
    }

    /// Returns the backing path for file images.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Memory { .. } => None,
        }
    }
}

/// An image in transport form: base64 content plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 (standard alphabet, padded) image content.
    pub data: String,
    /// Declared media type of the source.
    pub mime_type: String,
}

/// A displayable result image, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ResultImage {
    /// An image that lives at a remote URL.
    Remote(String),
    /// A self-contained payload carrying its media type and base64 bytes.
    Embedded {
        /// Media type of the payload.
        mime_type: String,
        /// Base64 image content.
        data: String,
    },
}

impl ResultImage {
    /// Wraps a base64 payload with its media type.
    pub fn embedded(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Embedded {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parses a displayable handle back into a result image.
    ///
    /// `data:<mime>;base64,<data>` becomes an embedded payload; anything
    /// else is taken as a remote URL.
    pub fn parse(handle: &str) -> Self {
        handle
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(mime, data)| Self::embedded(mime, data))
            .unwrap_or_else(|| Self::Remote(handle.to_string()))
    }

    /// Returns the string a renderer can draw directly.
    pub fn display_handle(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Embedded { mime_type, data } => format!("data:{mime_type};base64,{data}"),
        }
    }

    /// Returns the media type, if known.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Remote(_) => None,
            Self::Embedded { mime_type, .. } => Some(mime_type),
        }
    }

    /// Returns the image format implied by the media type.
    pub fn format(&self) -> Option<ImageFormat> {
        self.mime_type().and_then(ImageFormat::from_mime_type)
    }

    /// Decodes an embedded payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Remote(url) => Err(StudioError::Decode(format!(
                "remote image {url} has no inline payload"
            ))),
            Self::Embedded { data, .. } => base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| StudioError::Decode(e.to_string())),
        }
    }

    /// Saves an embedded payload to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }
}

impl std::fmt::Display for ResultImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_handle())
    }
}

impl From<ResultImage> for String {
    fn from(image: ResultImage) -> Self {
        image.display_handle()
    }
}

impl TryFrom<String> for ResultImage {
    type Error = std::convert::Infallible;

    fn try_from(handle: String) -> std::result::Result<Self, Self::Error> {
        Ok(Self::parse(&handle))
    }
}

/// A request to the text-to-image batch endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// The text prompt describing the desired images.
    pub prompt: String,
    /// Number of images to produce.
    pub count: usize,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Output encoding.
    pub format: ImageFormat,
}

impl BatchRequest {
    /// Creates a request for four square JPEG images.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: BATCH_SIZE,
            aspect_ratio: AspectRatio::Square,
            format: ImageFormat::Jpeg,
        }
    }

    /// Sets the number of images.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }
}

/// A request to the single-result image edit endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// The encoded source image.
    pub image: EncodedImage,
    /// What to do with it.
    pub instruction: String,
}

impl EditRequest {
    /// Creates an edit request.
    pub fn new(image: EncodedImage, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
        }
    }
}
