//! Turns a local image into its transport encoding.

use crate::error::{Result, StudioError};
use crate::image::types::{EncodedImage, RawImage};
use base64::Engine;

/// Reads `image` fully and base64-encodes it, keeping its declared media type.
pub async fn encode(image: &RawImage) -> Result<EncodedImage> {
    let data = match image {
        RawImage::File { path, .. } => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| StudioError::ResourceRead {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), size = bytes.len(), "read image resource");
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
        RawImage::Memory { bytes, .. } => base64::engine::general_purpose::STANDARD.encode(bytes),
    };

    Ok(EncodedImage {
        data,
        mime_type: image.mime_type().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_memory_image() {
        let image = RawImage::from_bytes(b"hello".to_vec(), "image/png");
        let encoded = encode(&image).await.unwrap();
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_encode_file_keeps_declared_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.bin");
        std::fs::write(&path, b"hello").unwrap();

        // Declared type is passed through even though the content is not an image.
        let image = RawImage::file(&path, "image/webp");
        let encoded = encode(&image).await.unwrap();
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/webp");
    }

    #[tokio::test]
    async fn test_encode_missing_file_is_resource_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");

        let err = encode(&RawImage::from_path(&path)).await.unwrap_err();
        match err {
            StudioError::ResourceRead { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
