//! The four user-level image operations.

use crate::error::{Result, StudioError};
use crate::image::backend::ImageBackend;
use crate::image::encoder;
use crate::image::types::{BatchRequest, EditRequest, ImageFormat, RawImage, ResultImage, BATCH_SIZE};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Instruction sent with background removal.
pub const REMOVE_BACKGROUND_INSTRUCTION: &str =
    "Remove the background of this image completely. Make the new background transparent.";

/// Instruction sent with enhancement.
pub const ENHANCE_INSTRUCTION: &str = "Enhance this image. Increase the sharpness, clarity, and resolution. \
Improve lighting and color balance to make it look professional and high-quality. \
Do not crop or change the composition.";

/// Generate, edit, remove-background and enhance, each returning displayable
/// results.
///
/// Every failure comes back wrapped in the operation's own error variant
/// ([`StudioError::Generation`], [`StudioError::Edit`],
/// [`StudioError::BackgroundRemoval`], [`StudioError::Enhance`]) whose message
/// is fixed and safe to show.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generates four square images from a text prompt.
    async fn generate_from_text(&self, prompt: &str) -> Result<Vec<ResultImage>>;

    /// Produces four edited variants of `source` guided by `prompt`.
    async fn edit_with_prompt(&self, prompt: &str, source: &RawImage) -> Result<Vec<ResultImage>>;

    /// Removes the background of `source`.
    async fn remove_background(&self, source: &RawImage) -> Result<ResultImage>;

    /// Sharpens and relights `source` without changing its composition.
    async fn enhance(&self, source: &RawImage) -> Result<ResultImage>;
}

#[async_trait]
impl<T: ImageService + ?Sized> ImageService for Arc<T> {
    async fn generate_from_text(&self, prompt: &str) -> Result<Vec<ResultImage>> {
        (**self).generate_from_text(prompt).await
    }

    async fn edit_with_prompt(&self, prompt: &str, source: &RawImage) -> Result<Vec<ResultImage>> {
        (**self).edit_with_prompt(prompt, source).await
    }

    async fn remove_background(&self, source: &RawImage) -> Result<ResultImage> {
        (**self).remove_background(source).await
    }

    async fn enhance(&self, source: &RawImage) -> Result<ResultImage> {
        (**self).enhance(source).await
    }
}

/// [`ImageService`] implemented on top of an [`ImageBackend`].
pub struct StudioClient<B> {
    backend: B,
}

impl<B: ImageBackend> StudioClient<B> {
    /// Wraps a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn generate_impl(&self, prompt: &str) -> Result<Vec<ResultImage>> {
        let request = BatchRequest::new(prompt);
        let payloads = self.backend.generate_batch(&request).await?;
        Ok(payloads
            .into_iter()
            .map(|data| ResultImage::embedded(ImageFormat::Jpeg.mime_type(), data))
            .collect())
    }

    async fn edit_impl(&self, prompt: &str, source: &RawImage) -> Result<Vec<ResultImage>> {
        let request = EditRequest::new(encoder::encode(source).await?, prompt);

        // The endpoint yields one image per call, so fan out. The first
        // failure drops the remaining calls and discards finished results.
        let calls = (0..BATCH_SIZE).map(|_| self.backend.edit_single(&request));
        try_join_all(calls).await
    }

    async fn single_impl(&self, source: &RawImage, instruction: &str) -> Result<ResultImage> {
        let request = EditRequest::new(encoder::encode(source).await?, instruction);
        self.backend.edit_single(&request).await
    }
}

/// Logs the underlying failure and hides it behind the operation's message.
fn wrap<T>(
    operation: &'static str,
    result: Result<T>,
    wrapper: fn(Box<StudioError>) -> StudioError,
) -> Result<T> {
    result.map_err(|e| {
        tracing::warn!(operation, error = %e, "image operation failed");
        wrapper(Box::new(e))
    })
}

#[async_trait]
impl<B: ImageBackend> ImageService for StudioClient<B> {
    async fn generate_from_text(&self, prompt: &str) -> Result<Vec<ResultImage>> {
        wrap(
            "generate",
            self.generate_impl(prompt).await,
            StudioError::Generation,
        )
    }

    async fn edit_with_prompt(&self, prompt: &str, source: &RawImage) -> Result<Vec<ResultImage>> {
        wrap("edit", self.edit_impl(prompt, source).await, StudioError::Edit)
    }

    async fn remove_background(&self, source: &RawImage) -> Result<ResultImage> {
        wrap(
            "remove_background",
            self.single_impl(source, REMOVE_BACKGROUND_INSTRUCTION).await,
            StudioError::BackgroundRemoval,
        )
    }

    async fn enhance(&self, source: &RawImage) -> Result<ResultImage> {
        wrap(
            "enhance",
            self.single_impl(source, ENHANCE_INSTRUCTION).await,
            StudioError::Enhance,
        )
    }
}
