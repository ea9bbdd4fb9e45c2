//! Backend trait for the remote image generation API.

use crate::error::Result;
use crate::image::types::{BatchRequest, EditRequest, ResultImage};
use async_trait::async_trait;

/// The two logical endpoints of a generative image API.
///
/// Implementations perform exactly one remote call per method and never
/// retry; [`StudioClient`](crate::image::StudioClient) builds the user-level
/// operations on top of them.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generates a batch of images from a text prompt.
    ///
    /// Returns one base64 payload per image, in the encoding requested by
    /// `request.format`. An empty batch is an error.
    async fn generate_batch(&self, request: &BatchRequest) -> Result<Vec<String>>;

    /// Produces a single image from a source image and an instruction.
    ///
    /// Fails with [`StudioError::NoImageInResponse`](crate::StudioError::NoImageInResponse)
    /// when the response carries no inline image part.
    async fn edit_single(&self, request: &EditRequest) -> Result<ResultImage>;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str;

    /// Checks if the backend is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
