//! Image encoding, the remote API seam, and the user-level image operations.

mod backend;
mod client;
pub mod encoder;
pub mod providers;
mod types;

pub use backend::ImageBackend;
pub use client::{ImageService, StudioClient, ENHANCE_INSTRUCTION, REMOVE_BACKGROUND_INSTRUCTION};
pub use types::{
    AspectRatio, BatchRequest, EditRequest, EncodedImage, ImageFormat, RawImage, ResultImage,
    BATCH_SIZE,
};
