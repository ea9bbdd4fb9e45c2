#![warn(missing_docs)]
//! GenStudio - prompt-driven image generation and editing.
//!
//! This crate turns a text prompt or an uploaded photo into images through a
//! generative image API: text-to-image generation, prompt-guided edits,
//! background removal and enhancement.
//!
//! # Quick Start
//!
//! ```no_run
//! use genstudio::{ActionOutcome, GeminiBackend, RawImage, Session, Studio, StudioClient};
//! use std::sync::Mutex;
//!
//! #[tokio::main]
//! async fn main() -> genstudio::Result<()> {
//!     let client = StudioClient::new(GeminiBackend::builder().build()?);
//!     let studio = Studio::new(client);
//!
//!     let mut session = Session::new();
//!     session.set_prompt("Turn the sky into a sunset");
//!     let session = Mutex::new(session);
//!     studio.upload(&session, RawImage::from_path("photo.jpg"));
//!
//!     let outcome = studio.edit(&session).await;
//!     let session = session.lock().unwrap();
//!     if outcome == ActionOutcome::Completed {
//!         for (i, image) in session.generated().iter().enumerate() {
//!             image.save(format!("edited-{i}.png"))?;
//!         }
//!     } else if let Some(message) = session.error() {
//!         eprintln!("{message}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - [`image::ImageBackend`]: one call per remote endpoint (Gemini/Imagen).
//! - [`image::ImageService`]: the four user-level operations, implemented by
//!   [`StudioClient`].
//! - [`Studio`]: validates, tracks busy flags and errors, and writes results
//!   into a caller-owned [`Session`] shared behind a `Mutex`. The lock is only
//!   taken around state transitions, so the busy flags are readable while a
//!   call is in flight.
//!
//! # Features
//!
//! - `gemini` (default): the Gemini/Imagen backend
//! - `cli`: Command-line interface

mod error;

pub mod image;
pub mod studio;

// Re-export error types at crate root
pub use error::{Precondition, Result, StudioError};

pub use image::{
    AspectRatio, ImageBackend, ImageFormat, ImageService, RawImage, ResultImage, StudioClient,
};
pub use studio::{ActionOutcome, BusyFlags, Operation, Session, SessionView, Studio};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiBackend, GeminiBackendBuilder, GeminiModel, ImagenModel};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StudioError};
    pub use crate::image::{ImageBackend, ImageService, RawImage, ResultImage, StudioClient};
    pub use crate::studio::{ActionOutcome, Operation, Session, Studio};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiBackend;
}
