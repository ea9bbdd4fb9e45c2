//! Image API backends.

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiBackend, GeminiBackendBuilder, GeminiModel, ImagenModel};
