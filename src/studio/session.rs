//! Session state read by the presentation layer.

use crate::image::{RawImage, ResultImage};
use crate::studio::preview::PreviewStore;
use serde::Serialize;

/// The four user-triggered image operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Text-to-image generation.
    Generate,
    /// Prompt-guided editing of the source image.
    Edit,
    /// Background removal on the source image.
    RemoveBackground,
    /// Enhancement of the source image.
    Enhance,
}

impl Operation {
    /// All operations, in display order.
    pub const ALL: [Operation; 4] = [
        Self::Generate,
        Self::Edit,
        Self::RemoveBackground,
        Self::Enhance,
    ];

    /// Returns a stable identifier for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
            Self::RemoveBackground => "remove_background",
            Self::Enhance => "enhance",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight marker per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    /// Generation is running.
    pub generating: bool,
    /// Editing is running.
    pub editing: bool,
    /// Background removal is running.
    pub removing_background: bool,
    /// Enhancement is running.
    pub enhancing: bool,
}

impl BusyFlags {
    /// Returns the flag for `op`.
    pub fn get(&self, op: Operation) -> bool {
        match op {
            Operation::Generate => self.generating,
            Operation::Edit => self.editing,
            Operation::RemoveBackground => self.removing_background,
            Operation::Enhance => self.enhancing,
        }
    }

    pub(crate) fn set(&mut self, op: Operation, busy: bool) {
        let flag = match op {
            Operation::Generate => &mut self.generating,
            Operation::Edit => &mut self.editing,
            Operation::RemoveBackground => &mut self.removing_background,
            Operation::Enhance => &mut self.enhancing,
        };
        *flag = busy;
    }

    /// Returns true if any operation is in flight.
    pub fn any(&self) -> bool {
        Operation::ALL.iter().any(|op| self.get(*op))
    }
}

/// The loaded source image and its preview handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    raw: RawImage,
    display_handle: String,
}

impl SourceImage {
    /// The image as supplied by the user.
    pub fn raw(&self) -> &RawImage {
        &self.raw
    }

    /// Declared media type.
    pub fn mime_type(&self) -> &str {
        self.raw.mime_type()
    }

    /// Handle a renderer can use to show the source.
    pub fn display_handle(&self) -> &str {
        &self.display_handle
    }
}

/// Everything the presentation layer renders from.
///
/// Results, busy flags and the error message are only changed by
/// [`Studio`](crate::studio::Studio) actions.
#[derive(Debug, Default)]
pub struct Session {
    prompt: String,
    source: Option<SourceImage>,
    generated: Vec<ResultImage>,
    background_removed: Option<ResultImage>,
    enhanced: Option<ResultImage>,
    busy: BusyFlags,
    error: Option<String>,
    previews: PreviewStore,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Replaces the prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// The loaded source image, if any.
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// Results of the last generate or edit.
    pub fn generated(&self) -> &[ResultImage] {
        &self.generated
    }

    /// Result of the last background removal.
    pub fn background_removed(&self) -> Option<&ResultImage> {
        self.background_removed.as_ref()
    }

    /// Result of the last enhancement.
    pub fn enhanced(&self) -> Option<&ResultImage> {
        self.enhanced.as_ref()
    }

    /// In-flight markers.
    pub fn busy(&self) -> BusyFlags {
        self.busy
    }

    /// The current error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Preview handles owned by this session.
    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    /// Returns a serializable copy of the renderable state.
    pub fn snapshot(&self) -> SessionView {
        SessionView {
            prompt: self.prompt.clone(),
            source: self.source.as_ref().map(|s| s.display_handle.clone()),
            generated: self.generated.clone(),
            background_removed: self.background_removed.clone(),
            enhanced: self.enhanced.clone(),
            busy: self.busy,
            error: self.error.clone(),
        }
    }

    pub(crate) fn clear_results(&mut self) {
        self.generated = Vec::new();
        self.background_removed = None;
        self.enhanced = None;
        self.error = None;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub(crate) fn set_busy(&mut self, op: Operation, busy: bool) {
        self.busy.set(op, busy);
    }

    pub(crate) fn set_generated(&mut self, images: Vec<ResultImage>) {
        self.generated = images;
    }

    pub(crate) fn set_background_removed(&mut self, image: ResultImage) {
        self.background_removed = Some(image);
    }

    pub(crate) fn set_enhanced(&mut self, image: ResultImage) {
        self.enhanced = Some(image);
    }

    /// Installs `raw` as the source, releasing the previous preview first.
    pub(crate) fn replace_source(&mut self, raw: RawImage) {
        self.release_source();
        let display_handle = self.previews.acquire(raw.clone());
        self.source = Some(SourceImage {
            raw,
            display_handle,
        });
    }

    /// Drops the source and its preview. Returns whether one was loaded.
    pub(crate) fn release_source(&mut self) -> bool {
        match self.source.take() {
            Some(old) => {
                self.previews.release(&old.display_handle);
                true
            }
            None => false,
        }
    }
}

/// Serializable view of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Prompt text.
    pub prompt: String,
    /// Display handle of the source image.
    pub source: Option<String>,
    /// Generate/edit results.
    pub generated: Vec<ResultImage>,
    /// Background removal result.
    pub background_removed: Option<ResultImage>,
    /// Enhancement result.
    pub enhanced: Option<ResultImage>,
    /// In-flight markers.
    pub busy: BusyFlags,
    /// Current error message.
    pub error: Option<String>,
}
