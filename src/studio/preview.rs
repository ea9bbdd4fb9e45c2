//! Display handles for loaded source images.
//!
//! A file-backed image gets a `file://` URL a renderer can load directly,
//! tagged with a fragment so every acquisition is distinct. An in-memory
//! image has no such location and gets an opaque `preview://<n>` key, which
//! renders only through [`PreviewStore::resolve`].

use crate::image::RawImage;
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;

const HANDLE_SCHEME: &str = "preview://";

/// Registry of live preview handles.
///
/// A handle stays resolvable until it is released; releasing twice or
/// releasing an unknown handle does nothing.
#[derive(Debug, Default)]
pub struct PreviewStore {
    next_id: u64,
    live: HashMap<String, RawImage>,
}

impl PreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `image` and returns a fresh handle for it.
    pub fn acquire(&mut self, image: RawImage) -> String {
        self.next_id += 1;
        let handle = image
            .path()
            .and_then(|path| file_url(path, self.next_id))
            .unwrap_or_else(|| format!("{HANDLE_SCHEME}{}", self.next_id));
        self.live.insert(handle.clone(), image);
        handle
    }

    /// Frees `handle`. Returns whether it was live.
    pub fn release(&mut self, handle: &str) -> bool {
        self.live.remove(handle).is_some()
    }

    /// Looks up the image behind a live handle.
    pub fn resolve(&self, handle: &str) -> Option<&RawImage> {
        self.live.get(handle)
    }

    /// Number of handles not yet released.
    pub fn live(&self) -> usize {
        self.live.len()
    }
}

/// `None` when the path cannot be made absolute or expressed as a URL.
fn file_url(path: &Path, id: u64) -> Option<String> {
    let absolute = std::path::absolute(path).ok()?;
    let mut url = Url::from_file_path(absolute).ok()?;
    url.set_fragment(Some(&id.to_string()));
    Some(url.into())
}
