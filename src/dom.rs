//! Window / document accessors shared by extractors and the beacon.

use rand::distributions::Alphanumeric;
use rand::Rng;
use web_sys::{Document, HtmlElement, Window};

use crate::error::{Result, VisitorError};

/// Get the global window object.
pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| VisitorError::HostUnavailable("no window".into()))
}

/// Get the window's document.
pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| VisitorError::HostUnavailable("no document".into()))
}

/// Get `document.body`.
pub fn body(document: &Document) -> Result<HtmlElement> {
    document
        .body()
        .ok_or_else(|| VisitorError::HostUnavailable("document has no body".into()))
}

/// Random `[A-Za-z0-9]` string, used for element ids.
pub fn random_element_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Whether a global constructor (e.g. `OfflineAudioContext`) exists.
pub fn has_global(name: &str) -> bool {
    js_sys::Reflect::get(&js_sys::global(), &wasm_bindgen::JsValue::from_str(name))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_element_id_shape() {
        let id = random_element_id(20);
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_element_ids_differ() {
        assert_ne!(random_element_id(20), random_element_id(20));
    }
}
