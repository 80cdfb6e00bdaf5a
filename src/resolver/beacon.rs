//! Side-channel beacon
//!
//! A hidden-in-plain-sight `<img>` whose load carries the challenge token
//! back to the service through the browser's own image pipeline.

use wasm_bindgen::JsCast;
use web_sys::HtmlImageElement;

use crate::config::{DEFAULT_BEACON_ID_LENGTH, MIN_BEACON_ID_LENGTH};
use crate::dom;
use crate::error::{Result, VisitorError};

/// Identifies one emitted beacon so it can be removed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconHandle {
    id: String,
}

impl BeaconHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub trait SideChannelBeacon {
    /// Start a request to `url` outside the fetch path.
    fn emit(&self, url: &str) -> Result<BeaconHandle>;

    /// Remove the beacon. Safe to call more than once.
    fn dispose(&self, handle: &BeaconHandle);
}

/// `<img>` appended to `document.body`, addressed by a random element id.
#[derive(Debug, Clone)]
pub struct DomBeacon {
    id_length: usize,
}

impl DomBeacon {
    /// Ids shorter than [`MIN_BEACON_ID_LENGTH`] are raised to it.
    pub fn new(id_length: usize) -> Self {
        Self {
            id_length: id_length.max(MIN_BEACON_ID_LENGTH),
        }
    }

    pub fn id_length(&self) -> usize {
        self.id_length
    }
}

impl Default for DomBeacon {
    fn default() -> Self {
        Self::new(DEFAULT_BEACON_ID_LENGTH)
    }
}

impl SideChannelBeacon for DomBeacon {
    fn emit(&self, url: &str) -> Result<BeaconHandle> {
        let document = dom::document()?;
        let body = dom::body(&document)?;

        let img: HtmlImageElement = document
            .create_element("img")
            .map_err(|e| VisitorError::Beacon(format!("create img: {:?}", e)))?
            .dyn_into()
            .map_err(|_| VisitorError::Beacon("not an image element".into()))?;

        let id = dom::random_element_id(self.id_length);
        img.set_id(&id);
        img.set_src(url);

        body.append_child(&img)
            .map_err(|e| VisitorError::Beacon(format!("appendChild: {:?}", e)))?;

        log::debug!("Beacon {} emitted", id);
        Ok(BeaconHandle::new(id))
    }

    fn dispose(&self, handle: &BeaconHandle) {
        let Ok(document) = dom::document() else {
            return;
        };
        if let Some(element) = document.get_element_by_id(handle.id()) {
            element.remove();
            log::debug!("Beacon {} disposed", handle.id());
        }
    }
}
