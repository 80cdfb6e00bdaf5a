//! # Cookieless WASM
//!
//! Cookieless visitor identification compiled to WebAssembly.
//!
//! A browser fingerprint is derived from rendering and host signals, then
//! exchanged with a resolution service for a stable 36-character visitor id.
//! When the service cannot decide from the fingerprint alone it hands back a
//! challenge; the client fires a side-channel `<img>` request carrying that
//! challenge and polls until the service has correlated the two.
//!
//! ## Architecture
//!
//! ```text
//! Feature extractors (canvas, webgl, metadata, audio, fonts)
//!   ↓
//! FingerprintBuilder ─► SHA-256 token
//!   ↓
//! ResolutionClient (fetch + <img> beacon + polling)
//!   ↓
//! visitor id | ""
//! ```
//!
//! ## Usage from JavaScript
//!
//! ```js
//! import init, { resolve_visitor_id } from "cookieless-wasm";
//! await init();
//! const id = await resolve_visitor_id("https://id.example.com", 10);
//! ```

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod dom;
mod error;
pub mod fingerprint;
pub mod resolver;

pub use config::{ResolverConfig, StageLimit};
pub use error::{ErrorCode, ErrorInfo, Result, VisitorError};
pub use fingerprint::{
    build_fingerprint, BrowserFeatureSource, FeatureSet, FeatureSource, FingerprintBuilder,
    FingerprintToken,
};
pub use resolver::{
    is_visitor_id, Resolution, ResolutionClient, ResolutionOutcome, ResolutionRequest,
};

#[wasm_bindgen(start)]
pub fn init() {
    // A second init (e.g. module re-instantiated) keeps the existing logger.
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("Cookieless visitor client initialized");
}

/// Rejection value handed to page scripts: an [`ErrorInfo`] object, or
/// the plain message if that cannot be built.
fn into_js_error(err: VisitorError) -> JsValue {
    let info = ErrorInfo::from(&err);
    log::error!("[{}] {}", info.code, info.message);
    serde_wasm_bindgen::to_value(&info).unwrap_or_else(|_| err.into())
}

async fn run(config: ResolverConfig) -> Result<String> {
    let builder = FingerprintBuilder::new(BrowserFeatureSource);
    ResolutionClient::browser(config)
        .resolve_visitor_id(&builder)
        .await
}

/// Resolve the visitor id for this browser.
///
/// `stage_limit` may be a number, a numeric string, or omitted (defaults
/// to 10). Resolves to `""` when the service fails or the challenge
/// expires; rejects when the fingerprint cannot be computed.
#[wasm_bindgen]
pub async fn resolve_visitor_id(
    endpoint: String,
    stage_limit: JsValue,
) -> std::result::Result<String, JsValue> {
    let config = ResolverConfig::new(&endpoint)
        .map_err(into_js_error)?
        .with_stage_limit(StageLimit::from_js(&stage_limit));
    run(config).await.map_err(into_js_error)
}

/// Same as [`resolve_visitor_id`] with a full options object:
/// `{ endpoint, stageLimit, pollAttempts, pollIntervalMs, beaconIdLength }`.
#[wasm_bindgen]
pub async fn resolve_visitor_id_with(options: JsValue) -> std::result::Result<String, JsValue> {
    let config = ResolverConfig::from_js(options).map_err(into_js_error)?;
    run(config).await.map_err(into_js_error)
}

/// The 64-character fingerprint token for this browser.
#[wasm_bindgen]
pub async fn generate_fingerprint() -> std::result::Result<String, JsValue> {
    let token = build_fingerprint().await.map_err(into_js_error)?;
    Ok(token.to_string())
}

/// The raw feature set behind the fingerprint, as a plain JS object.
#[wasm_bindgen]
pub async fn collect_features() -> std::result::Result<JsValue, JsValue> {
    let features = FingerprintBuilder::new(BrowserFeatureSource)
        .collect()
        .await
        .map_err(into_js_error)?;
    features
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| into_js_error(VisitorError::Serialization(e.to_string())))
}
