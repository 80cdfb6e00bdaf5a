//! Resolver configuration and stage-limit coercion.
//!
//! Options arrive from page scripts as plain JS objects; every field is
//! optional except `endpoint`.
//!
//! ```javascript
//! await resolve_visitor_id_with({ endpoint: "https://id.example.com", stageLimit: 4 });
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;
use wasm_bindgen::JsValue;

use crate::error::{Result, VisitorError};

/// Stage limit used when the caller passes nothing or a falsy value.
pub const DEFAULT_STAGE_LIMIT: u32 = 10;
/// Result-endpoint polls before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
/// Delay before each result-endpoint poll.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 500;
/// Length of the random beacon element id.
pub const DEFAULT_BEACON_ID_LENGTH: usize = 20;
/// Shorter ids risk colliding with the page's own element ids.
pub const MIN_BEACON_ID_LENGTH: usize = 8;

/// Opaque stage hint forwarded to the resolution service as a decimal string.
///
/// Accepts numbers or strings. Falsy input (`0`, `NaN`, `""`, null,
/// undefined) falls back to [`DEFAULT_STAGE_LIMIT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLimit(String);

impl StageLimit {
    /// Coerce a JS number, string or nullish value.
    pub fn from_js(value: &JsValue) -> Self {
        if value.is_falsy() {
            return Self::default();
        }
        if let Some(n) = value.as_f64() {
            return Self::from_number(n);
        }
        if let Some(s) = value.as_string() {
            return Self::from_text(&s);
        }
        if value.as_bool() == Some(true) {
            return StageLimit("true".to_string());
        }
        log::warn!("Unsupported stage limit {:?}, using default", value);
        Self::default()
    }

    pub fn from_number(n: f64) -> Self {
        if n == 0.0 || n.is_nan() {
            return Self::default();
        }
        StageLimit(format_js_number(n))
    }

    pub fn from_text(s: &str) -> Self {
        if s.is_empty() {
            return Self::default();
        }
        StageLimit(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StageLimit {
    fn default() -> Self {
        StageLimit(DEFAULT_STAGE_LIMIT.to_string())
    }
}

impl From<u32> for StageLimit {
    fn from(n: u32) -> Self {
        Self::from_number(n as f64)
    }
}

impl From<&str> for StageLimit {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

impl fmt::Display for StageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StageLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StageLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Flag(bool),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(n)) => StageLimit::from_number(n),
            Some(Raw::Text(s)) => StageLimit::from_text(&s),
            Some(Raw::Flag(true)) => StageLimit("true".to_string()),
            Some(Raw::Flag(false)) | None => StageLimit::default(),
        })
    }
}

/// Render a number the way `Number.prototype.toString` does: plain
/// decimal for magnitudes in `[1e-6, 1e21)`, exponent form (`1e+21`,
/// `1.5e-7`) outside it.
fn format_js_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    let magnitude = n.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    format!("{}", n)
}

/// Configuration for a resolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Base URL of the resolution service, without a trailing slash.
    pub endpoint: String,
    pub stage_limit: StageLimit,
    pub poll_attempts: u32,
    pub poll_interval_ms: u32,
    pub beacon_id_length: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            stage_limit: StageLimit::default(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            beacon_id_length: DEFAULT_BEACON_ID_LENGTH,
        }
    }
}

impl ResolverConfig {
    /// Config with default protocol timings for the given endpoint.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self {
            endpoint: endpoint.to_string(),
            ..Self::default()
        }
        .validated()
    }

    pub fn with_stage_limit(mut self, stage_limit: StageLimit) -> Self {
        self.stage_limit = stage_limit;
        self
    }

    /// Deserialize page-script options.
    pub fn from_js(options: JsValue) -> Result<Self> {
        let config: ResolverConfig = serde_wasm_bindgen::from_value(options)
            .map_err(|e| VisitorError::Config(e.to_string()))?;
        config.validated()
    }

    /// Check and normalize the endpoint; reject configs that can never resolve.
    pub fn validated(mut self) -> Result<Self> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(VisitorError::Config("endpoint is not provided".into()));
        }
        self.endpoint = endpoint.to_string();
        self.endpoint_url()?;

        if self.poll_attempts == 0 {
            return Err(VisitorError::Config("pollAttempts must be at least 1".into()));
        }
        if self.beacon_id_length < MIN_BEACON_ID_LENGTH {
            return Err(VisitorError::Config(format!(
                "beaconIdLength must be at least {}",
                MIN_BEACON_ID_LENGTH
            )));
        }
        Ok(self)
    }

    /// The endpoint as an absolute http(s) URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| VisitorError::Config(format!("endpoint {}: {}", self.endpoint, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(VisitorError::Config(format!(
                "endpoint must be an http(s) URL, got {}",
                scheme
            ))),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }
}
