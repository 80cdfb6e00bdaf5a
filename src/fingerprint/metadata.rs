//! Device / environment metadata
//!
//! Every host capability is read through a method on [`HostCapabilities`]
//! returning `Option<_>`; `None` means the host does not expose it (or threw
//! while being asked). [`DeviceMetadata::from_capabilities`] then applies one
//! fixed default per field:
//!
//! | field                  | host source            | default when `None`  |
//! |------------------------|------------------------|----------------------|
//! | `colorDepth`           | `screen.colorDepth`    | `0`                  |
//! | `colorGamut`           | `(color-gamut: …)`     | `"unknown"`          |
//! | `screenResolution`     | `screen.width/height`  | `"0x0"`              |
//! | `maxTouchPoints`       | `navigator.(ms)MaxTouchPoints` | `0`          |
//! | `touchSupport`         | `createEvent("TouchEvent")` | `false`         |
//! | `hdrMode`              | `(dynamic-range: …)`   | `"unknown"`          |
//! | `timeZone`             | `Intl.DateTimeFormat`  | `"unknown"`          |
//! | `vendor`               | `navigator.vendor`     | `""`                 |
//! | `pdfViewerEnabled`     | `navigator.pdfViewerEnabled` | omitted        |
//! | `deviceMemory`         | `navigator.deviceMemory` | `-1.0`             |
//! | `sessionStorageExists` | `window.sessionStorage`| `true` (access threw)|
//! | `localStorageExists`   | `window.localStorage`  | `true` (access threw)|
//! | `mathValues.*`         | `Math.<fn>(const)`     | `0`                  |
//!
//! A storage getter that throws is a privacy setting blocking an existing
//! store, hence `true`.

use js_sys::{Array, Object, Reflect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::Window;

use crate::dom;
use crate::error::Result;

const UNKNOWN: &str = "unknown";
const NO_DEVICE_MEMORY: f64 = -1.0;

/// Argument for the single-argument `Math` calls with domain (-1, 1).
const SMALL_ARG: f64 = 0.123456789012345;
/// Argument for the calls with domain >= 1.
const LARGE_ARG: f64 = 1.123456789012345;

/// `Math` functions sampled for engine-specific rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Asin,
    Asinh,
    Acos,
    Acosh,
    Atan,
    Atanh,
    Atan2,
    Cos,
    Cosh,
    Sin,
    Sinh,
    Tan,
    Tanh,
}

impl MathOp {
    /// First argument passed to the function. `Atan2` also takes [`LARGE_ARG`].
    pub fn argument(self) -> f64 {
        match self {
            MathOp::Asinh | MathOp::Acosh | MathOp::Cosh | MathOp::Sinh | MathOp::Tanh => {
                LARGE_ARG
            }
            _ => SMALL_ARG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorGamut {
    Rec2020,
    P3,
    Srgb,
}

impl ColorGamut {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorGamut::Rec2020 => "rec2020",
            ColorGamut::P3 => "p3",
            ColorGamut::Srgb => "srgb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicRange {
    High,
    Standard,
}

impl DynamicRange {
    pub fn as_str(self) -> &'static str {
        match self {
            DynamicRange::High => "high",
            DynamicRange::Standard => "standard",
        }
    }
}

/// Optional host capabilities read by the metadata extractor.
pub trait HostCapabilities {
    fn color_depth(&self) -> Option<u32>;
    fn color_gamut(&self) -> Option<ColorGamut>;
    fn screen_size(&self) -> Option<(u32, u32)>;
    fn max_touch_points(&self) -> Option<u32>;
    fn touch_events(&self) -> Option<bool>;
    fn dynamic_range(&self) -> Option<DynamicRange>;
    fn time_zone(&self) -> Option<String>;
    fn vendor(&self) -> Option<String>;
    fn pdf_viewer_enabled(&self) -> Option<bool>;
    fn device_memory(&self) -> Option<f64>;
    /// `Some(present)` when readable, `None` when access threw.
    fn session_storage(&self) -> Option<bool>;
    /// `Some(present)` when readable, `None` when access threw.
    fn local_storage(&self) -> Option<bool>;
    fn math(&self, op: MathOp) -> Option<f64>;
}

/// Results of the host's `Math` functions at fixed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathValues {
    pub asin: f64,
    pub asinh: f64,
    pub acos: f64,
    pub acosh: f64,
    pub atan: f64,
    pub atanh: f64,
    pub atan2: f64,
    pub cos: f64,
    pub cosh: f64,
    pub sin: f64,
    pub sinh: f64,
    pub tan: f64,
    pub tanh: f64,
}

impl MathValues {
    pub fn from_capabilities(caps: &dyn HostCapabilities) -> Self {
        let v = |op| caps.math(op).unwrap_or(0.0);
        Self {
            asin: v(MathOp::Asin),
            asinh: v(MathOp::Asinh),
            acos: v(MathOp::Acos),
            acosh: v(MathOp::Acosh),
            atan: v(MathOp::Atan),
            atanh: v(MathOp::Atanh),
            atan2: v(MathOp::Atan2),
            cos: v(MathOp::Cos),
            cosh: v(MathOp::Cosh),
            sin: v(MathOp::Sin),
            sinh: v(MathOp::Sinh),
            tan: v(MathOp::Tan),
            tanh: v(MathOp::Tanh),
        }
    }
}

/// Environment metadata, serialized in this exact key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetadata {
    pub color_depth: u32,
    pub color_gamut: String,
    pub screen_resolution: String,
    pub max_touch_points: u32,
    pub touch_support: bool,
    pub hdr_mode: String,
    pub time_zone: String,
    pub vendor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_viewer_enabled: Option<bool>,
    pub device_memory: f64,
    pub session_storage_exists: bool,
    pub local_storage_exists: bool,
    pub math_values: MathValues,
}

impl DeviceMetadata {
    /// Read every capability and apply the default policy table.
    pub fn from_capabilities(caps: &dyn HostCapabilities) -> Self {
        let (width, height) = caps.screen_size().unwrap_or((0, 0));
        Self {
            color_depth: caps.color_depth().unwrap_or(0),
            color_gamut: caps
                .color_gamut()
                .map_or(UNKNOWN, ColorGamut::as_str)
                .to_string(),
            screen_resolution: format!("{}x{}", width, height),
            max_touch_points: caps.max_touch_points().unwrap_or(0),
            touch_support: caps.touch_events().unwrap_or(false),
            hdr_mode: caps
                .dynamic_range()
                .map_or(UNKNOWN, DynamicRange::as_str)
                .to_string(),
            time_zone: caps.time_zone().unwrap_or_else(|| UNKNOWN.to_string()),
            vendor: caps.vendor().unwrap_or_default(),
            pdf_viewer_enabled: caps.pdf_viewer_enabled(),
            device_memory: caps.device_memory().unwrap_or(NO_DEVICE_MEMORY),
            session_storage_exists: caps.session_storage().unwrap_or(true),
            local_storage_exists: caps.local_storage().unwrap_or(true),
            math_values: MathValues::from_capabilities(caps),
        }
    }
}

/// Capability reads backed by the live `window`.
pub struct BrowserCapabilities {
    window: Window,
}

impl BrowserCapabilities {
    pub fn new() -> Result<Self> {
        Ok(Self {
            window: dom::window()?,
        })
    }

    fn media_matches(&self, query: &str) -> bool {
        self.window
            .match_media(query)
            .ok()
            .flatten()
            .map(|list| list.matches())
            .unwrap_or(false)
    }

    fn navigator_prop(&self, name: &str) -> Option<JsValue> {
        Reflect::get(&self.window.navigator(), &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    /// Truthy numeric navigator property.
    fn navigator_number(&self, name: &str) -> Option<f64> {
        self.navigator_prop(name)
            .and_then(|v| v.as_f64())
            .filter(|n| *n != 0.0 && !n.is_nan())
    }
}

impl HostCapabilities for BrowserCapabilities {
    fn color_depth(&self) -> Option<u32> {
        let depth = self.window.screen().ok()?.color_depth().ok()?;
        u32::try_from(depth).ok()
    }

    fn color_gamut(&self) -> Option<ColorGamut> {
        [
            ("(color-gamut: rec2020)", ColorGamut::Rec2020),
            ("(color-gamut: p3)", ColorGamut::P3),
            ("(color-gamut: srgb)", ColorGamut::Srgb),
        ]
        .into_iter()
        .find(|(query, _)| self.media_matches(query))
        .map(|(_, gamut)| gamut)
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        let screen = self.window.screen().ok()?;
        let width = u32::try_from(screen.width().ok()?).ok()?;
        let height = u32::try_from(screen.height().ok()?).ok()?;
        Some((width, height))
    }

    fn max_touch_points(&self) -> Option<u32> {
        self.navigator_number("maxTouchPoints")
            .or_else(|| self.navigator_number("msMaxTouchPoints"))
            .map(|n| n as u32)
    }

    fn touch_events(&self) -> Option<bool> {
        let document = self.window.document()?;
        Some(document.create_event("TouchEvent").is_ok())
    }

    fn dynamic_range(&self) -> Option<DynamicRange> {
        if self.media_matches("(dynamic-range: high)") {
            Some(DynamicRange::High)
        } else if self.media_matches("(dynamic-range: standard)") {
            Some(DynamicRange::Standard)
        } else {
            None
        }
    }

    fn time_zone(&self) -> Option<String> {
        let intl = Reflect::get(&js_sys::global(), &JsValue::from_str("Intl")).ok()?;
        if intl.is_undefined() {
            return None;
        }
        let format = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new());
        Reflect::get(&format.resolved_options(), &JsValue::from_str("timeZone"))
            .ok()?
            .as_string()
    }

    fn vendor(&self) -> Option<String> {
        self.navigator_prop("vendor")?.as_string()
    }

    fn pdf_viewer_enabled(&self) -> Option<bool> {
        self.navigator_prop("pdfViewerEnabled")?.as_bool()
    }

    fn device_memory(&self) -> Option<f64> {
        self.navigator_number("deviceMemory")
    }

    fn session_storage(&self) -> Option<bool> {
        self.window.session_storage().ok().map(|s| s.is_some())
    }

    fn local_storage(&self) -> Option<bool> {
        self.window.local_storage().ok().map(|s| s.is_some())
    }

    fn math(&self, op: MathOp) -> Option<f64> {
        use js_sys::Math;
        let x = op.argument();
        Some(match op {
            MathOp::Asin => Math::asin(x),
            MathOp::Asinh => Math::asinh(x),
            MathOp::Acos => Math::acos(x),
            MathOp::Acosh => Math::acosh(x),
            MathOp::Atan => Math::atan(x),
            MathOp::Atanh => Math::atanh(x),
            MathOp::Atan2 => Math::atan2(x, LARGE_ARG),
            MathOp::Cos => Math::cos(x),
            MathOp::Cosh => Math::cosh(x),
            MathOp::Sin => Math::sin(x),
            MathOp::Sinh => Math::sinh(x),
            MathOp::Tan => Math::tan(x),
            MathOp::Tanh => Math::tanh(x),
        })
    }
}

/// Read the metadata record from the live browser.
pub fn collect_metadata() -> Result<DeviceMetadata> {
    let caps = BrowserCapabilities::new()?;
    Ok(DeviceMetadata::from_capabilities(&caps))
}
