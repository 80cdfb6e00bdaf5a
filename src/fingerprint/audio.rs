//! Audio render signature
//!
//! Renders a triangle oscillator through a dynamics compressor on an
//! `OfflineAudioContext` and sums the absolute sample values. The floating
//! point path of the compressor differs per platform and audio stack.
//! Older WebKit only exposes the context as `webkitOfflineAudioContext`.

use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioScheduledSourceNode, OfflineAudioContext, OscillatorType};

use crate::dom;
use crate::error::{Result, VisitorError};

const CHANNELS: u32 = 1;
const FRAMES: u32 = 5000;
const SAMPLE_RATE: f32 = 44100.0;
const OSCILLATOR_HZ: f32 = 1000.0;

const STANDARD_CONTEXT: &str = "OfflineAudioContext";
const WEBKIT_CONTEXT: &str = "webkitOfflineAudioContext";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSignature {
    pub hash: f64,
}

/// Sum of absolute sample values, accumulated in double precision.
pub fn sample_hash(samples: &[f32]) -> f64 {
    samples.iter().map(|s| (*s as f64).abs()).sum()
}

fn js_err(op: &'static str) -> impl Fn(JsValue) -> VisitorError {
    move |e| VisitorError::extractor("audio", format!("{}: {:?}", op, e))
}

/// Global to construct the offline context from; the standard name wins.
pub fn context_constructor(has_standard: bool, has_webkit: bool) -> Option<&'static str> {
    match (has_standard, has_webkit) {
        (true, _) => Some(STANDARD_CONTEXT),
        (false, true) => Some(WEBKIT_CONTEXT),
        (false, false) => None,
    }
}

fn new_context(constructor: &str) -> Result<OfflineAudioContext> {
    if constructor == STANDARD_CONTEXT {
        return OfflineAudioContext::new_with_number_of_channels_and_length_and_sample_rate(
            CHANNELS,
            FRAMES,
            SAMPLE_RATE,
        )
        .map_err(js_err("new OfflineAudioContext"));
    }

    let ctor = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(constructor))
        .map_err(js_err("lookup webkitOfflineAudioContext"))?;
    let args = js_sys::Array::of3(
        &JsValue::from(CHANNELS),
        &JsValue::from(FRAMES),
        &JsValue::from(SAMPLE_RATE),
    );
    let context = js_sys::Reflect::construct(ctor.unchecked_ref::<js_sys::Function>(), &args)
        .map_err(js_err("new webkitOfflineAudioContext"))?;
    Ok(context.unchecked_into())
}

/// `None` when the host has no offline audio context under either name.
pub async fn audio_signature() -> Result<Option<AudioSignature>> {
    let constructor = context_constructor(
        dom::has_global(STANDARD_CONTEXT),
        dom::has_global(WEBKIT_CONTEXT),
    );
    let Some(constructor) = constructor else {
        log::debug!("OfflineAudioContext unavailable, audio signature is null");
        return Ok(None);
    };

    let context = new_context(constructor)?;

    let compressor = context
        .create_dynamics_compressor()
        .map_err(js_err("createDynamicsCompressor"))?;
    compressor.threshold().set_value(-50.0);
    compressor.knee().set_value(40.0);
    compressor.ratio().set_value(12.0);
    compressor.attack().set_value(0.0);
    compressor.release().set_value(0.2);

    let oscillator = context
        .create_oscillator()
        .map_err(js_err("createOscillator"))?;
    oscillator.set_type(OscillatorType::Triangle);
    oscillator.frequency().set_value(OSCILLATOR_HZ);

    oscillator
        .connect_with_audio_node(&compressor)
        .map_err(js_err("connect oscillator"))?;
    compressor
        .connect_with_audio_node(&context.destination())
        .map_err(js_err("connect compressor"))?;

    let source: &AudioScheduledSourceNode = oscillator.as_ref();
    source.start().map_err(js_err("start"))?;

    let rendered = JsFuture::from(context.start_rendering().map_err(js_err("startRendering"))?)
        .await
        .map_err(js_err("rendering"))?;
    let buffer: AudioBuffer = rendered
        .dyn_into()
        .map_err(|_| VisitorError::extractor("audio", "rendering did not yield an AudioBuffer"))?;
    let samples = buffer.get_channel_data(0).map_err(js_err("getChannelData"))?;

    Ok(Some(AudioSignature {
        hash: sample_hash(&samples),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_hash_sums_magnitudes() {
        assert_eq!(sample_hash(&[0.5, -0.25, 0.0, -1.0]), 1.75);
    }

    #[test]
    fn test_context_constructor_fallback() {
        assert_eq!(context_constructor(true, true), Some("OfflineAudioContext"));
        assert_eq!(context_constructor(true, false), Some("OfflineAudioContext"));
        assert_eq!(context_constructor(false, true), Some("webkitOfflineAudioContext"));
        assert_eq!(context_constructor(false, false), None);
    }

    #[test]
    fn test_sample_hash_empty() {
        assert_eq!(sample_hash(&[]), 0.0);
    }

    #[test]
    fn test_sample_hash_is_sign_independent() {
        let a = [0.1f32, -0.2, 0.3];
        let b = [-0.1f32, 0.2, -0.3];
        assert_eq!(sample_hash(&a), sample_hash(&b));
    }
}
