//! Fingerprint pipeline
//!
//! Five independent extractors feed one [`FeatureSet`], which is serialized
//! to compact JSON in declaration order and hashed with SHA-256:
//!
//! ```text
//! canvas ─┐
//! webgl  ─┤
//! metadata├─ try_join! ─► FeatureSet ─► canonical JSON ─► SHA-256 ─► FingerprintToken
//! audio  ─┤
//! fonts  ─┘
//! ```
//!
//! Extractors run concurrently; their results are placed by field, never by
//! completion order. The first extractor error aborts the whole build.

pub mod audio;
pub mod canvas;
pub mod digest;
pub mod fonts;
pub mod metadata;
pub mod webgl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use audio::AudioSignature;
pub use digest::{FingerprintToken, TOKEN_LEN};
pub use metadata::{DeviceMetadata, HostCapabilities, MathValues};
pub use webgl::WebGlSignature;

/// Every signal that goes into a fingerprint, in serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    pub canvas_signature: String,
    pub webgl_signature: Option<WebGlSignature>,
    pub metadata: DeviceMetadata,
    pub audio_signature: Option<AudioSignature>,
    pub fonts: Vec<String>,
}

impl FeatureSet {
    pub fn fingerprint(&self) -> Result<FingerprintToken> {
        FingerprintToken::of(self)
    }
}

/// Producer of the five feature signals.
///
/// Each extractor may suspend (e.g. while audio renders) and may fail; a
/// failure aborts the fingerprint.
#[async_trait(?Send)]
pub trait FeatureSource {
    async fn canvas_signature(&self) -> Result<String>;
    async fn webgl_signature(&self) -> Result<Option<WebGlSignature>>;
    async fn metadata(&self) -> Result<DeviceMetadata>;
    async fn audio_signature(&self) -> Result<Option<AudioSignature>>;
    async fn fonts(&self) -> Result<Vec<String>>;
}

/// Joins a [`FeatureSource`] into a [`FeatureSet`] and its token.
pub struct FingerprintBuilder<S> {
    source: S,
}

impl<S: FeatureSource> FingerprintBuilder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run all extractors concurrently and assemble the feature set.
    pub async fn collect(&self) -> Result<FeatureSet> {
        let (canvas_signature, webgl_signature, metadata, audio_signature, fonts) =
            futures::try_join!(
                self.source.canvas_signature(),
                self.source.webgl_signature(),
                self.source.metadata(),
                self.source.audio_signature(),
                self.source.fonts(),
            )?;

        Ok(FeatureSet {
            canvas_signature,
            webgl_signature,
            metadata,
            audio_signature,
            fonts,
        })
    }

    pub async fn build(&self) -> Result<FingerprintToken> {
        let features = self.collect().await?;
        let token = features.fingerprint()?;
        log::debug!(
            "Fingerprint {} ({} fonts, webgl: {}, audio: {})",
            token,
            features.fonts.len(),
            features.webgl_signature.is_some(),
            features.audio_signature.is_some()
        );
        Ok(token)
    }
}

/// Extractors backed by the live browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserFeatureSource;

#[async_trait(?Send)]
impl FeatureSource for BrowserFeatureSource {
    async fn canvas_signature(&self) -> Result<String> {
        canvas::canvas_signature()
    }

    async fn webgl_signature(&self) -> Result<Option<WebGlSignature>> {
        webgl::webgl_signature()
    }

    async fn metadata(&self) -> Result<DeviceMetadata> {
        metadata::collect_metadata()
    }

    async fn audio_signature(&self) -> Result<Option<AudioSignature>> {
        audio::audio_signature().await
    }

    async fn fonts(&self) -> Result<Vec<String>> {
        fonts::detect_installed_fonts()
    }
}

/// Fingerprint of the current browser.
pub async fn build_fingerprint() -> Result<FingerprintToken> {
    FingerprintBuilder::new(BrowserFeatureSource).build().await
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::VisitorError;
    use super::metadata::tests::DesktopHost;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    pub fn sample_features() -> FeatureSet {
        FeatureSet {
            canvas_signature: "data:image/png;base64,iVBORw0KGgo=".into(),
            webgl_signature: Some(WebGlSignature {
                data: "data:image/png;base64,AAAA".into(),
                extensions: vec!["OES_texture_float".into(), "WEBGL_lose_context".into()],
            }),
            metadata: DeviceMetadata::from_capabilities(&DesktopHost),
            audio_signature: Some(AudioSignature { hash: 124.04347527516074 }),
            fonts: vec!["Calibri".into(), "Menlo".into()],
        }
    }

    /// Returns `Pending` a fixed number of times before completing.
    pub struct Yield(pub usize);

    impl Future for Yield {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 == 0 {
                return Poll::Ready(());
            }
            self.0 -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    /// Serves a fixed feature set. `delays` sets how many times each
    /// extractor suspends (canvas, webgl, metadata, audio, fonts).
    pub struct StaticSource {
        pub features: FeatureSet,
        pub delays: [usize; 5],
        pub fail_audio: bool,
    }

    impl StaticSource {
        pub fn new(features: FeatureSet) -> Self {
            Self {
                features,
                delays: [0; 5],
                fail_audio: false,
            }
        }
    }

    #[async_trait(?Send)]
    impl FeatureSource for StaticSource {
        async fn canvas_signature(&self) -> Result<String> {
            Yield(self.delays[0]).await;
            Ok(self.features.canvas_signature.clone())
        }

        async fn webgl_signature(&self) -> Result<Option<WebGlSignature>> {
            Yield(self.delays[1]).await;
            Ok(self.features.webgl_signature.clone())
        }

        async fn metadata(&self) -> Result<DeviceMetadata> {
            Yield(self.delays[2]).await;
            Ok(self.features.metadata.clone())
        }

        async fn audio_signature(&self) -> Result<Option<AudioSignature>> {
            Yield(self.delays[3]).await;
            if self.fail_audio {
                return Err(VisitorError::extractor("audio", "context closed"));
            }
            Ok(self.features.audio_signature.clone())
        }

        async fn fonts(&self) -> Result<Vec<String>> {
            Yield(self.delays[4]).await;
            Ok(self.features.fonts.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::VisitorError;
    use futures::executor::block_on;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let builder = FingerprintBuilder::new(StaticSource::new(sample_features()));
        let first = block_on(builder.build()).unwrap();
        let second = block_on(builder.build()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), TOKEN_LEN);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_completion_order_does_not_matter() {
        let in_order = FingerprintBuilder::new(StaticSource::new(sample_features()));
        let mut reversed = StaticSource::new(sample_features());
        reversed.delays = [8, 6, 4, 2, 0];
        let reversed = FingerprintBuilder::new(reversed);

        let a = block_on(in_order.collect()).unwrap();
        let b = block_on(reversed.collect()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_one_extra_font_changes_fingerprint() {
        let base = sample_features();
        let mut more = sample_features();
        more.fonts.push("Segoe UI Light".into());
        assert_ne!(base.fingerprint().unwrap(), more.fingerprint().unwrap());
    }

    #[test]
    fn test_each_field_feeds_the_digest() {
        let base = sample_features().fingerprint().unwrap();

        let mut f = sample_features();
        f.canvas_signature.push('x');
        assert_ne!(f.fingerprint().unwrap(), base);

        let mut f = sample_features();
        f.webgl_signature = None;
        assert_ne!(f.fingerprint().unwrap(), base);

        let mut f = sample_features();
        f.metadata.time_zone = "America/New_York".into();
        assert_ne!(f.fingerprint().unwrap(), base);

        let mut f = sample_features();
        f.audio_signature = None;
        assert_ne!(f.fingerprint().unwrap(), base);
    }

    #[test]
    fn test_canonical_key_order() {
        let json = digest::canonical_json(&sample_features()).unwrap();
        assert!(json.starts_with(r#"{"canvasSignature":"#));
        let keys = ["canvasSignature", "webglSignature", "metadata", "audioSignature", "fonts"];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{}\":", k)).expect(k))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!json.contains(": ") && !json.contains('\n'));
    }

    #[test]
    fn test_null_signals_serialize_as_null() {
        let mut f = sample_features();
        f.webgl_signature = None;
        f.audio_signature = None;
        let json = digest::canonical_json(&f).unwrap();
        assert!(json.contains(r#""webglSignature":null"#));
        assert!(json.contains(r#""audioSignature":null"#));
    }

    #[test]
    fn test_extractor_failure_propagates() {
        let mut source = StaticSource::new(sample_features());
        source.fail_audio = true;
        let builder = FingerprintBuilder::new(source);
        match block_on(builder.build()) {
            Err(VisitorError::Extractor { extractor, .. }) => assert_eq!(extractor, "audio"),
            other => panic!("expected audio extractor failure, got {:?}", other),
        }
    }
}
