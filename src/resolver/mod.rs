//! Visitor-ID resolution protocol
//!
//! ```text
//! Init ─► Requesting ──2xx, 36 chars──────────────────────────► Resolved
//!             │  └─non-2xx / no response──────────────────────► Failed
//!             └─2xx, other body (challenge)
//!                   ▼
//!               PollSetup (emit beacon) ──emit fails──────────► Failed
//!                   ▼
//!               Polling ×N: sleep, GET /result/<challenge>
//!                   ├─2xx, 36 chars ─► dispose beacon ─────────► Resolved
//!                   └─exhausted ─────► dispose beacon ─────────► Expired
//! ```
//!
//! The client is generic over [`Transport`], [`SideChannelBeacon`] and
//! [`Sleeper`] so the state machine runs identically against the browser
//! and against in-memory doubles.

pub mod beacon;
pub mod timer;
pub mod transport;

use url::Url;

use crate::config::{ResolverConfig, StageLimit};
use crate::error::{Result, VisitorError};
use crate::fingerprint::{FeatureSource, FingerprintBuilder, FingerprintToken};

pub use beacon::{BeaconHandle, DomBeacon, SideChannelBeacon};
pub use timer::{BrowserSleeper, Sleeper};
pub use transport::{FetchTransport, HttpReply, Transport};

/// Length of a terminal visitor id, in UTF-16 code units.
pub const VISITOR_ID_LEN: usize = 36;

/// Whether a response body is a terminal visitor id rather than a challenge.
pub fn is_visitor_id(body: &str) -> bool {
    body.encode_utf16().count() == VISITOR_ID_LEN
}

/// Query for the resolution endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub fingerprint: FingerprintToken,
    pub stage_limit: StageLimit,
    /// Set only on the beacon request.
    pub token: Option<String>,
}

impl ResolutionRequest {
    pub fn new(fingerprint: FingerprintToken, stage_limit: StageLimit) -> Self {
        Self {
            fingerprint,
            stage_limit,
            token: None,
        }
    }

    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    /// `{endpoint}/?fingerprint=..&stage_limit=..[&token=..]`
    pub fn url(&self, endpoint: &Url) -> String {
        let mut url = endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("");
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .clear()
                .append_pair("fingerprint", self.fingerprint.as_str())
                .append_pair("stage_limit", self.stage_limit.as_str());
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
        }
        url.into()
    }
}

/// `{endpoint}/result/<challenge>`
pub fn result_url(endpoint: &Url, challenge: &str) -> String {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("result").push(challenge);
    }
    url.set_query(None);
    url.into()
}

/// Classification of the initial resolution response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(String),
    Pending(String),
    Failed,
}

impl ResolutionOutcome {
    pub fn classify(reply: Result<HttpReply>) -> Self {
        match reply {
            Ok(reply) if !reply.is_success() => ResolutionOutcome::Failed,
            Ok(reply) if is_visitor_id(&reply.body) => ResolutionOutcome::Resolved(reply.body),
            Ok(reply) => ResolutionOutcome::Pending(reply.body),
            Err(_) => ResolutionOutcome::Failed,
        }
    }
}

/// Terminal state of one resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `polls` is zero when the initial response already carried the id.
    Resolved { visitor_id: String, polls: u32 },
    Expired { polls: u32 },
    Failed,
}

impl Resolution {
    pub fn visitor_id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { visitor_id, .. } => Some(visitor_id),
            _ => None,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            Resolution::Resolved { polls, .. } | Resolution::Expired { polls } => *polls,
            Resolution::Failed => 0,
        }
    }

    /// The page-facing contract: the id, or `""` on failure and expiry.
    pub fn into_visitor_id(self) -> String {
        match self {
            Resolution::Resolved { visitor_id, .. } => visitor_id,
            _ => String::new(),
        }
    }
}

/// Drives one fingerprint through the resolution protocol.
pub struct ResolutionClient<T, B, Z> {
    config: ResolverConfig,
    transport: T,
    beacon: B,
    sleeper: Z,
}

impl ResolutionClient<FetchTransport, DomBeacon, BrowserSleeper> {
    /// Client wired to `fetch`, an `<img>` beacon and `setTimeout`.
    pub fn browser(config: ResolverConfig) -> Self {
        let beacon = DomBeacon::new(config.beacon_id_length);
        Self::new(config, FetchTransport, beacon, BrowserSleeper)
    }
}

impl<T: Transport, B: SideChannelBeacon, Z: Sleeper> ResolutionClient<T, B, Z> {
    pub fn new(config: ResolverConfig, transport: T, beacon: B, sleeper: Z) -> Self {
        Self {
            config,
            transport,
            beacon,
            sleeper,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Build the fingerprint, then resolve it. Extractor failures are
    /// errors; protocol failures resolve to `""`.
    pub async fn resolve_visitor_id<S: FeatureSource>(
        &self,
        builder: &FingerprintBuilder<S>,
    ) -> Result<String> {
        let fingerprint = builder.build().await?;
        Ok(self.resolve(&fingerprint).await.into_visitor_id())
    }

    pub async fn resolve(&self, fingerprint: &FingerprintToken) -> Resolution {
        let endpoint = match self.config.endpoint_url() {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Cannot resolve: {}", e);
                return Resolution::Failed;
            }
        };
        let request = ResolutionRequest::new(fingerprint.clone(), self.config.stage_limit.clone());

        log::debug!("Requesting visitor id for {}", fingerprint);
        let reply = self.transport.get(&request.url(&endpoint)).await;
        match &reply {
            Err(e) => log::warn!("Resolution request failed: {}", e),
            Ok(r) if !r.is_success() => {
                log::warn!("Resolution request failed: {}", VisitorError::HttpStatus(r.status))
            }
            Ok(_) => {}
        }

        let challenge = match ResolutionOutcome::classify(reply) {
            ResolutionOutcome::Resolved(visitor_id) => {
                log::info!("Visitor id resolved without challenge");
                return Resolution::Resolved {
                    visitor_id,
                    polls: 0,
                };
            }
            ResolutionOutcome::Failed => return Resolution::Failed,
            ResolutionOutcome::Pending(challenge) => challenge,
        };

        let handle = match self.beacon.emit(&request.with_token(&challenge).url(&endpoint)) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Could not emit beacon, giving up: {}", e);
                return Resolution::Failed;
            }
        };
        log::debug!("Challenge received, polling up to {} times", self.config.poll_attempts);

        let resolution = self.poll(&endpoint, &challenge).await;
        self.beacon.dispose(&handle);

        match &resolution {
            Resolution::Resolved { polls, .. } => {
                log::info!("Visitor id resolved after {} polls", polls)
            }
            Resolution::Expired { polls } => {
                log::info!("Challenge expired after {} polls", polls)
            }
            Resolution::Failed => {}
        }
        resolution
    }

    async fn poll(&self, endpoint: &Url, challenge: &str) -> Resolution {
        let url = result_url(endpoint, challenge);
        let attempts = self.config.poll_attempts;

        for attempt in 1..=attempts {
            self.sleeper.sleep(self.config.poll_interval()).await;
            match self.transport.get(&url).await {
                Ok(reply) if reply.is_success() && is_visitor_id(&reply.body) => {
                    return Resolution::Resolved {
                        visitor_id: reply.body,
                        polls: attempt,
                    };
                }
                Ok(reply) => {
                    log::debug!("Poll {}/{}: HTTP {}, not ready", attempt, attempts, reply.status)
                }
                Err(e) => log::debug!("Poll {}/{} failed: {}", attempt, attempts, e),
            }
        }

        Resolution::Expired { polls: attempts }
    }
}
