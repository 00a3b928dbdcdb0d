//! Configuration for a Face.

use crate::hosts::HostStrategy;
use crate::{DEFAULT_KEY_CACHE_CAPACITY, DEFAULT_NDN_PORT};
use ed25519_dalek::SigningKey;
use ndn_face_common::ndn::DEFAULT_INTEREST_LIFETIME_MS;

/// Options controlling a Face's connection, verification and identity.
pub struct FaceOptions {
    /// Forwarder host to connect to. When unset, the first operation that
    /// needs the network probes `strategy` for a live forwarder.
    pub host: Option<String>,

    /// Forwarder TCP port.
    pub port: u16,

    /// Candidate forwarders to probe when `host` is unset.
    pub strategy: Option<HostStrategy>,

    /// Whether inbound Data is signature-verified before delivery.
    pub verify: bool,

    /// Lifetime given to Interests expressed without a template.
    pub interest_lifetime_ms: u32,

    /// Bound on the verified-key cache.
    pub key_cache_capacity: usize,

    /// Signing identity used for self-registration envelopes. Generated
    /// fresh when unset.
    pub identity: Option<SigningKey>,
}

impl Default for FaceOptions {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_NDN_PORT,
            strategy: None,
            verify: true,
            interest_lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            key_cache_capacity: DEFAULT_KEY_CACHE_CAPACITY,
            identity: None,
        }
    }
}

impl FaceOptions {
    /// Options for a fixed forwarder endpoint.
    pub fn for_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port,
            ..Self::default()
        }
    }

    /// Options probing `candidates` for a live forwarder.
    pub fn with_candidates(candidates: Vec<(String, u16)>) -> Self {
        Self {
            strategy: Some(HostStrategy::new(candidates)),
            ..Self::default()
        }
    }

    /// Disables signature verification.
    pub fn without_verify(mut self) -> Self {
        self.verify = false;
        self
    }
}
