//! Signature verification planning.
//!
//! Inspects an inbound Data's signing metadata and decides whether it can
//! be judged immediately or needs a key fetched through the Face first.
//! The engine executes the plan; the nested fetch goes back through the
//! engine's queue rather than recursing in-stack.

use crate::keystore::KeyStore;
use bytes::Bytes;
use ed25519_dalek::VerifyingKey;
use log::{debug, warn};
use ndn_face_common::metrics::FaceMetrics;
use ndn_face_common::ndn::{Data, KeyLocator, Name, SignatureType};
use ndn_face_common::{Error, Result};

/// What the engine should do with an inbound Data.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Signature verified.
    Good,
    /// Signature failed or cannot be checked; the reason goes to the log.
    Bad(&'static str),
    /// A key named here must be fetched before the Data can be judged.
    NeedKey(Name),
}

/// Parses a raw Ed25519 public key from Data content.
pub(crate) fn parse_key(bytes: &Bytes) -> Result<VerifyingKey> {
    let raw: [u8; 32] = bytes
        .as_ref()
        .try_into()
        .map_err(|_| Error::Packet(format!("public key of {} bytes, expected 32", bytes.len())))?;
    VerifyingKey::from_bytes(&raw).map_err(|e| Error::Packet(format!("invalid public key: {}", e)))
}

/// Decides how to verify `data`, consulting the key cache.
pub(crate) fn check(data: &Data, keys: &KeyStore, metrics: &FaceMetrics) -> Outcome {
    let info = &data.signature_info;

    if info.witness.is_some() {
        return Outcome::Bad("witness verification is not supported");
    }

    if info.signature_type == SignatureType::DigestSha256 {
        return if data.verify_digest() {
            Outcome::Good
        } else {
            Outcome::Bad("integrity digest mismatch")
        };
    }

    match &info.key_locator {
        None => Outcome::Bad("signed data carries no key locator"),
        Some(KeyLocator::KeyName(key_name)) => {
            if key_name.is_prefix_of(&data.name) {
                // Self-referential: the packet carries its own key.
                match parse_key(&data.content) {
                    Ok(key) => verdict(data.verify(&key), "self-certified signature failed"),
                    Err(e) => {
                        debug!("cannot parse embedded key for {}: {}", data.name.to_uri(), e);
                        Outcome::Bad("embedded key unparseable")
                    }
                }
            } else if let Some(entry) = keys.lookup(key_name) {
                metrics.key_cache_hits.increment();
                verdict(data.verify(&entry.key), "signature failed under cached key")
            } else {
                Outcome::NeedKey(key_name.clone())
            }
        }
        Some(KeyLocator::Key(raw)) => match parse_key(raw) {
            Ok(key) => verdict(data.verify(&key), "signature failed under inline key"),
            Err(e) => {
                debug!("cannot parse inline key for {}: {}", data.name.to_uri(), e);
                Outcome::Bad("inline key unparseable")
            }
        },
        Some(KeyLocator::Cert(_)) => {
            warn!(
                "certificate key locator on {} is not supported",
                data.name.to_uri()
            );
            Outcome::Bad("certificate verification is not supported")
        }
    }
}

fn verdict(ok: bool, reason: &'static str) -> Outcome {
    if ok {
        Outcome::Good
    } else {
        Outcome::Bad(reason)
    }
}
