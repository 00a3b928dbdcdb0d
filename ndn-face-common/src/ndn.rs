//! NDN packet types and structures.
//!
//! This module provides the data model the Face operates on: names,
//! Interests with their selectors, Data with signing metadata, and the
//! ForwardingEntry used for forwarder self-registration.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum number of components in an NDN name.
pub const MAX_NAME_COMPONENTS: usize = 32;

/// Maximum size of an NDN packet element.
pub const MAX_PACKET_SIZE: usize = 8800;

/// Default Interest lifetime in milliseconds.
pub const DEFAULT_INTEREST_LIFETIME_MS: u32 = 4000;

/// Content type for generic payload bytes.
pub const CONTENT_TYPE_BLOB: u32 = 0;

/// Content type for Data carrying a public key.
pub const CONTENT_TYPE_KEY: u32 = 2;

/// Represents an NDN name component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    /// Creates a new name component from a byte slice.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the component as bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Encodes this name component as a TLV element.
    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(tlv::TLV_COMPONENT, self.0.clone())
    }

    /// Decodes a name component from a TLV element.
    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_COMPONENT {
            return Err(Error::Packet(format!(
                "expected name component TLV type {}, got {}",
                tlv::TLV_COMPONENT,
                element.tlv_type
            )));
        }
        Ok(Self(element.value.clone()))
    }

    /// Renders the component with URI percent-escaping.
    pub fn to_uri(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for &b in self.0.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{:02X}", b));
            }
        }
        out
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

/// Represents an NDN name, a sequence of opaque byte components.
///
/// Names are value types: once constructed they are only read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Creates a new empty NDN name.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parses a name from its URI representation with '/' as component
    /// separator. `%XX` escapes decode to raw bytes, so binary components
    /// such as `%C1.M.S.localhost` round-trip.
    pub fn from_uri(s: &str) -> Result<Self, Error> {
        let mut components = Vec::new();
        for part in s.split('/').filter(|p| !p.is_empty()) {
            components.push(NameComponent::new(percent_decode(part)?));
        }
        if components.len() > MAX_NAME_COMPONENTS {
            return Err(Error::Packet(format!(
                "name has {} components, limit is {}",
                components.len(),
                MAX_NAME_COMPONENTS
            )));
        }
        Ok(Self { components })
    }

    /// Adds a component to the name.
    pub fn append(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Builder-style [`append`](Self::append).
    pub fn appended(mut self, component: NameComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Returns the number of components in the name.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns an iterator over the name components.
    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    /// Gets a component at the specified index.
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Returns a prefix of this name with the specified length.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Checks if this name is a prefix of (or equal to) another name.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }

        for (i, component) in self.components.iter().enumerate() {
            if component != &other.components[i] {
                return false;
            }
        }

        true
    }

    /// True iff this name is a prefix of or equal to `other`.
    pub fn matches(&self, other: &Self) -> bool {
        self.is_prefix_of(other)
    }

    /// Renders the name as a URI string.
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for component in &self.components {
            out.push('/');
            out.push_str(&component.to_uri());
        }
        out
    }

    /// Encodes this name as a TLV element.
    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    /// Decodes a name from a TLV element.
    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::Packet(format!(
                "expected name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut buf = element.value.clone();

        while buf.has_remaining() {
            let element = TlvElement::decode(&mut buf)?;
            components.push(NameComponent::from_tlv(&element)?);
        }

        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

fn percent_decode(part: &str) -> Result<Vec<u8>, Error> {
    let raw = part.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            if i + 3 > raw.len() {
                return Err(Error::Packet(format!("truncated percent escape in '{}'", part)));
            }
            let hex = std::str::from_utf8(&raw[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::Packet(format!("invalid percent escape in '{}'", part)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Exclusion set for an Interest: components that must not appear as the
/// first suffix component of a matching Data name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Exclude(pub Vec<NameComponent>);

impl Exclude {
    pub fn contains(&self, component: &NameComponent) -> bool {
        self.0.iter().any(|c| c == component)
    }
}

/// Optional Interest selectors constraining which Data matches.
///
/// `child_selector`, `answer_origin_kind` and `scope` are forwarder hints
/// and do not constrain local matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selectors {
    pub min_suffix_components: Option<u32>,
    pub max_suffix_components: Option<u32>,
    pub publisher_public_key_digest: Option<Bytes>,
    pub exclude: Option<Exclude>,
    pub child_selector: Option<u32>,
    pub answer_origin_kind: Option<u32>,
    pub scope: Option<u32>,
}

impl Selectors {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        if let Some(v) = self.min_suffix_components {
            tlv::encode_nonneg_element(tlv::TLV_MIN_SUFFIX_COMPONENTS, v as u64, &mut buf);
        }
        if let Some(v) = self.max_suffix_components {
            tlv::encode_nonneg_element(tlv::TLV_MAX_SUFFIX_COMPONENTS, v as u64, &mut buf);
        }
        if let Some(digest) = &self.publisher_public_key_digest {
            TlvElement::new(tlv::TLV_PUBLISHER_KEY_DIGEST, digest.clone()).encode(&mut buf);
        }
        if let Some(exclude) = &self.exclude {
            let mut inner = BytesMut::new();
            for component in &exclude.0 {
                component.to_tlv().encode(&mut inner);
            }
            TlvElement::new(tlv::TLV_EXCLUDE, inner.freeze()).encode(&mut buf);
        }
        if let Some(v) = self.child_selector {
            tlv::encode_nonneg_element(tlv::TLV_CHILD_SELECTOR, v as u64, &mut buf);
        }
        if let Some(v) = self.answer_origin_kind {
            tlv::encode_nonneg_element(tlv::TLV_ANSWER_ORIGIN_KIND, v as u64, &mut buf);
        }
        if let Some(v) = self.scope {
            tlv::encode_nonneg_element(tlv::TLV_SCOPE, v as u64, &mut buf);
        }
        TlvElement::new(tlv::TLV_SELECTORS, buf.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut selectors = Self::default();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let child = TlvElement::decode(&mut buf)?;
            match child.tlv_type {
                tlv::TLV_MIN_SUFFIX_COMPONENTS => {
                    selectors.min_suffix_components = Some(child.as_nonneg()? as u32);
                }
                tlv::TLV_MAX_SUFFIX_COMPONENTS => {
                    selectors.max_suffix_components = Some(child.as_nonneg()? as u32);
                }
                tlv::TLV_PUBLISHER_KEY_DIGEST => {
                    selectors.publisher_public_key_digest = Some(child.value.clone());
                }
                tlv::TLV_EXCLUDE => {
                    let mut components = Vec::new();
                    let mut inner = child.value.clone();
                    while inner.has_remaining() {
                        let c = TlvElement::decode(&mut inner)?;
                        components.push(NameComponent::from_tlv(&c)?);
                    }
                    selectors.exclude = Some(Exclude(components));
                }
                tlv::TLV_CHILD_SELECTOR => {
                    selectors.child_selector = Some(child.as_nonneg()? as u32);
                }
                tlv::TLV_ANSWER_ORIGIN_KIND => {
                    selectors.answer_origin_kind = Some(child.as_nonneg()? as u32);
                }
                tlv::TLV_SCOPE => {
                    selectors.scope = Some(child.as_nonneg()? as u32);
                }
                _ => {}
            }
        }
        Ok(selectors)
    }
}

/// Represents an NDN Interest packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    /// The name requested in the Interest.
    pub name: Name,

    /// Optional selectors constraining which Data matches.
    pub selectors: Option<Selectors>,

    /// A nonce value to prevent looping.
    pub nonce: u32,

    /// Interest lifetime in milliseconds.
    pub lifetime_ms: u32,
}

impl Interest {
    /// Creates a new Interest packet with a fresh nonce and the default
    /// lifetime.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            selectors: None,
            nonce: rand::random(),
            lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
        }
    }

    /// Creates an Interest for `name`, copying selectors and lifetime from
    /// `template` when one is given.
    pub fn from_template(name: Name, template: Option<&Interest>) -> Self {
        match template {
            Some(t) => Self {
                name,
                selectors: t.selectors.clone(),
                nonce: rand::random(),
                lifetime_ms: t.lifetime_ms,
            },
            None => Self::new(name),
        }
    }

    /// Sets the Interest lifetime.
    pub fn with_lifetime(mut self, lifetime_ms: u32) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }

    /// Sets the nonce value.
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the selectors.
    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = Some(selectors);
        self
    }

    /// Sets the scope selector.
    pub fn with_scope(mut self, scope: u32) -> Self {
        self.selectors.get_or_insert_with(Selectors::default).scope = Some(scope);
        self
    }

    /// True iff this Interest's name is a prefix of `name` and the locally
    /// checkable selectors are satisfied.
    pub fn matches_name(&self, name: &Name) -> bool {
        if !self.name.is_prefix_of(name) {
            return false;
        }
        let suffix = (name.len() - self.name.len()) as u32;
        if let Some(selectors) = &self.selectors {
            if let Some(min) = selectors.min_suffix_components {
                if suffix < min {
                    return false;
                }
            }
            if let Some(max) = selectors.max_suffix_components {
                if suffix > max {
                    return false;
                }
            }
            if let Some(exclude) = &selectors.exclude {
                if let Some(next) = name.get(self.name.len()) {
                    if exclude.contains(next) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// [`matches_name`](Self::matches_name) plus the publisher-digest
    /// selector checked against the Data's signing metadata.
    pub fn matches_data(&self, data: &Data) -> bool {
        if !self.matches_name(&data.name) {
            return false;
        }
        if let Some(want) = self
            .selectors
            .as_ref()
            .and_then(|s| s.publisher_public_key_digest.as_ref())
        {
            match &data.signature_info.publisher_public_key_digest {
                Some(have) => want == have,
                None => false,
            }
        } else {
            true
        }
    }

    /// Encode this Interest as a complete wire element.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        self.name.to_tlv().encode(&mut inner);
        if let Some(selectors) = &self.selectors {
            if !selectors.is_default() {
                selectors.to_tlv().encode(&mut inner);
            }
        }
        tlv::encode_nonneg_element(tlv::TLV_NONCE, self.nonce as u64, &mut inner);
        tlv::encode_nonneg_element(tlv::TLV_INTEREST_LIFETIME, self.lifetime_ms as u64, &mut inner);
        TlvElement::new(tlv::TLV_INTEREST, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Encode this Interest into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode an Interest from a complete wire element.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let outer = TlvElement::decode(buf)?;
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::Packet(format!(
                "expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }

        let mut name = None;
        let mut selectors = None;
        let mut nonce = 0u32;
        let mut lifetime_ms = DEFAULT_INTEREST_LIFETIME_MS;

        let mut inner = outer.value.clone();
        while inner.has_remaining() {
            let child = TlvElement::decode(&mut inner)?;
            match child.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&child)?),
                tlv::TLV_SELECTORS => selectors = Some(Selectors::from_tlv(&child)?),
                tlv::TLV_NONCE => nonce = child.as_nonneg()? as u32,
                tlv::TLV_INTEREST_LIFETIME => lifetime_ms = child.as_nonneg()? as u32,
                _ => {}
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| Error::Packet("Interest without a name".into()))?,
            selectors,
            nonce,
            lifetime_ms,
        })
    }
}

/// The key material needed to verify a Data signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyLocator {
    /// Fetch the key by NDN name.
    KeyName(Name),
    /// The raw public key carried inline.
    Key(Bytes),
    /// A certificate carried inline.
    Cert(Bytes),
}

impl KeyLocator {
    fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        match self {
            KeyLocator::KeyName(name) => {
                let mut inner = BytesMut::new();
                name.to_tlv().encode(&mut inner);
                TlvElement::new(tlv::TLV_KEY_NAME, inner.freeze()).encode(&mut buf);
            }
            KeyLocator::Key(bytes) => {
                TlvElement::new(tlv::TLV_KEY_RAW, bytes.clone()).encode(&mut buf);
            }
            KeyLocator::Cert(bytes) => {
                TlvElement::new(tlv::TLV_KEY_CERT, bytes.clone()).encode(&mut buf);
            }
        }
        TlvElement::new(tlv::TLV_KEY_LOCATOR, buf.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut buf = element.value.clone();
        let child = TlvElement::decode(&mut buf)?;
        match child.tlv_type {
            tlv::TLV_KEY_NAME => {
                let mut inner = child.value.clone();
                let name_el = TlvElement::decode(&mut inner)?;
                Ok(KeyLocator::KeyName(Name::from_tlv(&name_el)?))
            }
            tlv::TLV_KEY_RAW => Ok(KeyLocator::Key(child.value.clone())),
            tlv::TLV_KEY_CERT => Ok(KeyLocator::Cert(child.value.clone())),
            t => Err(Error::Packet(format!("unknown key locator kind {}", t))),
        }
    }
}

/// Signature algorithm carried in a Data's SignatureInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    /// Integrity-only SHA-256 digest over the signed portion.
    DigestSha256,
    /// Ed25519 signature over the signed portion.
    Sha256WithEd25519,
}

impl SignatureType {
    fn as_u64(self) -> u64 {
        match self {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithEd25519 => 5,
        }
    }

    fn from_u64(v: u64) -> Result<Self, Error> {
        match v {
            0 => Ok(SignatureType::DigestSha256),
            5 => Ok(SignatureType::Sha256WithEd25519),
            t => Err(Error::Packet(format!("unknown signature type {}", t))),
        }
    }
}

/// Signing metadata attached to a Data packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Option<KeyLocator>,
    pub publisher_public_key_digest: Option<Bytes>,
    /// Merkle witness bytes. Carried through the codec but rejected by the
    /// verifier.
    pub witness: Option<Bytes>,
}

impl Default for SignatureInfo {
    fn default() -> Self {
        Self {
            signature_type: SignatureType::DigestSha256,
            key_locator: None,
            publisher_public_key_digest: None,
            witness: None,
        }
    }
}

impl SignatureInfo {
    fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        tlv::encode_nonneg_element(tlv::TLV_SIGNATURE_TYPE, self.signature_type.as_u64(), &mut buf);
        if let Some(locator) = &self.key_locator {
            locator.to_tlv().encode(&mut buf);
        }
        if let Some(digest) = &self.publisher_public_key_digest {
            TlvElement::new(tlv::TLV_PUBLISHER_KEY_DIGEST, digest.clone()).encode(&mut buf);
        }
        if let Some(witness) = &self.witness {
            TlvElement::new(tlv::TLV_WITNESS, witness.clone()).encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_SIGNATURE_INFO, buf.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut info = Self::default();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let child = TlvElement::decode(&mut buf)?;
            match child.tlv_type {
                tlv::TLV_SIGNATURE_TYPE => {
                    info.signature_type = SignatureType::from_u64(child.as_nonneg()?)?;
                }
                tlv::TLV_KEY_LOCATOR => info.key_locator = Some(KeyLocator::from_tlv(&child)?),
                tlv::TLV_PUBLISHER_KEY_DIGEST => {
                    info.publisher_public_key_digest = Some(child.value.clone());
                }
                tlv::TLV_WITNESS => info.witness = Some(child.value.clone()),
                _ => {}
            }
        }
        Ok(info)
    }
}

/// Payload metadata for a Data packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub content_type: u32,
    pub freshness_period_ms: Option<u64>,
}

impl Default for MetaInfo {
    fn default() -> Self {
        Self {
            content_type: CONTENT_TYPE_BLOB,
            freshness_period_ms: None,
        }
    }
}

impl MetaInfo {
    fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        tlv::encode_nonneg_element(tlv::TLV_CONTENT_TYPE, self.content_type as u64, &mut buf);
        if let Some(freshness) = self.freshness_period_ms {
            tlv::encode_nonneg_element(tlv::TLV_FRESHNESS_PERIOD, freshness, &mut buf);
        }
        TlvElement::new(tlv::TLV_META_INFO, buf.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut meta = Self::default();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let child = TlvElement::decode(&mut buf)?;
            match child.tlv_type {
                tlv::TLV_CONTENT_TYPE => meta.content_type = child.as_nonneg()? as u32,
                tlv::TLV_FRESHNESS_PERIOD => meta.freshness_period_ms = Some(child.as_nonneg()?),
                _ => {}
            }
        }
        Ok(meta)
    }
}

/// Represents an NDN Data packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// The name of the Data packet.
    pub name: Name,

    /// Payload metadata.
    pub meta_info: MetaInfo,

    /// The content of the Data packet.
    pub content: Bytes,

    /// Signing metadata, including the key locator.
    pub signature_info: SignatureInfo,

    /// The signature over the signed portion.
    pub signature_value: Bytes,
}

impl Data {
    /// Creates a new, unsigned Data packet.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            meta_info: MetaInfo::default(),
            content: content.into(),
            signature_info: SignatureInfo::default(),
            signature_value: Bytes::new(),
        }
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: u32) -> Self {
        self.meta_info.content_type = content_type;
        self
    }

    /// Sets the freshness period.
    pub fn with_freshness(mut self, freshness_ms: u64) -> Self {
        self.meta_info.freshness_period_ms = Some(freshness_ms);
        self
    }

    /// Sets the key locator.
    pub fn with_key_locator(mut self, locator: KeyLocator) -> Self {
        self.signature_info.key_locator = Some(locator);
        self
    }

    /// The byte range covered by the signature: Name, MetaInfo, Content and
    /// SignatureInfo, in wire order.
    pub fn signed_portion(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.name.to_tlv().encode(&mut buf);
        self.meta_info.to_tlv().encode(&mut buf);
        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut buf);
        self.signature_info.to_tlv().encode(&mut buf);
        buf.freeze()
    }

    /// Seals the packet with an integrity-only SHA-256 digest.
    pub fn sign_digest(&mut self) {
        self.signature_info.signature_type = SignatureType::DigestSha256;
        let digest = Sha256::digest(self.signed_portion());
        self.signature_value = Bytes::copy_from_slice(digest.as_slice());
    }

    /// Signs the packet with an Ed25519 key, recording the publisher's
    /// public key digest.
    pub fn sign(&mut self, key: &SigningKey) {
        self.signature_info.signature_type = SignatureType::Sha256WithEd25519;
        self.signature_info.publisher_public_key_digest = Some(key_digest(&key.verifying_key()));
        let signature = key.sign(&self.signed_portion());
        self.signature_value = Bytes::copy_from_slice(&signature.to_bytes());
    }

    /// Verifies the signature against `key`. Integrity-only packets are
    /// checked by digest recomputation and ignore the key.
    pub fn verify(&self, key: &VerifyingKey) -> bool {
        match self.signature_info.signature_type {
            SignatureType::DigestSha256 => self.verify_digest(),
            SignatureType::Sha256WithEd25519 => {
                let Ok(signature) = Signature::from_slice(&self.signature_value) else {
                    return false;
                };
                key.verify(&self.signed_portion(), &signature).is_ok()
            }
        }
    }

    /// Recomputes the integrity digest for a `DigestSha256` packet.
    pub fn verify_digest(&self) -> bool {
        if self.signature_info.signature_type != SignatureType::DigestSha256 {
            return false;
        }
        let digest = Sha256::digest(self.signed_portion());
        self.signature_value.as_ref() == digest.as_slice()
    }

    /// Encode this Data as a complete wire element.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        inner.extend_from_slice(&self.signed_portion());
        TlvElement::new(tlv::TLV_SIGNATURE_VALUE, self.signature_value.clone()).encode(&mut inner);
        TlvElement::new(tlv::TLV_DATA, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Encode this Data into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a Data from a complete wire element.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let outer = TlvElement::decode(buf)?;
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::Packet(format!(
                "expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }

        let mut name = None;
        let mut meta_info = MetaInfo::default();
        let mut content = Bytes::new();
        let mut signature_info = SignatureInfo::default();
        let mut signature_value = Bytes::new();

        let mut inner = outer.value.clone();
        while inner.has_remaining() {
            let child = TlvElement::decode(&mut inner)?;
            match child.tlv_type {
                tlv::TLV_NAME => name = Some(Name::from_tlv(&child)?),
                tlv::TLV_META_INFO => meta_info = MetaInfo::from_tlv(&child)?,
                tlv::TLV_CONTENT => content = child.value.clone(),
                tlv::TLV_SIGNATURE_INFO => signature_info = SignatureInfo::from_tlv(&child)?,
                tlv::TLV_SIGNATURE_VALUE => signature_value = child.value.clone(),
                _ => {}
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| Error::Packet("Data without a name".into()))?,
            meta_info,
            content,
            signature_info,
            signature_value,
        })
    }
}

/// SHA-256 digest of a public key's raw bytes, as carried in
/// `publisher_public_key_digest` fields.
pub fn key_digest(key: &VerifyingKey) -> Bytes {
    Bytes::copy_from_slice(Sha256::digest(key.as_bytes()).as_slice())
}

/// A prefix-registration request addressed to the local forwarder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingEntry {
    /// Registration action, `"selfreg"` for face self-registration.
    pub action: String,

    /// The name prefix being registered.
    pub prefix: Name,

    /// Forwarding flag bitmask.
    pub flags: u32,

    /// Registration lifetime in seconds.
    pub freshness_seconds: u32,
}

impl ForwardingEntry {
    pub fn new(action: impl Into<String>, prefix: Name, flags: u32, freshness_seconds: u32) -> Self {
        Self {
            action: action.into(),
            prefix,
            flags,
            freshness_seconds,
        }
    }

    /// Encode this entry as a complete wire element.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut inner = BytesMut::new();
        TlvElement::new(tlv::TLV_ACTION, Bytes::copy_from_slice(self.action.as_bytes()))
            .encode(&mut inner);
        self.prefix.to_tlv().encode(&mut inner);
        tlv::encode_nonneg_element(tlv::TLV_FORWARDING_FLAGS, self.flags as u64, &mut inner);
        tlv::encode_nonneg_element(tlv::TLV_FRESHNESS_SECONDS, self.freshness_seconds as u64, &mut inner);
        TlvElement::new(tlv::TLV_FORWARDING_ENTRY, inner.freeze()).encode(buf);
        Ok(())
    }

    /// Encode this entry into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode an entry from a complete wire element.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let outer = TlvElement::decode(buf)?;
        if outer.tlv_type != tlv::TLV_FORWARDING_ENTRY {
            return Err(Error::Packet(format!(
                "expected ForwardingEntry TLV type {}, got {}",
                tlv::TLV_FORWARDING_ENTRY,
                outer.tlv_type
            )));
        }

        let mut action = String::new();
        let mut prefix = None;
        let mut flags = 0u32;
        let mut freshness_seconds = 0u32;

        let mut inner = outer.value.clone();
        while inner.has_remaining() {
            let child = TlvElement::decode(&mut inner)?;
            match child.tlv_type {
                tlv::TLV_ACTION => {
                    action = String::from_utf8(child.value.to_vec())
                        .map_err(|_| Error::Packet("non-UTF-8 forwarding action".into()))?;
                }
                tlv::TLV_NAME => prefix = Some(Name::from_tlv(&child)?),
                tlv::TLV_FORWARDING_FLAGS => flags = child.as_nonneg()? as u32,
                tlv::TLV_FRESHNESS_SECONDS => freshness_seconds = child.as_nonneg()? as u32,
                _ => {}
            }
        }

        Ok(Self {
            action,
            prefix: prefix.ok_or_else(|| Error::Packet("ForwardingEntry without a prefix".into()))?,
            flags,
            freshness_seconds,
        })
    }
}

/// A complete wire element dispatched by its top-level type.
#[derive(Debug, Clone)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
}

impl Packet {
    /// Decode a packet from a complete element, branching on the top tag.
    pub fn decode(bytes: &Bytes) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::Packet("empty element".into()));
        }
        let mut buf = bytes.clone();
        match bytes[0] {
            tlv::TLV_INTEREST => Ok(Packet::Interest(Interest::decode(&mut buf)?)),
            tlv::TLV_DATA => Ok(Packet::Data(Data::decode(&mut buf)?)),
            t => Err(Error::Packet(format!("unknown packet type {}", t))),
        }
    }

    /// Encode the packet for transmission.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        match self {
            Packet::Interest(interest) => interest.to_bytes(),
            Packet::Data(data) => data.to_bytes(),
        }
    }

    /// The name carried by the packet.
    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(interest) => &interest.name,
            Packet::Data(data) => &data.name,
        }
    }
}
