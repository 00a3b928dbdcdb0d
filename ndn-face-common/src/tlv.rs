//! TLV (Type-Length-Value) encoding and decoding utilities.
//!
//! This module provides the framing rules every ndn-face packet uses on the
//! wire: single-byte types, NDN variable-width lengths, and the
//! non-negative integer encoding used for numeric fields.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/* ---------------------------------------------------------------- *
 * TLV type constants (single-byte)
 * ---------------------------------------------------------------- */

pub const TLV_INTEREST: u8 = 0x05;
pub const TLV_DATA: u8 = 0x06;
pub const TLV_NAME: u8 = 0x07;
pub const TLV_COMPONENT: u8 = 0x08;
pub const TLV_SELECTORS: u8 = 0x09;
pub const TLV_NONCE: u8 = 0x0A;
pub const TLV_INTEREST_LIFETIME: u8 = 0x0C;

pub const TLV_MIN_SUFFIX_COMPONENTS: u8 = 0x0D;
pub const TLV_MAX_SUFFIX_COMPONENTS: u8 = 0x0E;
pub const TLV_PUBLISHER_KEY_DIGEST: u8 = 0x0F;
pub const TLV_EXCLUDE: u8 = 0x10;
pub const TLV_CHILD_SELECTOR: u8 = 0x11;
pub const TLV_ANSWER_ORIGIN_KIND: u8 = 0x12;
pub const TLV_SCOPE: u8 = 0x13;

pub const TLV_META_INFO: u8 = 0x14;
pub const TLV_CONTENT: u8 = 0x15;
pub const TLV_SIGNATURE_INFO: u8 = 0x16;
pub const TLV_SIGNATURE_VALUE: u8 = 0x17;
pub const TLV_CONTENT_TYPE: u8 = 0x18;
pub const TLV_FRESHNESS_PERIOD: u8 = 0x19;
pub const TLV_SIGNATURE_TYPE: u8 = 0x1B;
pub const TLV_KEY_LOCATOR: u8 = 0x1C;
pub const TLV_KEY_NAME: u8 = 0x1D;
pub const TLV_KEY_RAW: u8 = 0x1E;
pub const TLV_KEY_CERT: u8 = 0x1F;
pub const TLV_WITNESS: u8 = 0x20;

pub const TLV_FORWARDING_ENTRY: u8 = 0x30;
pub const TLV_ACTION: u8 = 0x31;
pub const TLV_FORWARDING_FLAGS: u8 = 0x32;
pub const TLV_FRESHNESS_SECONDS: u8 = 0x33;

/* ---------------------------------------------------------------- *
 * Encoding helpers
 * ---------------------------------------------------------------- */

/// Encode the 1-byte TLV *type* field.
pub fn encode_tlv_type(tlv_type: u8, buf: &mut BytesMut) {
    buf.put_u8(tlv_type);
}

/// Encode the variable-width TLV *length* field.
///
/// * `< 253`  → 1 byte
/// * `≤ 65 535`  → marker 253 + 2-byte length
/// * otherwise → marker 254 + 4-byte length
pub fn encode_tlv_length(length: usize, buf: &mut BytesMut) {
    if length < 253 {
        buf.put_u8(length as u8);
    } else if length <= 65_535 {
        buf.put_u8(253);
        buf.put_u16(length as u16);
    } else {
        buf.put_u8(254);
        buf.put_u32(length as u32);
    }
}

/// Number of bytes required to encode `length` with the variable-width scheme.
pub fn tlv_length_size(length: usize) -> usize {
    if length < 253 {
        1
    } else if length <= 65_535 {
        3
    } else {
        5
    }
}

/// Encode a non-negative integer in the shortest of 1, 2, 4 or 8 bytes.
pub fn encode_nonneg(value: u64, buf: &mut BytesMut) {
    if value <= 0xFF {
        buf.put_u8(value as u8);
    } else if value <= 0xFFFF {
        buf.put_u16(value as u16);
    } else if value <= 0xFFFF_FFFF {
        buf.put_u32(value as u32);
    } else {
        buf.put_u64(value);
    }
}

/// Encode a non-negative integer as the value of a TLV element.
pub fn encode_nonneg_element(tlv_type: u8, value: u64, buf: &mut BytesMut) {
    let mut inner = BytesMut::new();
    encode_nonneg(value, &mut inner);
    TlvElement::new(tlv_type, inner.freeze()).encode(buf);
}

/* ---------------------------------------------------------------- *
 * Decoding helpers
 * ---------------------------------------------------------------- */

/// Decode the TLV *type* field (single byte).
pub fn decode_tlv_type(buf: &mut impl Buf) -> Result<u8, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("buffer underflow when decoding TLV type".into()));
    }
    Ok(buf.get_u8())
}

/// Decode the TLV *length* field using NDN variable-length rules.
pub fn decode_tlv_length(buf: &mut impl Buf) -> Result<usize, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("buffer underflow when decoding TLV length".into()));
    }

    let first_byte = buf.get_u8();
    match first_byte {
        0..=252 => Ok(first_byte as usize),
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Tlv("buffer underflow when decoding 16-bit TLV length".into()));
            }
            Ok(buf.get_u16() as usize)
        }
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Tlv("buffer underflow when decoding 32-bit TLV length".into()));
            }
            Ok(buf.get_u32() as usize)
        }
        255 => Err(Error::Tlv("64-bit TLV lengths not supported".into())),
    }
}

/// Decode a non-negative integer from a TLV value of 1, 2, 4 or 8 bytes.
pub fn decode_nonneg(value: &Bytes) -> Result<u64, Error> {
    let mut buf = value.clone();
    match buf.remaining() {
        1 => Ok(buf.get_u8() as u64),
        2 => Ok(buf.get_u16() as u64),
        4 => Ok(buf.get_u32() as u64),
        8 => Ok(buf.get_u64()),
        n => Err(Error::Tlv(format!("invalid non-negative integer width {}", n))),
    }
}

/* ---------------------------------------------------------------- *
 * TLV element wrapper
 * ---------------------------------------------------------------- */

/// A generic TLV element consisting of *type*, *length* and *value*.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u8,
    pub value: Bytes,
}

impl TlvElement {
    /// Create a new wrapper from raw parts.
    pub fn new(tlv_type: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Total number of bytes when this element is encoded.
    pub fn len(&self) -> usize {
        let vlen = self.value.len();
        1 + tlv_length_size(vlen) + vlen
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encode this element into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_tlv_type(self.tlv_type, buf);
        encode_tlv_length(self.value.len(), buf);
        buf.extend_from_slice(&self.value);
    }

    /// Decode a single element from `buf` **in-place**.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 2 {
            return Err(Error::Tlv("buffer too small for TLV header".into()));
        }

        let tlv_type = decode_tlv_type(buf)?;
        let length = decode_tlv_length(buf)?;

        if buf.remaining() < length {
            return Err(Error::Tlv(format!(
                "buffer underflow: TLV value requires {} bytes but only {} available",
                length,
                buf.remaining()
            )));
        }

        // zero-copy slice out of the source buffer
        let value = buf.copy_to_bytes(length);
        Ok(Self { tlv_type, value })
    }

    /// Decode the non-negative integer held in this element's value.
    pub fn as_nonneg(&self) -> Result<u64, Error> {
        decode_nonneg(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_round_trip() {
        for len in [0usize, 1, 252, 253, 1000, 65_535, 65_536, 1_000_000] {
            let mut buf = BytesMut::new();
            encode_tlv_length(len, &mut buf);
            assert_eq!(buf.len(), tlv_length_size(len));
            let mut rd = buf.freeze();
            assert_eq!(decode_tlv_length(&mut rd).unwrap(), len);
        }
    }

    #[test]
    fn nonneg_round_trip() {
        for v in [0u64, 100, 255, 256, 4000, 65_536, 2_147_483_647, u64::MAX] {
            let mut buf = BytesMut::new();
            encode_nonneg(v, &mut buf);
            assert_eq!(decode_nonneg(&buf.clone().freeze()).unwrap(), v);
        }
    }

    #[test]
    fn element_round_trip() {
        let element = TlvElement::new(TLV_CONTENT, Bytes::from_static(b"abc"));
        let mut buf = BytesMut::new();
        element.encode(&mut buf);
        assert_eq!(buf.len(), element.len());
        assert_eq!(buf[0], TLV_CONTENT);
        assert_eq!(buf[1], 3);

        let mut rd = buf.freeze();
        let decoded = TlvElement::decode(&mut rd).unwrap();
        assert_eq!(decoded, element);
        assert!(!rd.has_remaining());
    }

    #[test]
    fn element_underflow() {
        let mut short = Bytes::from_static(&[TLV_CONTENT, 10, b'a']);
        assert!(TlvElement::decode(&mut short).is_err());
    }
}
