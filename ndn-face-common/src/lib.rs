//! Common types and utilities for the ndn-face client stack.
//!
//! This crate provides the packet model, TLV codec, error type and metrics
//! primitives shared by the Face library and its front-ends.

pub mod error;
pub mod metrics;
pub mod ndn;
pub mod tlv;

/// Reexport of common types
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
