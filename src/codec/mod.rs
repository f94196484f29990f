// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Sentinel-based response decoding.
//!
//! There is no explicit success/error tag on the wire: a response is an
//! error iff its header does not match what the handler that sent the
//! request expects. [`try_decode_response`] is the single place that
//! encodes this rule.

mod error_frame;
mod header;

pub use error_frame::{ErrorCode, ErrorEnvelope, ERROR_TEMPLATE_OFFSET};
pub use header::{decode_header, encode_header, FrameError, Header, HEADER_SIZE};

use crate::sink::DecodedResponse;

/// Outcome of decoding a single response frame against a handler's expectation.
pub enum Decoded {
    /// Header matched; `decode_success` already produced the value.
    Success(Box<dyn DecodedResponse>),
    /// Header did not match; the body was a broker error envelope.
    Error(ErrorEnvelope),
}

/// Decode one frame, dispatching to `decode_success` when the header matches
/// what `matches_response` expects, and to the error envelope otherwise.
///
/// `decode_success` and `matches_response` are supplied by the caller
/// (normally a [`crate::handler::RequestHandler`]) rather than taken as a
/// trait object here, so this module stays free of a dependency on the
/// handler module.
pub fn try_decode_response<F>(
    bytes: &[u8],
    matches_response: impl Fn(&Header) -> bool,
    decode_success: F,
) -> anyhow::Result<Decoded>
where
    F: FnOnce(&[u8], usize, &Header) -> anyhow::Result<Box<dyn DecodedResponse>>,
{
    let header = decode_header(bytes)?;
    if matches_response(&header) {
        let value = decode_success(bytes, HEADER_SIZE, &header)?;
        Ok(Decoded::Success(value))
    } else {
        let envelope = ErrorEnvelope::decode(bytes, ERROR_TEMPLATE_OFFSET)?;
        Ok(Decoded::Error(envelope))
    }
}
