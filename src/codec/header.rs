// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The fixed-size wire header shared by every request and response frame.
//!
//! Layout is four big-endian `u16` fields with no variable-length preamble:
//! `block_length, template_id, schema_id, version`. There is no success/error
//! tag on the wire — the handler's expected `template_id`/`schema_id` is the
//! only discriminator (see [`crate::codec::try_decode_response`]).

use thiserror::Error;

/// Size in bytes of the fixed header.
pub const HEADER_SIZE: usize = 8;

/// The decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

/// Frame could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },
    #[error("error envelope truncated: declared {declared} bytes of error data, only {available} available")]
    TruncatedErrorData { declared: usize, available: usize },
}

/// Read the fixed header at offset 0.
pub fn decode_header(bytes: &[u8]) -> Result<Header, FrameError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::TooShort {
            need: HEADER_SIZE,
            got: bytes.len(),
        });
    }
    Ok(Header {
        block_length: u16::from_be_bytes([bytes[0], bytes[1]]),
        template_id: u16::from_be_bytes([bytes[2], bytes[3]]),
        schema_id: u16::from_be_bytes([bytes[4], bytes[5]]),
        version: u16::from_be_bytes([bytes[6], bytes[7]]),
    })
}

/// Write the fixed header, appending it to `out`.
pub fn encode_header(header: &Header, out: &mut Vec<u8>) {
    out.extend_from_slice(&header.block_length.to_be_bytes());
    out.extend_from_slice(&header.template_id.to_be_bytes());
    out.extend_from_slice(&header.schema_id.to_be_bytes());
    out.extend_from_slice(&header.version.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let header = Header {
            block_length: 42,
            template_id: 7,
            schema_id: 1,
            version: 3,
        };
        let mut buf = Vec::new();
        encode_header(&header, &mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(decode_header(&buf).unwrap(), header);
    }

    #[test]
    fn rejects_short_buffers() {
        let buf = [0u8; HEADER_SIZE - 1];
        assert_eq!(
            decode_header(&buf),
            Err(FrameError::TooShort {
                need: HEADER_SIZE,
                got: HEADER_SIZE - 1
            })
        );
    }
}
