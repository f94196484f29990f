// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The error envelope body and the open-ended broker error code set.

use super::header::{FrameError, HEADER_SIZE};

/// A broker-reported error code.
///
/// `NullVal` is the absence sentinel used by [`super::try_decode_response`]
/// to signal "no error" after a successful decode; it never appears on the
/// wire as a real error code. Everything past `TopicNotFound` is an
/// open-ended tail of domain codes the controller treats opaquely: it only
/// ever asks "is this retry-worthy or not".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NullVal,
    RequestTimeout,
    TopicNotFound,
    Other(u16),
}

/// Codes reserved for the two well-known variants above; everything else
/// round-trips through `Other`.
const REQUEST_TIMEOUT_WIRE: u16 = 1;
const TOPIC_NOT_FOUND_WIRE: u16 = 2;
const NULL_VAL_WIRE: u16 = 0;

impl ErrorCode {
    pub fn from_wire(value: u16) -> Self {
        match value {
            NULL_VAL_WIRE => ErrorCode::NullVal,
            REQUEST_TIMEOUT_WIRE => ErrorCode::RequestTimeout,
            TOPIC_NOT_FOUND_WIRE => ErrorCode::TopicNotFound,
            other => ErrorCode::Other(other),
        }
    }

    pub fn to_wire(self) -> u16 {
        match self {
            ErrorCode::NullVal => NULL_VAL_WIRE,
            ErrorCode::RequestTimeout => REQUEST_TIMEOUT_WIRE,
            ErrorCode::TopicNotFound => TOPIC_NOT_FOUND_WIRE,
            ErrorCode::Other(value) => value,
        }
    }

    /// Retry-worthy set: `{ TOPIC_NOT_FOUND, REQUEST_TIMEOUT }`.
    pub fn is_retry_worthy(self) -> bool {
        matches!(self, ErrorCode::RequestTimeout | ErrorCode::TopicNotFound)
    }
}

/// Decoded error envelope: `{ error_code: u16, error_data_length: u16, error_data: bytes }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error_code: ErrorCode,
    pub error_data: Vec<u8>,
}

impl ErrorEnvelope {
    /// Decode the error envelope body starting at `offset` (normally
    /// `HEADER_SIZE`).
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Self, FrameError> {
        if bytes.len() < offset + 4 {
            return Err(FrameError::TooShort {
                need: offset + 4,
                got: bytes.len(),
            });
        }
        let error_code = ErrorCode::from_wire(u16::from_be_bytes([bytes[offset], bytes[offset + 1]]));
        let declared = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        let data_start = offset + 4;
        let available = bytes.len().saturating_sub(data_start);
        if available < declared {
            return Err(FrameError::TruncatedErrorData { declared, available });
        }
        let error_data = bytes[data_start..data_start + declared].to_vec();
        Ok(Self { error_code, error_data })
    }

    /// Encode this envelope's body (without the preceding header) into `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.error_code.to_wire().to_be_bytes());
        out.extend_from_slice(&(self.error_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.error_data);
    }

    /// Render the error's opaque bytes as text, falling back to a fabricated
    /// message if they are not valid UTF-8 (bytes are never assumed to be
    /// valid text).
    pub fn message(&self) -> String {
        match std::str::from_utf8(&self.error_data) {
            Ok(text) => text.to_owned(),
            Err(_) => format!("<{} bytes of non-utf8 error data>", self.error_data.len()),
        }
    }
}

/// The wire's distinguished error template id. Any inbound frame whose
/// header does not match the active handler's expected template is treated
/// as carrying this body, starting at [`HEADER_SIZE`].
pub const ERROR_TEMPLATE_OFFSET: usize = HEADER_SIZE;
