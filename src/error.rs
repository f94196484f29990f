// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The public error taxonomy a caller observes through a [`crate::sink::ResultSink`].
//!
//! Internal fallible helpers (byte-level decode, UTF-8 recovery) return
//! `anyhow::Result` and are mapped into this taxonomy at the state-machine
//! boundary; nothing downstream of the sink ever has to downcast an opaque
//! boxed error.

use crate::codec::ErrorCode;
use thiserror::Error;

/// Everything a caller can observe as the terminal outcome of a request.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A non-retry-worthy error code reported by the broker in a response frame.
    #[error("broker error {code:?}: {message}")]
    Broker { code: ErrorCode, message: String },

    /// The deadline elapsed before a successful response was obtained.
    #[error("request timed out after contacting {contacted:?}: {description}")]
    Client {
        description: String,
        contacted: Vec<String>,
        #[source]
        cause: Option<anyhow::Error>,
    },

    /// The broker rejected the command outright; surfaced verbatim, never wrapped.
    #[error("command rejected: {reason}")]
    CommandRejected { reason: String },

    /// Any other local exception encountered during send, decode, or handler
    /// execution; wrapped because its origin is not a distinguished case.
    #[error("unexpected exception during response handling: {0}")]
    Unexpected(#[source] anyhow::Error),
}

impl ControllerError {
    /// A synthetic error used when FAILED is entered with neither
    /// `error_code` nor `exception` set — this should never be observed in
    /// practice; it exists only so the error-channel-exclusivity invariant
    /// always has something to report.
    pub fn unknown() -> Self {
        ControllerError::Unexpected(anyhow::anyhow!("unknown error"))
    }
}

/// Convenience alias for the value a [`crate::sink::ResultSink`] resolves to.
pub type ControllerOutcome<T> = Result<T, ControllerError>;
