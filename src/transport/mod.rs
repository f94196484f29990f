// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The transport collaborator: opaque send/poll/release over raw frames.
//! Socket management and reconnect are out of scope here — this is the
//! seam the controller depends on, not an implementation of it.

use crate::topology::Endpoint;
use std::fmt;
use thiserror::Error;

/// Failure surfaced by [`PendingResponse::take`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker rejected the command outright; this is the one local
    /// error variant the controller surfaces to the sink verbatim instead
    /// of wrapping as "unexpected".
    #[error("command rejected: {reason}")]
    CommandRejected { reason: String },

    /// Any other local failure in retrieving the response bytes.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A handle to an outstanding request. `take` is non-blocking: it returns
/// `Ok(None)` while the response has not yet arrived.
pub trait PendingResponse: Send {
    fn is_ready(&self) -> bool;

    /// Retrieve the response bytes once ready. Calling before `is_ready()`
    /// returns `Ok(None)`.
    fn take(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Release this handle. The transport guarantees any late reply on a
    /// released handle is dropped, never delivered.
    fn release(&mut self);
}

/// The thread-safe send/poll collaborator.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send `payload` to `endpoint`. Returns `None` when no request slot is
    /// currently available — the caller must retry on a later tick without
    /// changing state.
    fn send(&self, endpoint: Endpoint, payload: Vec<u8>) -> Option<Box<dyn PendingResponse>>;
}
