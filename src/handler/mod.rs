// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Request handlers: the strategy object a [`crate::controller::RequestController`]
//! is armed with, bundling "where does this go", "what goes on the wire",
//! and "how do I recognize and decode my own response" into one object-safe
//! trait, the way the teacher's `Worker` bundles response/error handling for
//! a single outstanding CQL request.

mod command;
mod control_message;

pub use command::{Command, CommandHandler, ObjectMapper};
pub use control_message::{ControlMessage, ControlMessageHandler, ControlMessageKind};

use crate::codec::Header;
use crate::sink::DecodedResponse;
use crate::topology::{LogicalRequest, TopologyView};
use std::fmt::Debug;

/// A single outstanding request's strategy: target resolution, wire
/// encoding, response recognition, and success decoding.
///
/// Implementors are boxed and held by the controller for the lifetime of
/// one arming; `describe` feeds the `Client` error variant's diagnostic
/// text when a deadline is hit without a successful response.
pub trait RequestHandler: Send + Debug {
    /// Resolve this handler's logical destination against the current
    /// topology snapshot.
    fn pick_target(&self, topology: &dyn TopologyView) -> Option<LogicalRequest>;

    /// Serialize the outbound frame (header included).
    fn serialize(&self) -> Vec<u8>;

    /// Does this response header belong to this handler's own success body?
    /// Anything else is treated as a broker error envelope.
    fn matches_response(&self, header: &Header) -> bool;

    /// Decode a matching success body at `offset` into a type-erased value.
    fn decode_success(
        &self,
        bytes: &[u8],
        offset: usize,
        header: &Header,
    ) -> anyhow::Result<Box<dyn DecodedResponse>>;

    /// A short human-readable description used in client-side error text.
    fn describe(&self) -> String;
}
