// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Control messages: broker-administrative requests that target the
//! cluster leader, a specific node, or any node at random, depending on
//! the message's own kind rather than a (topic, partition) lookup.

use super::RequestHandler;
use crate::codec::{encode_header, Header};
use crate::sink::DecodedResponse;
use crate::topology::{Endpoint, LogicalRequest, TopologyView};
use std::fmt;
use std::sync::Arc;

/// Where a control message is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessageKind {
    Leader,
    Node(Endpoint),
    Random,
}

/// A typed control message, owning its own wire encoding and response
/// decoding — unlike commands, these do not go through a shared
/// object-mapper.
pub trait ControlMessage: Send + Sync + fmt::Debug {
    fn kind(&self) -> ControlMessageKind;
    fn template_id(&self) -> u16;
    fn schema_id(&self) -> u16;
    fn encode_body(&self) -> Vec<u8>;
    fn decode_response(&self, bytes: &[u8]) -> anyhow::Result<Box<dyn DecodedResponse>>;
    fn describe(&self) -> String;
}

#[derive(Debug)]
pub struct ControlMessageHandler {
    message: Arc<dyn ControlMessage>,
}

impl ControlMessageHandler {
    pub fn new(message: Arc<dyn ControlMessage>) -> Self {
        Self { message }
    }
}

impl RequestHandler for ControlMessageHandler {
    fn pick_target(&self, _topology: &dyn TopologyView) -> Option<LogicalRequest> {
        Some(match self.message.kind() {
            ControlMessageKind::Leader => LogicalRequest::Leader,
            ControlMessageKind::Node(endpoint) => LogicalRequest::Node(endpoint),
            ControlMessageKind::Random => LogicalRequest::Random,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let header = Header {
            block_length: 0,
            template_id: self.message.template_id(),
            schema_id: self.message.schema_id(),
            version: 1,
        };
        let mut out = Vec::new();
        encode_header(&header, &mut out);
        out.extend(self.message.encode_body());
        out
    }

    fn matches_response(&self, header: &Header) -> bool {
        header.template_id == self.message.template_id() && header.schema_id == self.message.schema_id()
    }

    fn decode_success(
        &self,
        bytes: &[u8],
        offset: usize,
        _header: &Header,
    ) -> anyhow::Result<Box<dyn DecodedResponse>> {
        self.message.decode_response(&bytes[offset..])
    }

    fn describe(&self) -> String {
        self.message.describe()
    }
}
