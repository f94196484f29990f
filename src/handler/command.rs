// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Command requests: targeted at a specific (topic, partition), serialized
//! and decoded through a shared, injected object-mapper rather than owning
//! their own serialization logic.

use super::RequestHandler;
use crate::codec::{encode_header, Header};
use crate::sink::DecodedResponse;
use crate::topology::{LogicalRequest, TopologyView};
use std::fmt;
use std::sync::Arc;

/// A domain command bound for a single (topic, partition). Only the facts
/// a `CommandHandler` needs to route and frame the request — payload
/// construction and the intermediate object-map representation live
/// entirely in the object-mapper.
pub trait Command: Send + Sync + fmt::Debug {
    fn topic(&self) -> &str;
    fn partition(&self) -> i32;
    fn template_id(&self) -> u16;
    fn schema_id(&self) -> u16;
}

/// The shared serializer/deserializer injected into every `CommandHandler`.
/// Never owned or constructed by the handler itself.
pub trait ObjectMapper: Send + Sync + fmt::Debug {
    fn encode(&self, command: &dyn Command) -> Vec<u8>;
    fn decode(&self, command: &dyn Command, bytes: &[u8]) -> anyhow::Result<Box<dyn DecodedResponse>>;
}

#[derive(Debug)]
pub struct CommandHandler {
    command: Arc<dyn Command>,
    object_mapper: Arc<dyn ObjectMapper>,
}

impl CommandHandler {
    pub fn new(command: Arc<dyn Command>, object_mapper: Arc<dyn ObjectMapper>) -> Self {
        Self {
            command,
            object_mapper,
        }
    }
}

impl RequestHandler for CommandHandler {
    fn pick_target(&self, _topology: &dyn TopologyView) -> Option<LogicalRequest> {
        Some(LogicalRequest::Partition {
            topic: self.command.topic().to_string(),
            partition: self.command.partition(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let header = Header {
            block_length: 0,
            template_id: self.command.template_id(),
            schema_id: self.command.schema_id(),
            version: 1,
        };
        let mut out = Vec::new();
        encode_header(&header, &mut out);
        out.extend(self.object_mapper.encode(self.command.as_ref()));
        out
    }

    fn matches_response(&self, header: &Header) -> bool {
        header.template_id == self.command.template_id() && header.schema_id == self.command.schema_id()
    }

    fn decode_success(
        &self,
        bytes: &[u8],
        offset: usize,
        _header: &Header,
    ) -> anyhow::Result<Box<dyn DecodedResponse>> {
        self.object_mapper.decode(self.command.as_ref(), &bytes[offset..])
    }

    fn describe(&self) -> String {
        format!(
            "command on {}:{}",
            self.command.topic(),
            self.command.partition()
        )
    }
}
