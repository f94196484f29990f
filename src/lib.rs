// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Client-side request controller for a partitioned, cluster-aware broker.
//!
//! The core type is [`controller::RequestController`]: a cooperative, non-blocking
//! state machine that drives a single outbound command or control-message request
//! to completion against a topology of remote endpoints.

pub mod clock;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod handler;
pub mod sink;
pub mod topology;
pub mod transport;

pub mod prelude {
    pub use crate::{
        clock::{Clock, SystemClock},
        codec::{decode_header, encode_header, ErrorCode, ErrorEnvelope, Header, HEADER_SIZE},
        config::ClientConfig,
        controller::{ControllerPool, PooledRelease, ReleaseHandle, RequestController, State},
        error::{ControllerError, ControllerOutcome},
        handler::{
            Command, CommandHandler, ControlMessage, ControlMessageHandler, ControlMessageKind,
            ObjectMapper, RequestHandler,
        },
        sink::{DecodedResponse, OneshotSink, ResultSink},
        topology::{CachedTopologyView, Endpoint, LogicalRequest, RefreshHandle, Snapshot, TopologyView},
        transport::{PendingResponse, Transport, TransportError},
    };
}
