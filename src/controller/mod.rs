// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The request controller: the finite-state machine that drives a single
//! logical request from endpoint resolution through completion.
//!
//! `step()` performs at most one state transition and returns a work-unit
//! count for the [`ControllerPool`] runner: any positive value means "keep
//! polling me", zero means "idle this tick, nothing to do yet". No
//! transition ever blocks.

mod pool;

pub use pool::{ControllerPool, PooledRelease, ReleaseHandle};

use crate::clock::{Clock, Deadline};
use crate::codec::{try_decode_response, Decoded, ErrorCode};
use crate::error::ControllerError;
use crate::handler::{Command, ControlMessage, ObjectMapper, RequestHandler};
use crate::sink::{DecodedResponse, ResultSink};
use crate::topology::{Endpoint, LogicalRequest, RefreshHandle, TopologyView};
use crate::transport::{PendingResponse, Transport, TransportError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The controller's current position in the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Determine,
    Execute,
    Refresh,
    AwaitRefresh,
    HandleResponse,
    Finished,
    Failed,
}

/// Returned by `configure_*` when the controller is mid-request.
#[derive(Debug, Error)]
#[error("controller is already armed with an in-flight request")]
pub struct AlreadyArmed;

/// A cooperative, non-blocking state machine driving one outbound request
/// to completion against a partitioned, cluster-aware broker.
pub struct RequestController {
    topology: Arc<dyn TopologyView>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    release: Arc<dyn ReleaseHandle>,

    handler: Option<Box<dyn RequestHandler>>,
    result_sink: Option<Box<dyn ResultSink>>,
    deadline: Option<Deadline>,
    attempts: u32,
    contacted: HashSet<Endpoint>,
    pending: Option<Box<dyn PendingResponse>>,
    refresh_handle: Option<Box<dyn RefreshHandle>>,
    receiver: Option<Endpoint>,
    decoded: Option<Box<dyn DecodedResponse>>,
    error_code: ErrorCode,
    error_bytes: Vec<u8>,
    exception: Option<ControllerError>,
    state: State,
    armed: bool,
}

impl fmt::Debug for RequestController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestController")
            .field("state", &self.state)
            .field("armed", &self.armed)
            .field("attempts", &self.attempts)
            .field("contacted", &self.contacted)
            .finish()
    }
}

impl RequestController {
    pub fn new(
        topology: Arc<dyn TopologyView>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
        release: Arc<dyn ReleaseHandle>,
    ) -> Self {
        Self {
            topology,
            transport,
            clock,
            timeout,
            release,
            handler: None,
            result_sink: None,
            deadline: None,
            attempts: 0,
            contacted: HashSet::new(),
            pending: None,
            refresh_handle: None,
            receiver: None,
            decoded: None,
            error_code: ErrorCode::NullVal,
            error_bytes: Vec::new(),
            exception: None,
            state: State::Closed,
            armed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed && !self.armed
    }

    pub fn configure_command(
        &mut self,
        command: Arc<dyn Command>,
        object_mapper: Arc<dyn ObjectMapper>,
        sink: Box<dyn ResultSink>,
    ) -> Result<(), AlreadyArmed> {
        self.configure(
            Box::new(crate::handler::CommandHandler::new(command, object_mapper)),
            sink,
        )
    }

    pub fn configure_control_message(
        &mut self,
        message: Arc<dyn ControlMessage>,
        sink: Box<dyn ResultSink>,
    ) -> Result<(), AlreadyArmed> {
        self.configure(
            Box::new(crate::handler::ControlMessageHandler::new(message)),
            sink,
        )
    }

    fn configure(
        &mut self,
        handler: Box<dyn RequestHandler>,
        sink: Box<dyn ResultSink>,
    ) -> Result<(), AlreadyArmed> {
        if self.armed {
            return Err(AlreadyArmed);
        }
        self.reset();
        self.handler = Some(handler);
        self.result_sink = Some(sink);
        self.deadline = Some(Deadline::from_now(self.clock.now(), self.timeout));
        self.armed = true;
        self.state = State::Determine;
        Ok(())
    }

    fn reset(&mut self) {
        self.attempts = 0;
        self.contacted.clear();
        self.pending = None;
        self.refresh_handle = None;
        self.receiver = None;
        self.decoded = None;
        self.error_code = ErrorCode::NullVal;
        self.error_bytes.clear();
        self.exception = None;
        self.state = State::Closed;
    }

    /// Advance the state machine by at most one transition. Never blocks;
    /// returns the number of work units performed (0 means idle this tick).
    pub fn step(&mut self) -> u32 {
        match self.state {
            State::Closed => 0,
            State::Determine => self.step_determine(),
            State::Execute => self.step_execute(),
            State::Refresh => self.step_refresh(),
            State::AwaitRefresh => self.step_await_refresh(),
            State::HandleResponse => self.step_handle_response(),
            State::Finished => self.step_finished(),
            State::Failed => self.step_failed(),
        }
    }

    fn step_determine(&mut self) -> u32 {
        self.attempts += 1;

        let now = self.clock.now();
        if self.deadline.expect("armed controller has a deadline").is_expired(now) {
            let description = self.handler.as_ref().expect("armed").describe();
            let contacted = self.contacted.iter().map(Endpoint::to_string).collect();
            log::warn!(
                "{} exhausted its deadline after {} attempt(s)",
                description,
                self.attempts
            );
            let cause = self.exception.take().map(anyhow::Error::from);
            self.exception = Some(ControllerError::Client {
                description,
                contacted,
                cause,
            });
            self.state = State::Failed;
            return 1;
        }

        let handler = self.handler.as_ref().expect("armed");
        let logical = match handler.pick_target(self.topology.as_ref()) {
            Some(logical) => logical,
            None => {
                self.state = State::Refresh;
                return 1;
            }
        };
        let endpoint = match self.resolve(&logical) {
            Some(endpoint) => endpoint,
            None => {
                self.state = State::Refresh;
                return 1;
            }
        };

        let payload = handler.serialize();
        match self.transport.send(endpoint, payload) {
            Some(pending) => {
                self.contacted.insert(endpoint);
                self.receiver = Some(endpoint);
                self.pending = Some(pending);
                self.state = State::Execute;
                1
            }
            // No request slot available right now; stay in DETERMINE and
            // let the runner reschedule us.
            None => 1,
        }
    }

    fn resolve(&self, logical: &LogicalRequest) -> Option<Endpoint> {
        self.topology.pick(logical)
    }

    fn step_execute(&mut self) -> u32 {
        let is_ready = self
            .pending
            .as_ref()
            .expect("execute without a pending request")
            .is_ready();
        if !is_ready {
            return 0;
        }

        let mut pending = self.pending.take().expect("checked above");
        match pending.take() {
            Ok(Some(bytes)) => {
                let handler = self.handler.as_ref().expect("armed");
                let decoded = try_decode_response(
                    &bytes,
                    |header| handler.matches_response(header),
                    |b, offset, header| handler.decode_success(b, offset, header),
                );
                match decoded {
                    Ok(Decoded::Success(value)) => {
                        self.decoded = Some(value);
                        self.error_code = ErrorCode::NullVal;
                        self.error_bytes.clear();
                        self.state = State::HandleResponse;
                    }
                    Ok(Decoded::Error(envelope)) => {
                        self.error_code = envelope.error_code;
                        self.error_bytes = envelope.error_data;
                        self.state = State::HandleResponse;
                    }
                    Err(cause) => {
                        // Abandon the handle: the response was received but
                        // could not be interpreted, so there is nothing more
                        // for the transport to deliver.
                        pending.release();
                        self.exception = Some(ControllerError::Unexpected(cause));
                        self.state = State::Failed;
                    }
                }
                1
            }
            Ok(None) => {
                self.pending = Some(pending);
                0
            }
            Err(TransportError::CommandRejected { reason }) => {
                pending.release();
                self.exception = Some(ControllerError::CommandRejected { reason });
                self.state = State::Failed;
                1
            }
            Err(TransportError::Other(cause)) => {
                pending.release();
                self.exception = Some(ControllerError::Unexpected(cause));
                self.state = State::Failed;
                1
            }
        }
    }

    fn step_refresh(&mut self) -> u32 {
        self.refresh_handle = Some(self.topology.refresh_now());
        self.state = State::AwaitRefresh;
        1
    }

    fn step_await_refresh(&mut self) -> u32 {
        let is_done = self
            .refresh_handle
            .as_mut()
            .expect("await_refresh without a refresh handle")
            .is_done();
        if !is_done {
            return 0;
        }
        let mut handle = self.refresh_handle.take().expect("checked above");
        // A failed refresh is non-fatal: the deadline, not this error,
        // decides whether the retry loop ends.
        if let Err(error) = handle.get() {
            log::debug!("topology refresh failed, retrying endpoint resolution: {:#}", error);
        }
        self.state = State::Determine;
        1
    }

    fn step_handle_response(&mut self) -> u32 {
        if self.error_code == ErrorCode::NullVal {
            self.state = State::Finished;
        } else if self.error_code.is_retry_worthy() {
            log::debug!(
                "retrying after {:?} on attempt {} (endpoint {:?})",
                self.error_code,
                self.attempts,
                self.receiver
            );
            self.error_code = ErrorCode::NullVal;
            self.error_bytes.clear();
            self.state = State::Refresh;
        } else {
            self.state = State::Failed;
        }
        1
    }

    fn step_finished(&mut self) -> u32 {
        let mut decoded = self.decoded.take().expect("finished without a decoded value");
        if let Some(endpoint) = self.receiver {
            decoded.set_receiver(endpoint);
        }
        let sink = self.result_sink.take().expect("finished without a sink");
        sink.complete(decoded);
        log::trace!("request finished after {} attempt(s)", self.attempts);
        self.release.release();
        self.armed = false;
        self.state = State::Closed;
        1
    }

    fn step_failed(&mut self) -> u32 {
        let error = if self.error_code != ErrorCode::NullVal {
            let code = self.error_code;
            let message = crate::codec::ErrorEnvelope {
                error_code: code,
                error_data: std::mem::take(&mut self.error_bytes),
            }
            .message();
            ControllerError::Broker { code, message }
        } else if let Some(error) = self.exception.take() {
            error
        } else {
            ControllerError::unknown()
        };

        let sink = self.result_sink.take().expect("failed without a sink");
        sink.complete_err(error);
        self.release.release();
        self.armed = false;
        self.state = State::Closed;
        1
    }
}
