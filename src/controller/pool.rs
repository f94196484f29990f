// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! A fixed-size pool of [`RequestController`]s and the cooperative runner
//! that drives them.
//!
//! The release callback each controller holds is a *handle-back*, not a
//! back-pointer into the pool: it closes only over its own slot index and a
//! shared free-list, so a controller never needs to know the pool exists.

use super::RequestController;
use crate::clock::Clock;
use crate::topology::TopologyView;
use crate::transport::Transport;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Invoked exactly once on every terminal exit, returning the controller's
/// slot to the pool's free list.
pub trait ReleaseHandle: Send + Sync {
    fn release(&self);
}

#[derive(Debug)]
pub struct PooledRelease {
    index: usize,
    free: Arc<Mutex<VecDeque<usize>>>,
}

impl ReleaseHandle for PooledRelease {
    fn release(&self) {
        self.free
            .lock()
            .expect("controller pool free-list lock poisoned")
            .push_back(self.index);
    }
}

/// A fixed-size pool of pre-built controllers sharing one topology view,
/// transport, and clock.
pub struct ControllerPool {
    controllers: Vec<RequestController>,
    free: Arc<Mutex<VecDeque<usize>>>,
}

impl fmt::Debug for ControllerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerPool")
            .field("capacity", &self.controllers.len())
            .field("free", &self.free.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl ControllerPool {
    pub fn new(
        capacity: usize,
        topology: Arc<dyn TopologyView>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        let free = Arc::new(Mutex::new((0..capacity).collect::<VecDeque<_>>()));
        let controllers = (0..capacity)
            .map(|index| {
                let release = Arc::new(PooledRelease {
                    index,
                    free: Arc::clone(&free),
                });
                RequestController::new(
                    Arc::clone(&topology),
                    Arc::clone(&transport),
                    Arc::clone(&clock),
                    timeout,
                    release,
                )
            })
            .collect();
        Self { controllers, free }
    }

    pub fn capacity(&self) -> usize {
        self.controllers.len()
    }

    /// Check out an idle controller to arm with a new request, or `None` if
    /// every controller in the pool is currently in flight.
    pub fn acquire(&mut self) -> Option<&mut RequestController> {
        let index = self
            .free
            .lock()
            .expect("controller pool free-list lock poisoned")
            .pop_front()?;
        Some(&mut self.controllers[index])
    }

    /// Drive every controller forward by one tick, per the cooperative
    /// runner contract: `step()` never blocks. Returns the total work units
    /// performed this pass, for callers that want to back off when the pool
    /// goes fully idle.
    pub fn step_all(&mut self) -> u32 {
        self.controllers.iter_mut().map(RequestController::step).sum()
    }
}
