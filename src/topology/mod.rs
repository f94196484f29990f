// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! A cached, mutable directory from logical destination to remote endpoint,
//! plus a non-blocking refresh primitive.
//!
//! `pick` is synchronous and lock-free: the cache lives behind an
//! [`arc_swap::ArcSwap`] snapshot pointer so readers never block on a
//! writer and never observe a partially-updated table, only ever the
//! previous complete snapshot or the next one. Discovering a *new*
//! snapshot (the actual topology-discovery wire round-trip) is out of
//! scope here; `CachedTopologyView` is constructed with a refresh closure
//! that performs it.

use arc_swap::ArcSwap;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// A transport-layer address identifying a cluster node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(pub SocketAddr);

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical destination a request resolves against. Command handlers
/// always use `Partition`; control-message handlers pick whichever variant
/// matches their message kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalRequest {
    Partition { topic: String, partition: i32 },
    Leader,
    Node(Endpoint),
    Random,
}

/// The directory contract the controller depends on.
pub trait TopologyView: Send + Sync + fmt::Debug {
    /// Resolve a logical destination to an endpoint, or `None` if unknown —
    /// the caller should refresh and retry.
    fn pick(&self, logical: &LogicalRequest) -> Option<Endpoint>;

    /// Schedule a refresh; returns a handle that is eventually done, with
    /// either success or an inner error retrievable via `get`.
    fn refresh_now(&self) -> Box<dyn RefreshHandle>;
}

/// A non-blocking handle to an outstanding topology refresh.
///
/// `is_done` takes `&mut self` because checking it is itself the poll —
/// there is no separate readiness notification.
pub trait RefreshHandle: Send {
    fn is_done(&mut self) -> bool;

    /// Retrieve the refresh outcome. Only meaningful once `is_done()` is
    /// true. A failed refresh is non-fatal to the controller — it is
    /// recovered locally by looping back to endpoint selection.
    fn get(&mut self) -> anyhow::Result<()>;
}

/// An already-resolved refresh handle, for topology implementations whose
/// refresh is itself synchronous (used heavily in tests).
pub struct ImmediateRefresh(pub Option<anyhow::Result<()>>);

impl ImmediateRefresh {
    pub fn ok() -> Self {
        Self(Some(Ok(())))
    }

    pub fn err(e: anyhow::Error) -> Self {
        Self(Some(Err(e)))
    }
}

impl RefreshHandle for ImmediateRefresh {
    fn is_done(&mut self) -> bool {
        true
    }

    fn get(&mut self) -> anyhow::Result<()> {
        self.0.take().unwrap_or(Ok(()))
    }
}

/// A refresh handle backed by a future spawned onto the tokio runtime,
/// polled non-blockingly via `try_recv`.
pub struct TaskRefresh {
    receiver: tokio::sync::oneshot::Receiver<anyhow::Result<()>>,
}

impl TaskRefresh {
    pub fn spawn<Fut>(refresh: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let outcome = refresh.await;
            let _ = tx.send(outcome);
        });
        Self { receiver: rx }
    }
}

impl RefreshHandle for TaskRefresh {
    fn is_done(&mut self) -> bool {
        !matches!(
            self.receiver.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Empty)
        )
    }

    fn get(&mut self) -> anyhow::Result<()> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("refresh task dropped its result before completion")),
        }
    }
}

/// The table `CachedTopologyView` hot-swaps on each successful refresh.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub partitions: HashMap<(String, i32), Endpoint>,
    pub leader: Option<Endpoint>,
    pub known: Vec<Endpoint>,
}

type RefreshFuture = Pin<Box<dyn Future<Output = anyhow::Result<Snapshot>> + Send>>;

/// A [`TopologyView`] whose cache is a snapshot table, hot-swapped on
/// refresh. `leader` serves `LogicalRequest::Leader`, `known` serves
/// `LogicalRequest::Random`.
pub struct CachedTopologyView {
    cache: Arc<ArcSwap<Snapshot>>,
    refresh: Arc<dyn Fn() -> RefreshFuture + Send + Sync>,
}

impl fmt::Debug for CachedTopologyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTopologyView")
            .field("cache", &self.cache.load())
            .finish()
    }
}

impl CachedTopologyView {
    pub fn new<F, Fut>(refresh: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Snapshot>> + Send + 'static,
    {
        Self {
            cache: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
            refresh: Arc::new(move || Box::pin(refresh())),
        }
    }

    /// Seed (or forcibly overwrite) the cache without going through
    /// `refresh_now` — used by tests and by initial startup.
    pub fn seed(&self, snapshot: Snapshot) {
        self.cache.store(Arc::new(snapshot));
    }
}

impl TopologyView for CachedTopologyView {
    fn pick(&self, logical: &LogicalRequest) -> Option<Endpoint> {
        let snapshot = self.cache.load();
        match logical {
            LogicalRequest::Partition { topic, partition } => {
                snapshot.partitions.get(&(topic.clone(), *partition)).copied()
            }
            LogicalRequest::Leader => snapshot.leader,
            LogicalRequest::Node(endpoint) => Some(*endpoint),
            LogicalRequest::Random => {
                if snapshot.known.is_empty() {
                    None
                } else {
                    let index = rand::thread_rng().gen_range(0..snapshot.known.len());
                    Some(snapshot.known[index])
                }
            }
        }
    }

    fn refresh_now(&self) -> Box<dyn RefreshHandle> {
        let cache = Arc::clone(&self.cache);
        let refresh = Arc::clone(&self.refresh);
        Box::new(TaskRefresh::spawn(async move {
            let snapshot = (refresh)().await?;
            cache.store(Arc::new(snapshot));
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_returns_none_for_unknown_partition() {
        let view = CachedTopologyView::new(|| async { Ok(Snapshot::default()) });
        let logical = LogicalRequest::Partition {
            topic: "orders".into(),
            partition: 0,
        };
        assert_eq!(view.pick(&logical), None);
    }

    #[test]
    fn seeded_partition_resolves() {
        let view = CachedTopologyView::new(|| async { Ok(Snapshot::default()) });
        let endpoint = Endpoint("127.0.0.1:9000".parse().unwrap());
        let mut snapshot = Snapshot::default();
        snapshot
            .partitions
            .insert(("orders".to_string(), 0), endpoint);
        view.seed(snapshot);
        let logical = LogicalRequest::Partition {
            topic: "orders".into(),
            partition: 0,
        };
        assert_eq!(view.pick(&logical), Some(endpoint));
    }

    #[test]
    fn node_logical_request_bypasses_cache() {
        let view = CachedTopologyView::new(|| async { Ok(Snapshot::default()) });
        let endpoint = Endpoint("10.0.0.1:9000".parse().unwrap());
        assert_eq!(view.pick(&LogicalRequest::Node(endpoint)), Some(endpoint));
    }

    #[tokio::test]
    async fn refresh_now_eventually_completes_and_updates_cache() {
        let endpoint = Endpoint("127.0.0.1:9100".parse().unwrap());
        let view = CachedTopologyView::new(move || {
            let mut snapshot = Snapshot::default();
            snapshot.leader = Some(endpoint);
            async move { Ok(snapshot) }
        });
        let mut handle = view.refresh_now();
        while !handle.is_done() {
            tokio::task::yield_now().await;
        }
        handle.get().unwrap();
        assert_eq!(view.pick(&LogicalRequest::Leader), Some(endpoint));
    }

    #[tokio::test]
    async fn failed_refresh_is_retrievable_as_an_error() {
        let view = CachedTopologyView::new(|| async { Err(anyhow::anyhow!("discovery unreachable")) });
        let mut handle = view.refresh_now();
        while !handle.is_done() {
            tokio::task::yield_now().await;
        }
        assert!(handle.get().is_err());
    }
}
