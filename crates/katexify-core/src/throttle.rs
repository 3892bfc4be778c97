//! Spacing between mutating calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::model::{Block, BlockId, BlockUpdate, NewBlock};
use crate::store::{ChildPage, TreeStore};

/// Gap kept between two writes unless configured otherwise.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(350);

/// Serializes calls and keeps at least `interval` between the end of one and
/// the start of the next.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        let output = call.await;
        *last = Some(Instant::now());
        output
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_INTERVAL)
    }
}

/// Paces the writes of a store. Reads pass straight through.
pub struct PacedStore<S> {
    inner: S,
    throttle: Throttle,
}

impl<S> PacedStore<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            throttle: Throttle::new(interval),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TreeStore + Sync> TreeStore for PacedStore<S> {
    async fn list_children(
        &self,
        parent: &BlockId,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError> {
        self.inner.list_children(parent, cursor).await
    }

    async fn append_child(
        &self,
        parent: &BlockId,
        block: &NewBlock,
        after: Option<&BlockId>,
    ) -> Result<Block, StoreError> {
        self.throttle
            .run(self.inner.append_child(parent, block, after))
            .await
    }

    async fn update_block(&self, id: &BlockId, update: &BlockUpdate) -> Result<(), StoreError> {
        self.throttle.run(self.inner.update_block(id, update)).await
    }

    async fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        self.throttle.run(self.inner.delete_block(id)).await
    }
}
