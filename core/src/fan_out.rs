//! Bounded-concurrency scan over a fixed range of pages.
//!
//! # Design
//! One producer task queues page indices `0..pages` into a bounded channel.
//! `workers` spawned tasks pull indices from that queue until it is empty and
//! call the page fetcher once per index. Items are pushed, in page order, into
//! a bounded output channel; failures go to a side channel.
//!
//! Each worker holds a sender for both channels, so the output closes exactly
//! when the last worker returns. There is no ordering across pages, and an
//! empty page does not stop the scan: every index in the range is requested.
//! Workers check for a dropped consumer before pulling each page.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::ClientError;

const DEFAULT_OUTPUT_CAPACITY: usize = 64;

/// A page whose request failed. Its items are not in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page: u32,
    pub error: ClientError,
}

/// Worker pool settings for a page scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    workers: usize,
    output_capacity: usize,
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(4)
    }
}

impl FanOut {
    /// A pool of `workers` concurrent fetchers (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }

    /// How many items may wait for the consumer before workers block.
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch pages `0..pages` with `fetch` and merge their items.
    ///
    /// `fetch` receives a child of `ctx` for every page: cancelling `ctx`
    /// stops all pending page calls, while one page failing leaves the others
    /// running. Must be called from within a Tokio runtime.
    pub fn scan<T, F, Fut>(&self, ctx: &Context, pages: u32, fetch: F) -> PageScan<T>
    where
        T: Send + 'static,
        F: Fn(Context, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, ClientError>> + Send + 'static,
    {
        let (task_tx, task_rx) = mpsc::channel::<u32>(pages.max(1) as usize);
        tokio::spawn(async move {
            for page in 0..pages {
                if task_tx.send(page).await.is_err() {
                    break;
                }
            }
        });

        let task_rx = Arc::new(Mutex::new(task_rx));
        let fetch = Arc::new(fetch);
        let (item_tx, item_rx) = mpsc::channel(self.output_capacity);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        for worker in 0..self.workers {
            let task_rx = Arc::clone(&task_rx);
            let fetch = Arc::clone(&fetch);
            let item_tx = item_tx.clone();
            let failure_tx = failure_tx.clone();
            let ctx = ctx.clone();

            tokio::spawn(async move {
                loop {
                    if item_tx.is_closed() {
                        debug!(worker, "consumer gone, stopping");
                        return;
                    }
                    let next = task_rx.lock().await.recv().await;
                    let Some(page) = next else { break };

                    match fetch(ctx.child(), page).await {
                        Ok(items) if items.is_empty() => {
                            debug!(worker, page, "page has no items");
                        }
                        Ok(items) => {
                            for item in items {
                                if item_tx.send(item).await.is_err() {
                                    debug!(worker, page, "consumer gone, stopping");
                                    return;
                                }
                            }
                        }
                        Err(error) => {
                            warn!(worker, page, %error, "page fetch failed");
                            if failure_tx.send(PageFailure { page, error }).is_err() {
                                debug!(worker, page, "consumer gone, stopping");
                                return;
                            }
                        }
                    }
                }
                debug!(worker, "no pages left");
            });
        }

        PageScan {
            items: item_rx,
            failures: failure_rx,
        }
    }
}

/// The merged output of [`FanOut::scan`].
///
/// Dropping it stops the workers after their current page.
pub struct PageScan<T> {
    items: mpsc::Receiver<T>,
    failures: mpsc::UnboundedReceiver<PageFailure>,
}

impl<T> PageScan<T> {
    /// Next item from any page; `None` once every worker has finished.
    pub async fn recv(&mut self) -> Option<T> {
        self.items.recv().await
    }

    /// Drain what is left and return the failed pages, sorted by index.
    pub async fn finish(mut self) -> Vec<PageFailure> {
        while self.items.recv().await.is_some() {}
        let mut failures = Vec::new();
        while let Some(failure) = self.failures.recv().await {
            failures.push(failure);
        }
        failures.sort_by_key(|f| f.page);
        failures
    }

    /// Collect every item and every failure.
    pub async fn collect(mut self) -> (Vec<T>, Vec<PageFailure>) {
        let mut items = Vec::new();
        while let Some(item) = self.items.recv().await {
            items.push(item);
        }
        let failures = self.finish().await;
        (items, failures)
    }
}
