//! Scheduler for the request frontier and rate limiting
//!
//! This module handles:
//! - FIFO queueing of request descriptors produced by the driver
//! - Global concurrency limiting via a semaphore
//! - A minimum delay between two dispatched requests

use crate::config::CrawlerConfig;
use crate::crawler::request::RequestDescriptor;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A request cleared for dispatch
///
/// The permit must live as long as the fetch; dropping it frees a slot.
pub struct ScheduledFetch {
    pub descriptor: RequestDescriptor,
    pub permit: OwnedSemaphorePermit,
}

/// Frontier plus the limits that gate it
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    frontier: VecDeque<RequestDescriptor>,
    download_delay: Duration,
    last_dispatch: Option<Instant>,
}

impl Scheduler {
    pub fn new(config: &CrawlerConfig) -> Self {
        let max_concurrent = config.concurrent_requests.max(1) as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            frontier: VecDeque::new(),
            download_delay: Duration::from_millis(config.download_delay_ms),
            last_dispatch: None,
        }
    }

    pub fn add_to_frontier(&mut self, descriptor: RequestDescriptor) {
        self.frontier.push_back(descriptor);
    }

    pub fn extend<I: IntoIterator<Item = RequestDescriptor>>(&mut self, descriptors: I) {
        self.frontier.extend(descriptors);
    }

    /// Waits until the next request may be dispatched and returns it
    ///
    /// Waits for a free concurrency slot, then for the download delay since
    /// the previous dispatch. The frontier is only popped after both waits,
    /// so dropping the future loses nothing.
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledFetch)` - A request ready to fetch
    /// * `None` - The frontier is empty
    pub async fn next_request(&mut self) -> Option<ScheduledFetch> {
        if self.frontier.is_empty() {
            return None;
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        if let Some(last) = self.last_dispatch {
            let ready_at = last + self.download_delay;
            if ready_at > Instant::now() {
                tracing::trace!(
                    "Waiting {:?} before next dispatch",
                    ready_at - Instant::now()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let descriptor = self.frontier.pop_front()?;
        self.last_dispatch = Some(Instant::now());
        tracing::debug!("Dispatching {}", descriptor.url);

        Some(ScheduledFetch { descriptor, permit })
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.frontier.is_empty()
    }

    /// Fetches currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// True when nothing is queued and nothing is in flight
    pub fn is_idle(&self) -> bool {
        self.frontier.is_empty() && self.in_flight() == 0
    }

    /// Drops every queued request, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.frontier.len();
        self.frontier.clear();
        dropped
    }
}
