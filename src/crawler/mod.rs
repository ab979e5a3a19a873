//! Crawler module for listing traversal
//!
//! This module contains the core crawling logic, including:
//! - Building request descriptors with proxy credentials
//! - The event-driven traversal driver (pagination, detail pages, retries)
//! - HTTP fetching through per-proxy clients
//! - Request scheduling with a concurrency cap and download delay
//! - Overall run coordination

mod coordinator;
mod driver;
mod fetcher;
mod request;
mod scheduler;

pub use coordinator::{run_harvest, Coordinator, CrawlOutcome, StopReason};
pub use driver::{DriverOutput, TraversalDriver};
pub use fetcher::{build_http_client, FetchFailure, FetchResponse, Fetcher};
pub use request::{RequestBuilder, RequestContext, RequestDescriptor, RequestKind};
pub use scheduler::{ScheduledFetch, Scheduler};
