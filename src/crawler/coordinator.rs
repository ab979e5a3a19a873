//! Crawl coordinator - the run loop and the end-to-end harvest
//!
//! The coordinator owns the only mutable run state. Fetches run as tokio
//! tasks, but their outcomes are applied one at a time on the coordinator's
//! task, so counters and the dedupe set never need locking.
//!
//! [`run_harvest`] wraps the loop with everything around it: input loading,
//! the output sink, the summary, storage uploads and the notification.

use crate::config::{validate_run, Config, CrawlerConfig, RunParams};
use crate::crawler::driver::TraversalDriver;
use crate::crawler::fetcher::{FetchFailure, FetchResponse, Fetcher};
use crate::crawler::request::RequestDescriptor;
use crate::crawler::scheduler::{ScheduledFetch, Scheduler};
use crate::extract::{Extractor, Provenance};
use crate::input::{load_proxies, load_terms};
use crate::notify::{compose_message, resolve_recipients, MailgunNotifier, Notifier};
use crate::output::{
    finalize, CsvSink, OutputLocations, RecordSink, RunLayout, RunSummary, RunTiming,
    SummaryContext,
};
use crate::sites::policy_for;
use crate::state::{RunState, SearchTerms};
use crate::storage::{open_store, ObjectStore};
use crate::ConfigError;
use chrono::Utc;
use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Why the run loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Nothing left to fetch
    Finished,
    /// The shutdown signal fired
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of the run loop
#[derive(Debug)]
pub struct CrawlOutcome {
    pub state: RunState,
    pub reason: StopReason,
}

type FetchOutcome = (RequestDescriptor, Result<FetchResponse, FetchFailure>);

/// Main crawler coordinator structure
pub struct Coordinator {
    driver: TraversalDriver,
    scheduler: Scheduler,
    fetcher: Arc<Fetcher>,
}

impl Coordinator {
    /// Creates a coordinator around a prepared driver
    pub fn new(config: &CrawlerConfig, driver: TraversalDriver) -> Self {
        Self {
            driver,
            scheduler: Scheduler::new(config),
            fetcher: Arc::new(Fetcher::new(Duration::from_secs(
                config.request_timeout_secs,
            ))),
        }
    }

    /// Runs every traversal for `terms` until the work runs out or
    /// `shutdown` completes
    ///
    /// Records go to `sink` as soon as the driver produces them. A sink
    /// failure is logged and the run continues. On shutdown, queued
    /// requests are discarded and in-flight fetches are aborted.
    pub async fn run<F>(
        mut self,
        terms: &[SearchTerms],
        sink: &mut dyn RecordSink,
        shutdown: F,
    ) -> CrawlOutcome
    where
        F: Future<Output = ()>,
    {
        let seeded = self.driver.start(terms);
        self.scheduler.extend(seeded.requests);

        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        let mut pages_handled: u64 = 0;
        let start_time = Instant::now();
        tokio::pin!(shutdown);

        let reason = loop {
            if self.scheduler.is_idle() && tasks.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break StopReason::Finished;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::warn!("Shutdown requested, stopping dispatch");
                    break StopReason::Cancelled;
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok((descriptor, result)) => {
                            self.apply(descriptor, result, sink);
                            pages_handled += 1;
                        }
                        Err(e) => tracing::error!("Fetch task failed: {}", e),
                    }

                    if pages_handled > 0 && pages_handled % 10 == 0 {
                        let rate = pages_handled as f64 / start_time.elapsed().as_secs_f64();
                        tracing::info!(
                            "Progress: {} pages handled, {} queued, {} in flight, {:.2} pages/sec",
                            pages_handled,
                            self.scheduler.frontier_size(),
                            tasks.len(),
                            rate
                        );
                    }
                }

                Some(scheduled) = self.scheduler.next_request(), if self.scheduler.has_pending() => {
                    let fetcher = Arc::clone(&self.fetcher);
                    tasks.spawn(async move {
                        let ScheduledFetch { descriptor, permit } = scheduled;
                        let result = fetcher.fetch(&descriptor).await;
                        drop(permit);
                        (descriptor, result)
                    });
                }
            }
        };

        if reason == StopReason::Cancelled {
            let dropped = self.scheduler.clear();
            tracing::info!(
                "Discarded {} queued and {} in-flight request(s)",
                dropped,
                tasks.len()
            );
            tasks.shutdown().await;
        }

        if let Err(e) = sink.flush() {
            tracing::warn!("Failed to flush output: {}", e);
        }

        let (done, abandoned) = self.driver.state().traversal_outcomes();
        tracing::info!(
            "Crawl {}: {} pages in {:?}, {} traversal(s) done, {} abandoned",
            reason,
            pages_handled,
            start_time.elapsed(),
            done,
            abandoned
        );

        CrawlOutcome {
            state: self.driver.into_state(),
            reason,
        }
    }

    fn apply(
        &mut self,
        descriptor: RequestDescriptor,
        result: Result<FetchResponse, FetchFailure>,
        sink: &mut dyn RecordSink,
    ) {
        let RequestDescriptor { url, context, .. } = descriptor;
        let output = match result {
            Ok(response) => self.driver.on_response(url, context, response),
            Err(failure) => self.driver.on_failure(url, context, failure),
        };

        self.scheduler.extend(output.requests);
        for record in &output.records {
            if let Err(e) = sink.write_record(record) {
                tracing::warn!("Failed to write record {}: {}", record.listing_id, e);
            }
        }
    }
}

/// Where records are written while the run is in progress
enum CsvTarget {
    Local(CsvSink<BufWriter<File>>),
    Buffered(CsvSink<Vec<u8>>),
}

impl CsvTarget {
    fn sink(&mut self) -> &mut dyn RecordSink {
        match self {
            Self::Local(sink) => sink,
            Self::Buffered(sink) => sink,
        }
    }

    fn written(&self) -> u64 {
        match self {
            Self::Local(sink) => sink.written(),
            Self::Buffered(sink) => sink.written(),
        }
    }
}

/// Runs one complete harvest: validate, crawl, summarize, publish, notify
///
/// Configuration and input problems fail before any request is issued.
/// Once the crawl has started, storage and notification failures are logged
/// and the summary is still returned.
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished or was cancelled
/// * `Err(HarvestError)` - Invalid configuration, inputs or output location
pub async fn run_harvest<F>(
    config: &Config,
    params: &RunParams,
    shutdown: F,
) -> crate::Result<RunSummary>
where
    F: Future<Output = ()>,
{
    let site = params.site;
    validate_run(params, config, site.uses_search_terms())?;

    let (whats, wheres) = match (&params.what_file, &params.where_file) {
        (Some(what), Some(place)) if site.uses_search_terms() => (
            load_terms(what).map_err(ConfigError::from)?,
            load_terms(place).map_err(ConfigError::from)?,
        ),
        _ => (Vec::new(), Vec::new()),
    };
    let rotator = load_proxies(&params.proxies_file).map_err(ConfigError::from)?;
    let policy = policy_for(site, config.site.base_url.as_deref())?;

    let store = match (&config.storage, params.save_to_storage) {
        (Some(storage), true) => Some(open_store(storage)?),
        _ => None,
    };

    let started = Utc::now();
    let run_id = format!("{}-{}", site.scraper_name(), started.format("%Y%m%dT%H%M%SZ"));
    let dir_name = params.dir_name.as_deref().unwrap_or_default();
    let layout = RunLayout::new(
        &config.output.base_dir,
        site,
        dir_name,
        &params.output_file,
        &params.summary_file,
    );

    let mut target = match store {
        Some(_) => CsvTarget::Buffered(CsvSink::in_memory()?),
        None => CsvTarget::Local(CsvSink::create(&layout.output_path)?),
    };

    let provenance = Provenance {
        scraper_name: site.scraper_name().to_string(),
        source: params.source.clone(),
        run_id: run_id.clone(),
        default_country: site.default_country().to_string(),
    };
    let extractor = Extractor::new(provenance, params.category_matching);
    let driver = TraversalDriver::new(
        policy,
        extractor,
        RunState::new(rotator),
        config.crawler.max_attempts,
    );
    let terms = driver.traversal_terms(&whats, &wheres);

    tracing::info!(
        "Run {} on {}: {} traversal(s), output in {}",
        run_id,
        site,
        terms.len(),
        layout.dir.display()
    );

    let coordinator = Coordinator::new(&config.crawler, driver);
    let outcome = coordinator.run(&terms, target.sink(), shutdown).await;
    let finished = Utc::now();

    let written_items = target.written();
    let store_ref = store.as_ref().map(|s| s as &dyn ObjectStore);
    let mut locations = publish_records(target, &layout, store_ref).await;
    plan_summary_location(&mut locations, &layout, store_ref);

    let summary = finalize(
        &outcome.state.counters,
        &whats,
        &wheres,
        RunTiming { started, finished },
        outcome.reason.as_str(),
        SummaryContext {
            run_id,
            scraper_name: site.scraper_name().to_string(),
            source: params.source.clone(),
            category_matching: params.category_matching,
            locations,
            written_items,
        },
    );

    publish_summary(&summary, &layout, store_ref).await;
    notify(config, params, &summary).await;

    Ok(summary)
}

/// Finishes the CSV, uploading it when a store is configured
///
/// A failed upload falls back to writing the buffered CSV locally.
async fn publish_records(
    target: CsvTarget,
    layout: &RunLayout,
    store: Option<&dyn ObjectStore>,
) -> OutputLocations {
    let local = layout.output_path.display().to_string();

    let bytes = match target {
        CsvTarget::Local(sink) => {
            if let Err(e) = sink.into_inner() {
                tracing::error!("Failed to finish {}: {}", local, e);
            }
            return OutputLocations {
                output_file: local,
                ..OutputLocations::default()
            };
        }
        CsvTarget::Buffered(sink) => match sink.into_inner() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to finish buffered output: {}", e);
                return OutputLocations::default();
            }
        },
    };

    let Some(store) = store else {
        return write_local_copy(&bytes, layout);
    };

    let key = layout.output_key();
    match store.put_object(&key, bytes.clone(), CSV_CONTENT_TYPE).await {
        Ok(()) => {
            tracing::info!("Uploaded output to {}", store.location(&key));
            OutputLocations {
                output_file: store.location(&key),
                output_url: Some(store.public_url(&key)),
                ..OutputLocations::default()
            }
        }
        Err(e) => {
            tracing::error!("Failed to upload output: {}", e);
            write_local_copy(&bytes, layout)
        }
    }
}

fn write_local_copy(bytes: &[u8], layout: &RunLayout) -> OutputLocations {
    let local = layout.output_path.display().to_string();
    let written = std::fs::create_dir_all(&layout.dir)
        .and_then(|_| std::fs::write(&layout.output_path, bytes));

    match written {
        Ok(()) => tracing::info!("Kept a local copy of the output at {}", local),
        Err(e) => tracing::error!("Failed to write {}: {}", local, e),
    }

    OutputLocations {
        output_file: local,
        ..OutputLocations::default()
    }
}

/// Fills in where the summary is about to be written
fn plan_summary_location(
    locations: &mut OutputLocations,
    layout: &RunLayout,
    store: Option<&dyn ObjectStore>,
) {
    match store {
        Some(store) => {
            let key = layout.summary_key();
            locations.summary_file = store.location(&key);
            locations.summary_url = Some(store.public_url(&key));
        }
        None => locations.summary_file = layout.summary_path.display().to_string(),
    }
}

async fn publish_summary(summary: &RunSummary, layout: &RunLayout, store: Option<&dyn ObjectStore>) {
    if let Some(store) = store {
        let key = layout.summary_key();
        let uploaded = match summary.to_json_bytes() {
            Ok(bytes) => store
                .put_object(&key, bytes, JSON_CONTENT_TYPE)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match uploaded {
            Ok(()) => {
                tracing::info!("Uploaded summary to {}", store.location(&key));
                return;
            }
            Err(e) => tracing::error!("Failed to upload summary: {}", e),
        }
    }

    match summary.write_to(&layout.summary_path) {
        Ok(()) => tracing::info!("Wrote summary to {}", layout.summary_path.display()),
        Err(e) => tracing::error!(
            "Failed to write summary {}: {}",
            layout.summary_path.display(),
            e
        ),
    }
}

/// Sends the completion notification when anyone is listening
async fn notify(config: &Config, params: &RunParams, summary: &RunSummary) {
    let configured = config
        .notify
        .as_ref()
        .map(|notify| notify.recipients.clone())
        .unwrap_or_default();
    let env_default = std::env::var("NOTIFY_TO").ok();
    let recipients = resolve_recipients(&params.notify_to, &configured, env_default.as_deref());

    if recipients.is_empty() {
        tracing::debug!("No notification recipients, skipping notification");
        return;
    }

    let Some(notify_config) = &config.notify else {
        tracing::warn!(
            "{} notification recipient(s) but no [notify] table, skipping notification",
            recipients.len()
        );
        return;
    };

    let notifier = match MailgunNotifier::from_config(notify_config) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!("Cannot send notification: {}", e);
            return;
        }
    };

    let (subject, text) = compose_message(summary);
    if let Err(e) = notifier.send(&subject, &text, &recipients).await {
        tracing::error!("Notification failed: {}", e);
    }
}
