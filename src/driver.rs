//! Batch driver: one work item at a time, request to durable record.
//!
//! Per item the driver moves through
//! `Idle -> Dispatching -> AwaitingStream -> Recording -> Idle`, or
//! `AwaitingStream -> Failed -> Idle` when the call or the stream fails.
//! A failed item is logged and skipped; it never ends the run. The record for
//! item *n* is persisted before item *n + 1* is dispatched.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::candidates::WorkItem;
use crate::client::GenerationService;
use crate::decoder::decode_events;
use crate::error::ItemError;
use crate::metrics::MetricsReducer;
use crate::request::{GenerationRequest, RequestDefaults};
use crate::sink::{BatchRecord, ResultSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    Dispatching,
    AwaitingStream,
    Recording,
    Failed,
    Done,
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Records durably written.
    pub recorded: usize,
    /// Items skipped because of an [`ItemError`].
    pub failed: usize,
    /// Items processed but whose record could not be written.
    pub sink_failures: usize,
    /// Stopped before the candidates were exhausted.
    pub cancelled: bool,
}

pub struct BatchDriver<G, S> {
    service: G,
    sink: S,
    root_dir: PathBuf,
    defaults: RequestDefaults,
    cancel: CancellationToken,
    state: DriverState,
}

impl<G, S> BatchDriver<G, S>
where
    G: GenerationService,
    S: ResultSink,
{
    pub fn new(service: G, sink: S, root_dir: impl Into<PathBuf>, defaults: RequestDefaults) -> Self {
        Self {
            service,
            sink,
            root_dir: root_dir.into(),
            defaults,
            cancel: CancellationToken::new(),
            state: DriverState::Idle,
        }
    }

    /// Stop the run when `token` is cancelled. The in-flight item is dropped
    /// without a record. No timeout is ever derived from this.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "Driver state change");
        self.state = next;
    }

    /// Process every item in order and report the totals.
    pub async fn run<I>(&mut self, items: I) -> RunSummary
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!("Execution started at: {}", started_at.to_rfc3339());

        let mut summary = RunSummary {
            started_at,
            finished_at: started_at,
            elapsed: Duration::ZERO,
            recorded: 0,
            failed: 0,
            sink_failures: 0,
            cancelled: false,
        };

        for item in items {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            self.transition(DriverState::Dispatching);
            match self.process(&item).await {
                Ok(record) => {
                    self.transition(DriverState::Recording);
                    match self.sink.append(&record) {
                        Ok(()) => {
                            summary.recorded += 1;
                            info!("Saved progress after processing {}", item.path.display());
                        }
                        Err(e) => {
                            summary.sink_failures += 1;
                            error!(
                                "Failed to save results after processing {}: {}",
                                item.path.display(),
                                e
                            );
                        }
                    }
                }
                Err(ItemError::Cancelled) => {
                    self.transition(DriverState::Failed);
                    warn!("Cancelled while processing {}", item.path.display());
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    self.transition(DriverState::Failed);
                    summary.failed += 1;
                    error!("Failed to send request for {}: {}", item.path.display(), e);
                }
            }
            self.transition(DriverState::Idle);
        }

        self.transition(DriverState::Done);
        summary.finished_at = Utc::now();
        summary.elapsed = clock.elapsed();
        info!("Execution completed at: {}", summary.finished_at.to_rfc3339());
        info!("Total Execution Time: {:?}", summary.elapsed);
        summary
    }

    /// Run one item through request, stream and reduction. Nothing is
    /// persisted here.
    ///
    /// Everything logged meanwhile, field warnings included, carries an
    /// `item` span naming the file.
    pub async fn process(&mut self, item: &WorkItem) -> Result<BatchRecord, ItemError> {
        let span = info_span!("item", file = %item.relative_path.display());
        self.process_item(item).instrument(span).await
    }

    async fn process_item(&mut self, item: &WorkItem) -> Result<BatchRecord, ItemError> {
        let request = GenerationRequest::build(item, &self.root_dir, &self.defaults);

        let start_time = Utc::now();
        let clock = Instant::now();
        info!(
            start_time = %start_time.to_rfc3339(),
            "Processing file: {}",
            item.path.display()
        );

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ItemError::Cancelled),
            body = self.service.open(&request) => body?,
        };
        self.transition(DriverState::AwaitingStream);

        info!("Streaming response for {}", item.path.display());
        let mut events = Box::pin(decode_events(body));
        let mut reducer = MetricsReducer::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ItemError::Cancelled),
                next = events.next() => next,
            };
            match next {
                Some(Ok(event)) => {
                    debug!(data_type = event.kind(), "Received event");
                    reducer.apply(&event);
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }
        info!("Stream ended.");

        let elapsed = clock.elapsed();
        let end_time = Utc::now();
        info!(
            end_time = %end_time.to_rfc3339(),
            duration = ?elapsed,
            "Finished processing file: {}",
            item.path.display()
        );

        Ok(BatchRecord {
            file_path: item.relative_path.display().to_string(),
            metrics: reducer.finish(),
            elapsed,
            start_time,
            end_time: Some(end_time),
        })
    }
}
