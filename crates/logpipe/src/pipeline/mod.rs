//! Object scheduling and the per-object delivery pipeline.
//!
//! The scheduler runs the full pipeline (fetch, decompress, decode,
//! distribute) for each source object, at most [`MAX_CONCURRENT_OBJECTS`] at
//! a time. A failure in one object never aborts or skips another; every
//! failure is collected into one aggregate error returned after the last
//! object completes.

use std::io::BufReader;
use std::sync::Arc;

use snafu::prelude::*;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::decode::decode_records;
use crate::decode::fields::FieldTable;
use crate::error::{
    AggregateError, AggregateSnafu, DecodeError, FetchSnafu, ListSnafu, ObjectError,
    ObjectFailure, RunError,
};
use crate::sink::Sink;
use crate::sink::batch::MAX_BATCH_COUNT;
use crate::source::s3::parse_s3_url;
use crate::source::{ObjectStore, SourceObject, compression, event::ObjectCreatedEvent};

/// Maximum number of object pipelines executing concurrently.
pub const MAX_CONCURRENT_OBJECTS: usize = 10;

/// Per-sink record queue capacity: 1.25x the batch count ceiling, so
/// decoding does not block under normal backpressure.
const QUEUE_CAPACITY: usize = MAX_BATCH_COUNT + MAX_BATCH_COUNT / 4;

/// Runs the delivery pipeline over source objects with bounded parallelism.
///
/// Cheap to clone; clones share the store, sinks, and field table.
#[derive(Clone)]
pub struct LogPipeline {
    store: Arc<dyn ObjectStore>,
    sinks: Vec<Arc<dyn Sink>>,
    fields: Arc<FieldTable>,
}

impl LogPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sinks: Vec<Arc<dyn Sink>>,
        fields: Arc<FieldTable>,
    ) -> Self {
        Self {
            store,
            sinks,
            fields,
        }
    }

    /// Process every object under an `s3://bucket/prefix` URL (one-shot
    /// mode).
    pub async fn process_url(&self, url: &str) -> Result<(), RunError> {
        let (bucket, prefix) = parse_s3_url(url).context(ListSnafu)?;
        let objects = self
            .store
            .list(&bucket, &prefix)
            .await
            .context(ListSnafu)?;
        info!(url, count = objects.len(), "listed source objects");
        self.process_objects(objects).await.context(AggregateSnafu)
    }

    /// Process the objects named by an object-created notification.
    pub async fn process_event(&self, event: &ObjectCreatedEvent) -> Result<(), AggregateError> {
        self.process_objects(event.objects()).await
    }

    /// Process every object, at most [`MAX_CONCURRENT_OBJECTS`] at a time.
    ///
    /// All objects are attempted independently; returns only after each one
    /// has completed, with every failure aggregated.
    pub async fn process_objects(&self, objects: Vec<SourceObject>) -> Result<(), AggregateError> {
        let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_OBJECTS));
        let mut tasks: JoinSet<Option<ObjectFailure>> = JoinSet::new();

        for object in objects {
            let permit = Arc::clone(&gate)
                .acquire_owned()
                .await
                .expect("admission gate is never closed");
            let pipeline = self.clone();

            tasks.spawn(async move {
                let result = pipeline.process_object(&object).await;
                drop(permit);
                info!(%object, "completed processing");
                result
                    .err()
                    .map(|source| ObjectFailure { object, source })
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(failure)) => {
                    error!(error = %failure, "object pipeline failed");
                    failures.push(failure);
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "object pipeline panicked"),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(failures))
        }
    }

    /// Run the full pipeline for one object: fetch, decompress, decode,
    /// distribute to every sink.
    async fn process_object(&self, object: &SourceObject) -> Result<(), ObjectError> {
        info!(%object, "processing logs");

        let compressed = self.store.fetch(object).await.context(FetchSnafu)?;

        // One bounded queue and one worker per sink; workers start before
        // decoding so backpressure applies from the first record.
        let mut queues = Vec::with_capacity(self.sinks.len());
        let mut workers = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
            queues.push(tx);
            let sink = Arc::clone(sink);
            workers.push(tokio::spawn(async move { sink.consume(rx).await }));
        }

        let reader = BufReader::new(compression::decompress(compressed));
        let fields = Arc::clone(&self.fields);
        let decoded =
            tokio::task::spawn_blocking(move || decode_records(reader, &fields, &queues)).await;

        // The senders were moved into the decode task and are gone now, so
        // every queue is closed; wait for each worker to drain and return.
        for worker in workers {
            if let Err(e) = worker.await {
                error!(%object, error = %e, "sink worker panicked");
            }
        }

        match decoded {
            Ok(Ok(count)) => {
                debug!(%object, records = count, "decoded records");
                Ok(())
            }
            // Stream read failures are decompression failures: the only
            // reader feeding the decoder is the decompression bridge.
            Ok(Err(DecodeError::Read { source })) => Err(ObjectError::Decompress { source }),
            Ok(Err(source)) => Err(ObjectError::Decode { source }),
            Err(source) => Err(ObjectError::Task { source }),
        }
    }
}
