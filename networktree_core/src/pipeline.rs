//! Three-stage ingestion: read records, expand and resolve them in
//! parallel, insert them from a single consumer.
//!
//! ```text
//! [reader thread] --records--> [worker pool] --batches--> [caller: insert]
//! ```
//!
//! Both queues are bounded, so a slow consumer stalls the workers and a
//! stalled pool stalls the reader. The calling thread is the only one that
//! takes the tree's write lock.

use crate::annotation::{Annotation, GeoRecord, Position};
use crate::constants::{DEFAULT_QUEUE_CAPACITY, UNKNOWN_COUNTRY};
use crate::errors::{Error, Result};
use crate::geolite::LocationTable;
use crate::helpers::{covering_networks, prefix_size, range_end, Family};
use crate::positions::coarse_position;
use crate::shared::SharedTree;
use crate::telemetry::IngestCounters;
use crate::types::InsertTally;
use crossbeam_channel::bounded;
use ipnet::IpNet;
use log::{debug, info, warn};
use metrics::counter;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Size of an announced range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extent {
    /// Number of addresses starting at the record's start address.
    Count(u128),
    /// A prefix length; the range is one prefix-sized block from the start.
    PrefixLen(u8),
}

/// Key resolved into an [`Annotation`] by the worker pool.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKey {
    Country(String),
    Location {
        primary: String,
        fallback: String,
        latitude: Option<f64>,
        longitude: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeRecord {
    pub start: IpAddr,
    pub extent: Extent,
    pub key: GeoKey,
}

impl RangeRecord {
    /// Minimal CIDR cover of the record's range; empty if the range
    /// does not fit the address family.
    pub fn networks(&self) -> Vec<IpNet> {
        let end = match self.extent {
            Extent::Count(count) => range_end(self.start, count),
            Extent::PrefixLen(len) => match prefix_size(Family::of_addr(&self.start), len) {
                Some(size) => range_end(self.start, size),
                // a /0 of the whole family
                None => IpNet::new(self.start, len).ok().map(|n| n.broadcast()),
            },
        };
        end.map(|end| covering_networks(self.start, end))
            .unwrap_or_default()
    }
}

/// Turns record keys into annotations.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    locations: Option<Arc<LocationTable>>,
}

impl Resolver {
    /// Resolver for country-keyed records only.
    pub fn countries() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: Arc<LocationTable>) -> Self {
        Self {
            locations: Some(locations),
        }
    }

    /// Unrecognized keys are errors: the static tables are out of step
    /// with the data source.
    pub fn resolve(&self, key: &GeoKey) -> Result<Annotation> {
        match key {
            GeoKey::Country(code) => {
                if code.is_empty() || code == UNKNOWN_COUNTRY {
                    return Ok(Annotation::Empty);
                }
                let position =
                    coarse_position(code).ok_or_else(|| Error::UnknownCountry(code.clone()))?;
                Ok(Annotation::geo(GeoRecord::country(code.as_str(), Some(position))))
            }
            GeoKey::Location {
                primary,
                fallback,
                latitude,
                longitude,
            } => {
                let unknown = || Error::UnknownLocation {
                    primary: primary.clone(),
                    fallback: fallback.clone(),
                };
                let table = self.locations.as_ref().ok_or_else(unknown)?;
                let location = table
                    .get(primary)
                    .or_else(|| table.get(fallback))
                    .ok_or_else(unknown)?;
                let position = match (latitude, longitude) {
                    (Some(lat), Some(lon)) => Position::new(*lat, *lon),
                    _ => coarse_position(&location.country_iso)
                        .ok_or_else(|| Error::UnknownCountry(location.country_iso.clone()))?,
                };
                Ok(Annotation::geo(GeoRecord {
                    country: location.country_iso.clone(),
                    position: Some(position),
                    location: Some(location.clone()),
                }))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Cooperative stop signal. Reading stops; records already queued are
/// still expanded and inserted, leaving the tree consistent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub records: u64,
    pub tally: InsertTally,
    pub cancelled: bool,
}

struct Batch {
    networks: Vec<IpNet>,
    annotation: Annotation,
}

pub struct Pipeline {
    config: PipelineConfig,
    counters: Arc<IngestCounters>,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            counters: IngestCounters::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_counters(mut self, counters: Arc<IngestCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain `source` into `tree`. Returns on exhaustion, cancellation, a
    /// source error, the first unresolvable key, or a full tree. The size
    /// gauges are emitted before returning, whatever the outcome.
    pub fn run<I>(&self, source: I, resolver: &Resolver, tree: &SharedTree) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<RangeRecord>>,
        I::IntoIter: Send,
    {
        let workers = self.config.workers.max(1);
        let capacity = self.config.queue_capacity;
        let (record_tx, record_rx) = bounded::<RangeRecord>(capacity);
        let (batch_tx, batch_rx) = bounded::<Result<Batch>>(capacity);
        let source = source.into_iter();
        let counters = &self.counters;
        let cancel = &self.cancel;

        std::thread::scope(|scope| {
            let reader = scope.spawn(move || -> Result<u64> {
                let mut read = 0;
                for item in source {
                    if cancel.is_cancelled() {
                        warn!("[INGEST] cancelled after {} records", read);
                        break;
                    }
                    let record = item?;
                    read += 1;
                    counters.add_records(1);
                    if record_tx.send(record).is_err() {
                        // consumer gave up
                        break;
                    }
                }
                Ok(read)
            });

            let pool: Vec<_> = (0..workers)
                .map(|_| {
                    let records = record_rx.clone();
                    let batches = batch_tx.clone();
                    scope.spawn(move || {
                        for record in records.iter() {
                            let batch = resolver.resolve(&record.key).map(|annotation| Batch {
                                networks: record.networks(),
                                annotation,
                            });
                            let fatal = batch.is_err();
                            if batches.send(batch).is_err() || fatal {
                                break;
                            }
                        }
                    })
                })
                .collect();
            drop(record_rx);
            drop(batch_tx);

            let mut report = IngestReport::default();
            let mut failure = None;
            for batch in batch_rx.iter() {
                match batch {
                    Ok(batch) => {
                        if batch.networks.is_empty() {
                            continue;
                        }
                        let tally = match tree.insert_all(&batch.networks, &batch.annotation) {
                            Ok(tally) => tally,
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        };
                        counters.add_tally(&tally);
                        counter!("networktree_records_total").increment(1);
                        counter!("networktree_prefixes_inserted_total").increment(tally.total());
                        report.tally.merge(tally);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            // unblocks any worker or reader still sending
            drop(batch_rx);

            let mut panicked = false;
            for worker in pool {
                panicked |= worker.join().is_err();
            }
            let read = reader.join();
            tree.read().report_metrics();

            if let Some(e) = failure {
                return Err(e);
            }
            report.records = match read {
                Ok(read) => read?,
                Err(_) => return Err(Error::WorkerPanicked),
            };
            if panicked {
                return Err(Error::WorkerPanicked);
            }
            report.cancelled = cancel.is_cancelled();
            info!(
                "[INGEST] {} records, {} prefixes ({} created, {} upgraded, {} unchanged)",
                report.records,
                report.tally.total(),
                report.tally.created,
                report.tally.upgraded,
                report.tally.unchanged
            );
            debug!("[INGEST] tree now holds {} networks", tree.len());
            Ok(report)
        })
    }
}
