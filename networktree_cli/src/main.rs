//! `networktree`: build a prefix forest from RIR delegation extracts and
//! GeoLite2 CSV files, then write it out as JSON.
//!
//! ```bash
//! networktree \
//!   --registry delegated-arin-extended-latest \
//!   --registry delegated-ripencc-extended-latest \
//!   --geolite-locations GeoLite2-City-Locations-en.csv \
//!   --geolite-blocks GeoLite2-City-Blocks-IPv4.csv \
//!   --output output.json
//! ```
//!
//! Ctrl-C stops reading, lets queued records finish, writes whatever has
//! been built so far and exits with status 1.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, error, info, warn};
use networktree_core::export::{write_json, JsonLayout};
use networktree_core::geolite::{GeoliteBlocksReader, LocationTable};
use networktree_core::pipeline::{Pipeline, PipelineConfig, Resolver};
use networktree_core::registry::RegistryReader;
use networktree_core::telemetry::{init_logging, RateReporter};
use networktree_core::SharedTree;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Build a network tree from registry and geolocation extracts
#[derive(Parser, Debug)]
#[command(name = "networktree", version)]
struct Args {
    /// RIR delegation extract, pipe-delimited (repeatable)
    #[arg(long = "registry", value_name = "FILE")]
    registries: Vec<PathBuf>,

    /// GeoLite2 city locations CSV
    #[arg(long, value_name = "FILE")]
    geolite_locations: Option<PathBuf>,

    /// GeoLite2 city blocks CSV (repeatable)
    #[arg(long, value_name = "FILE", requires = "geolite_locations")]
    geolite_blocks: Vec<PathBuf>,

    /// Maximum number of siblings per level
    #[arg(long, env = "NETWORKTREE_PRECISION", default_value_t = 64)]
    precision: usize,

    /// Resolver threads [default: number of CPUs]
    #[arg(long, env = "NETWORKTREE_WORKERS")]
    workers: Option<usize>,

    /// Capacity of each inter-stage queue [default: 4096]
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Where to write the JSON snapshot
    #[arg(long, short, default_value = "output.json")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Layout::Merged)]
    layout: Layout,

    /// Seconds between throughput lines; 0 disables them
    #[arg(long, default_value_t = 1)]
    report_interval_secs: u64,

    /// Address to look up once the tree is built (repeatable)
    #[arg(long, value_name = "ADDR")]
    lookup: Vec<IpAddr>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Layout {
    Merged,
    PerFamily,
}

impl From<Layout> for JsonLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Merged => JsonLayout::Merged,
            Layout::PerFamily => JsonLayout::PerFamily,
        }
    }
}

struct Sources {
    registries: Vec<PathBuf>,
    locations: Option<PathBuf>,
    blocks: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            let kind = e
                .downcast_ref::<networktree_core::Error>()
                .map_or("error", |e| e.kind().as_str());
            eprintln!("networktree: {kind}: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let started = Instant::now();
    let tree = SharedTree::with_precision(args.precision)?;

    let mut config = PipelineConfig::default();
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    let pipeline = Pipeline::new(config);
    let cancel = pipeline.cancel_token();
    let reporter = match args.report_interval_secs {
        0 => None,
        secs => Some(RateReporter::spawn(
            pipeline.counters(),
            Duration::from_secs(secs),
        )?),
    };

    let sources = Sources {
        registries: args.registries.clone(),
        locations: args.geolite_locations.clone(),
        blocks: args.geolite_blocks.clone(),
    };
    let mut job = {
        let tree = tree.clone();
        tokio::task::spawn_blocking(move || ingest(&pipeline, &sources, &tree))
    };

    let finished = tokio::select! {
        res = &mut job => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    let interrupted = finished.is_none();
    let outcome = match finished {
        Some(res) => res,
        None => {
            warn!("interrupted, draining queued records");
            cancel.cancel();
            job.await
        }
    };
    drop(reporter);

    let outcome = outcome.context("ingestion task failed")?;
    if interrupted {
        if let Err(e) = &outcome {
            error!("ingestion stopped early: {}", e);
        }
    } else {
        let records = outcome?;
        info!("ingested {} records into {} networks", records, tree.len());
    }

    if log::log_enabled!(log::Level::Debug) {
        tree.validate()?;
        debug!("tree passed validation");
    }
    write_snapshot(&tree, &args)?;
    if interrupted {
        return Ok(ExitCode::FAILURE);
    }

    for addr in &args.lookup {
        match tree.find_network(*addr) {
            Some((network, annotation)) => println!(
                "{addr} -> {network} ({})",
                annotation.country().unwrap_or("-")
            ),
            None => println!("{addr} -> not indexed"),
        }
    }
    println!("finished in {:?}", started.elapsed());
    Ok(ExitCode::SUCCESS)
}

/// Geolocation blocks go first so city-level data claims networks that a
/// registry also announces.
fn ingest(pipeline: &Pipeline, sources: &Sources, tree: &SharedTree) -> networktree_core::Result<u64> {
    let cancel = pipeline.cancel_token();
    let mut records = 0;

    if let Some(path) = &sources.locations {
        let resolver = Resolver::with_locations(Arc::new(LocationTable::open(path)?));
        for path in &sources.blocks {
            if cancel.is_cancelled() {
                return Ok(records);
            }
            info!("reading {}", path.display());
            let reader = GeoliteBlocksReader::open(path)?.with_counters(pipeline.counters());
            records += pipeline.run(reader, &resolver, tree)?.records;
        }
    }

    let resolver = Resolver::countries();
    for path in &sources.registries {
        if cancel.is_cancelled() {
            break;
        }
        info!("reading {}", path.display());
        let reader = RegistryReader::open(path)?.with_counters(pipeline.counters());
        records += pipeline.run(reader, &resolver, tree)?.records;
    }
    Ok(records)
}

fn write_snapshot(tree: &SharedTree, args: &Args) -> Result<()> {
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut out = BufWriter::new(file);
    write_json(&tree.read(), &mut out, args.layout.into())?;
    out.flush()?;
    info!("wrote {}", args.output.display());
    Ok(())
}
