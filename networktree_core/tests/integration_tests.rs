use std::{
    collections::BTreeMap,
    io::{Cursor, Write},
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use ipnet::IpNet;
use metrics::{
    Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use networktree_core::errors::ErrorKind;
use networktree_core::export::{to_json_string, JsonLayout};
use networktree_core::geolite::{GeoliteBlocksReader, LocationTable};
use networktree_core::pipeline::{
    CancelToken, Extent, GeoKey, Pipeline, PipelineConfig, RangeRecord, Resolver,
};
use networktree_core::positions::coarse_position;
use networktree_core::registry::RegistryReader;
use networktree_core::telemetry::{init_logging, IngestCounters};
use networktree_core::{Annotation, Error, PrefixTree, SharedTree};
use parking_lot::Mutex;

const REGISTRY: &str = "\
2|ripencc|20240101|4|19830101|20240101|+0000
ripencc|*|ipv4|*|4|summary
arin|US|ipv4|8.8.8.0|256|19921201|allocated|a
arin|CA|ipv4|24.0.0.0|1024|19990101|assigned|b
ripencc|DE|ipv4|10.0.0.0|768|20000101|allocated|c
iana||ipv4|192.0.2.0|256|20000101|reserved|d
ripencc|ZZ|ipv4|198.51.100.0|256|20000101|reserved|e
ripencc|DE|ipv6|2001:db8::|32|20000101|allocated|f
";

const LOCATIONS: &str = "\
geoname_id,locale_code,continent_code,continent_name,country_iso_code,country_name,subdivision_1_iso_code,subdivision_1_name,subdivision_2_iso_code,subdivision_2_name,city_name,metro_code,time_zone,is_in_european_union
5375480,en,NA,\"North America\",US,\"United States\",CA,California,,,\"Mountain View\",807,America/Los_Angeles,0
2950159,en,EU,Europe,DE,Germany,BE,\"Land Berlin\",,,Berlin,,Europe/Berlin,1
";

const BLOCKS: &str = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider,postal_code,latitude,longitude,accuracy_radius
8.8.8.0/24,5375480,6252001,,0,0,94043,37.4056,-122.0775,1000
5.10.0.0/16,,2950159,,0,0,,,,200
2001:db8::/32,2950159,,,0,0,,52.5,13.4,100
";

fn small_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig {
        workers: 3,
        queue_capacity: 2,
    })
}

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn record(i: u32, code: &str) -> RangeRecord {
    RangeRecord {
        start: IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | (i << 8))),
        extent: Extent::Count(256),
        key: GeoKey::Country(code.to_string()),
    }
}

type GaugeValues = Arc<Mutex<BTreeMap<String, f64>>>;

/// Recorder keeping the last value of every gauge.
#[derive(Default)]
struct GaugeCapture(GaugeValues);

struct CapturedGauge {
    name: String,
    values: GaugeValues,
}

impl GaugeFn for CapturedGauge {
    fn increment(&self, value: f64) {
        *self.values.lock().entry(self.name.clone()).or_default() += value;
    }

    fn decrement(&self, value: f64) {
        *self.values.lock().entry(self.name.clone()).or_default() -= value;
    }

    fn set(&self, value: f64) {
        self.values.lock().insert(self.name.clone(), value);
    }
}

impl Recorder for GaugeCapture {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
        Counter::noop()
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CapturedGauge {
            name: key.name().to_string(),
            values: Arc::clone(&self.0),
        }))
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[test]
fn registry_extract_end_to_end() {
    init_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(REGISTRY.as_bytes()).unwrap();

    let tree = SharedTree::with_precision(64).unwrap();
    let pipeline = small_pipeline();
    let reader = RegistryReader::open(file.path()).unwrap().with_counters(pipeline.counters());
    let report = pipeline.run(reader, &Resolver::countries(), &tree).unwrap();

    assert_eq!(report.records, 6);
    assert!(!report.cancelled);
    // 768 addresses expand to a /23 and a /24
    assert_eq!(report.tally.created, 7);
    assert_eq!(report.tally.without_parent, 7);

    let snapshot = pipeline.counters().snapshot();
    assert_eq!(snapshot.records, 6);
    assert_eq!(snapshot.prefixes, 7);
    assert_eq!(snapshot.skipped, 2);

    let (network, annotation) = tree.find_network(addr("8.8.8.8")).unwrap();
    assert_eq!(network, "8.8.8.0/24".parse::<IpNet>().unwrap());
    assert_eq!(annotation.country(), Some("US"));
    let position = annotation.record().unwrap().position;
    assert_eq!(position, coarse_position("US"));

    let (network, annotation) = tree.find_network(addr("10.0.2.5")).unwrap();
    assert_eq!(network.to_string(), "10.0.2.0/24");
    assert_eq!(annotation.country(), Some("DE"));

    let (_, annotation) = tree.find_network(addr("192.0.2.1")).unwrap();
    assert_eq!(annotation, Annotation::Empty);
    let (_, annotation) = tree.find_network(addr("198.51.100.1")).unwrap();
    assert_eq!(annotation, Annotation::Empty);

    let (network, _) = tree.find_network(addr("2001:db8:1::1")).unwrap();
    assert_eq!(network.to_string(), "2001:db8::/32");
    assert!(tree.find_network(addr("1.1.1.1")).is_none());
    tree.validate().unwrap();
}

#[test]
fn geolite_blocks_end_to_end() {
    let locations = Arc::new(LocationTable::from_reader(LOCATIONS.as_bytes()).unwrap());
    let resolver = Resolver::with_locations(locations);
    let tree = SharedTree::with_precision(64).unwrap();

    let report = small_pipeline()
        .run(GeoliteBlocksReader::new(Cursor::new(BLOCKS)), &resolver, &tree)
        .unwrap();
    assert_eq!(report.records, 3);

    let (_, annotation) = tree.find_network(addr("8.8.8.8")).unwrap();
    let rec = annotation.record().unwrap();
    assert_eq!(rec.location.as_ref().unwrap().city_name, "Mountain View");
    assert_eq!(rec.position.unwrap().latitude, 37.4056);

    // no primary key, no coordinates: fallback key and coarse position
    let (_, annotation) = tree.find_network(addr("5.10.1.1")).unwrap();
    let rec = annotation.record().unwrap();
    assert_eq!(rec.country, "DE");
    assert!(rec.location.as_ref().unwrap().is_part_of_eu);
    assert_eq!(rec.position, coarse_position("DE"));

    let json: serde_json::Value =
        serde_json::from_str(&to_json_string(&tree.read(), JsonLayout::Merged).unwrap()).unwrap();
    let roots = json.as_array().unwrap();
    let networks: Vec<&str> = roots.iter().map(|r| r["network"].as_str().unwrap()).collect();
    assert_eq!(networks, vec!["5.10.0.0/16", "8.8.8.0/24", "2001:db8::/32"]);
    assert_eq!(roots[1]["cityName"], "Mountain View");
    assert_eq!(roots[1]["latitude"], "37.405600");
    assert_eq!(roots[2]["isPartOfEU"], "true");
}

#[test]
fn unknown_country_stops_the_pipeline() {
    let tree = SharedTree::with_precision(64).unwrap();
    let source = vec![Ok(record(0, "US")), Ok(record(1, "QQ")), Ok(record(2, "US"))];
    let config = PipelineConfig {
        workers: 1,
        queue_capacity: 1,
    };
    let err = Pipeline::new(config)
        .run(source, &Resolver::countries(), &tree)
        .unwrap_err();
    assert!(matches!(&err, Error::UnknownCountry(code) if code == "QQ"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    tree.validate().unwrap();
}

#[test]
fn unknown_location_is_fatal() {
    let locations = Arc::new(LocationTable::from_reader(LOCATIONS.as_bytes()).unwrap());
    let blocks = "network,a,b,c,d,e,f,lat,lon,r\n1.2.3.0/24,404,405,,0,0,,1.0,2.0,10\n";
    let tree = SharedTree::with_precision(64).unwrap();
    let err = small_pipeline()
        .run(
            GeoliteBlocksReader::new(blocks.as_bytes()),
            &Resolver::with_locations(locations),
            &tree,
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnknownLocation { .. }));
    assert!(tree.is_empty());
}

#[test]
fn source_errors_are_returned() {
    let tree = SharedTree::with_precision(64).unwrap();
    let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
    let source = vec![Ok(record(0, "US")), Err(Error::Io(io))];
    let err = small_pipeline()
        .run(source, &Resolver::countries(), &tree)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn cancelled_before_start_reads_nothing() {
    let tree = SharedTree::with_precision(64).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = small_pipeline()
        .with_cancel_token(cancel)
        .run((0..10).map(|i| Ok(record(i, "US"))), &Resolver::countries(), &tree)
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.records, 0);
    assert!(tree.is_empty());
}

#[test]
fn cancellation_drains_queued_records() {
    let tree = SharedTree::with_precision(8).unwrap();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let source = (0..1_000u32).map(move |i| {
        if i == 100 {
            trigger.cancel();
        }
        Ok(record(i, "US"))
    });

    let report = small_pipeline()
        .with_cancel_token(cancel)
        .run(source, &Resolver::countries(), &tree)
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.records, 100);
    assert_eq!(report.tally.total(), 100);

    let tree = tree.try_unwrap().unwrap();
    assert_eq!(tree.real_entries().count(), 100);
    tree.validate().unwrap();
}

#[test]
fn parallel_ingestion_matches_sequential_inserts() {
    let records: Vec<RangeRecord> = (0..2_000u32)
        .map(|i| RangeRecord {
            start: IpAddr::V4(Ipv4Addr::from(0x1000_0000u32.wrapping_add(i.wrapping_mul(0x0001_3700)))),
            extent: Extent::Count(256 << (i % 5)),
            key: GeoKey::Country(["US", "CA", "DE", "FR"][i as usize % 4].to_string()),
        })
        .collect();
    let resolver = Resolver::countries();

    let mut expected = PrefixTree::new(4).unwrap();
    for r in &records {
        let annotation = resolver.resolve(&r.key).unwrap();
        for n in r.networks() {
            expected.insert(n, annotation.clone()).unwrap();
        }
    }

    let tree = SharedTree::with_precision(4).unwrap();
    let config = PipelineConfig {
        workers: num_cpus::get(),
        queue_capacity: 16,
    };
    Pipeline::new(config)
        .run(records.into_iter().map(Ok), &resolver, &tree)
        .unwrap();
    tree.validate().unwrap();

    let left: BTreeMap<IpNet, Option<String>> = expected
        .real_entries()
        .map(|(n, a)| (n, a.country().map(str::to_string)))
        .collect();
    let right: BTreeMap<IpNet, Option<String>> = tree
        .read()
        .real_entries()
        .map(|(n, a)| (n, a.country().map(str::to_string)))
        .collect();
    assert_eq!(left.len(), expected.real_entries().count());
    assert_eq!(left, right);
}

#[test]
fn readers_run_while_ingesting() {
    let tree = SharedTree::with_precision(3).unwrap();
    let done = AtomicBool::new(false);
    let lookups = AtomicU64::new(0);
    let readers = num_cpus::get().clamp(2, 8);

    thread::scope(|s| {
        for t in 0..readers {
            let tree = tree.clone();
            let (done, lookups) = (&done, &lookups);
            s.spawn(move || {
                let mut i = t as u32;
                while !done.load(Ordering::Acquire) {
                    let target = IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | ((i % 4096) << 8) | 1));
                    if let Some((network, _)) = tree.find_network(target) {
                        assert!(network.contains(&target));
                    }
                    if i % 512 == 0 {
                        tree.validate().unwrap();
                    }
                    lookups.fetch_add(1, Ordering::Relaxed);
                    i = i.wrapping_add(readers as u32);
                }
            });
        }

        let counters = IngestCounters::new();
        let report = small_pipeline()
            .with_counters(counters.clone())
            .run((0..4_096u32).map(|i| Ok(record(i, "US"))), &Resolver::countries(), &tree)
            .unwrap();
        done.store(true, Ordering::Release);
        assert_eq!(report.records, 4_096);
        assert_eq!(counters.snapshot().prefixes, 4_096);
    });

    assert!(lookups.load(Ordering::Relaxed) > 0);
    tree.validate().unwrap();
    let (network, _) = tree.find_network(addr("10.15.255.1")).unwrap();
    assert_eq!(network.to_string(), "10.15.255.0/24");
}

#[test]
fn full_queues_stall_the_reader() {
    let tree = SharedTree::with_precision(64).unwrap();
    let pulled = AtomicU64::new(0);
    let config = PipelineConfig {
        workers: 2,
        queue_capacity: 4,
    };
    // both queues full, one record per worker, one held by the reader, one
    // batch waiting on the lock
    let bound = 2 * config.queue_capacity as u64 + config.workers as u64 + 2;
    let total = 10_000u32;

    thread::scope(|s| {
        let guard = tree.write();
        let ingest = {
            let (tree, pulled) = (&tree, &pulled);
            s.spawn(move || {
                let source = (0..total).map(|i| {
                    pulled.fetch_add(1, Ordering::SeqCst);
                    Ok(record(i, "US"))
                });
                Pipeline::new(config).run(source, &Resolver::countries(), tree)
            })
        };

        thread::sleep(Duration::from_millis(300));
        let stalled = pulled.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        let later = pulled.load(Ordering::SeqCst);
        let untouched = guard.is_empty();
        drop(guard);

        assert!(stalled <= bound, "pulled {stalled} records while blocked, bound {bound}");
        assert_eq!(stalled, later, "reader kept pulling while blocked");
        assert!(untouched);

        let report = ingest.join().unwrap().unwrap();
        assert_eq!(report.records, u64::from(total));
        assert_eq!(report.tally.total(), u64::from(total));
    });

    assert_eq!(pulled.load(Ordering::SeqCst), u64::from(total));
    assert_eq!(tree.read().real_entries().count(), total as usize);
    tree.validate().unwrap();
}

#[test]
fn size_gauges_follow_each_run() {
    let capture = GaugeCapture::default();
    let tree = SharedTree::with_precision(2).unwrap();
    let report = metrics::with_local_recorder(&capture, || {
        small_pipeline().run(
            (0..3u32).map(|i| Ok(record(i, "US"))),
            &Resolver::countries(),
            &tree,
        )
    })
    .unwrap();
    assert_eq!(report.records, 3);

    let tree = tree.read();
    // 10.0.0.0/24 and 10.0.1.0/24 move under a 10.0.0.0/23 aggregate
    assert_eq!(tree.aggregate_count(), 1);
    let gauges = capture.0.lock();
    assert_eq!(gauges.get("networktree_nodes"), Some(&(tree.len() as f64)));
    assert_eq!(gauges.get("networktree_aggregates"), Some(&1.0));
}

#[test]
fn full_tree_stops_the_pipeline() {
    let tree = SharedTree::new(PrefixTree::new(64).unwrap().with_node_limit(10));
    let err = small_pipeline()
        .run((0..50).map(|i| Ok(record(i, "US"))), &Resolver::countries(), &tree)
        .unwrap_err();
    assert!(matches!(err, Error::NodeLimit(10)));
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(tree.len(), 10);
    tree.validate().unwrap();
}
