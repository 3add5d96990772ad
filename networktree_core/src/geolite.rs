//! Readers for GeoLite2-City style CSV extracts: the locations side-table
//! and the IPv4/IPv6 blocks files.

use crate::annotation::Location;
use crate::constants::{GEOLITE_BLOCK_MIN_FIELDS, GEOLITE_LOCATION_MIN_FIELDS};
use crate::errors::Result;
use crate::pipeline::{Extent, GeoKey, RangeRecord};
use crate::telemetry::IngestCounters;
use csv::StringRecord;
use ipnet::IpNet;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// `geoname_id` → location.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    entries: HashMap<String, Location>,
}

impl LocationTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut table = Self::default();
        for row in rows.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!("[GEOLITE] skipping location row: {}", e);
                    continue;
                }
            };
            if row.len() < GEOLITE_LOCATION_MIN_FIELDS {
                continue;
            }
            table.insert(
                &row[0],
                Location {
                    city_name: row[10].to_string(),
                    subdiv_name: row[7].to_string(),
                    country_iso: row[4].to_string(),
                    country_name: row[5].to_string(),
                    is_part_of_eu: &row[13] != "0",
                },
            );
        }
        info!("[GEOLITE] loaded {} locations", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, key: &str, location: Location) {
        self.entries.insert(key.to_string(), location);
    }

    pub fn get(&self, key: &str) -> Option<&Location> {
        if key.is_empty() {
            return None;
        }
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Blocks file reader. Columns: network, geoname_id,
/// registered_country_geoname_id, ..., latitude (7), longitude (8).
pub struct GeoliteBlocksReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    counters: Option<Arc<IngestCounters>>,
    skipped: u64,
}

impl GeoliteBlocksReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> GeoliteBlocksReader<R> {
    pub fn new(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self {
            rows,
            counters: None,
            skipped: 0,
        }
    }

    pub fn with_counters(mut self, counters: Arc<IngestCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: Read> Iterator for GeoliteBlocksReader<R> {
    type Item = Result<RangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(row) => {
                    if let Some(record) = parse_block(&row) {
                        return Some(Ok(record));
                    }
                    debug!("[GEOLITE] skipping block row: {:?}", row);
                }
                Err(e) if e.is_io_error() => return Some(Err(e.into())),
                Err(e) => debug!("[GEOLITE] skipping block row: {}", e),
            }
            self.skipped += 1;
            if let Some(c) = &self.counters {
                c.add_skipped(1);
            }
        }
    }
}

fn parse_block(row: &StringRecord) -> Option<RangeRecord> {
    if row.len() < GEOLITE_BLOCK_MIN_FIELDS {
        return None;
    }
    let network = row[0].trim().parse::<IpNet>().ok()?.trunc();
    let (primary, fallback) = (row[1].trim(), row[2].trim());
    if primary.is_empty() && fallback.is_empty() {
        return None;
    }
    Some(RangeRecord {
        start: network.network(),
        extent: Extent::PrefixLen(network.prefix_len()),
        key: GeoKey::Location {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
            latitude: row[7].trim().parse().ok(),
            longitude: row[8].trim().parse().ok(),
        },
    })
}
