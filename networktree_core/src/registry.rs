//! Reader for RIR delegation extracts (`delegated-*-extended-latest`).
//!
//! Rows look like `arin|US|ipv4|8.8.8.0|256|19921201|allocated|...`. IPv4
//! rows carry an address count, IPv6 rows a prefix length. Version,
//! summary and malformed rows are skipped.

use crate::constants::{REGISTRY_DELIMITER, REGISTRY_MIN_FIELDS, REGISTRY_PLACEHOLDER};
use crate::errors::Result;
use crate::helpers::{prefix_size, range_end, Family};
use crate::pipeline::{Extent, GeoKey, RangeRecord};
use crate::telemetry::IngestCounters;
use csv::StringRecord;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

pub struct RegistryReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    counters: Option<Arc<IngestCounters>>,
    skipped: u64,
}

impl RegistryReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> RegistryReader<R> {
    pub fn new(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .delimiter(REGISTRY_DELIMITER)
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
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

    /// Rows dropped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip(&mut self, why: &dyn std::fmt::Display) {
        self.skipped += 1;
        if let Some(c) = &self.counters {
            c.add_skipped(1);
        }
        debug!("[REGISTRY] skipping row: {}", why);
    }
}

impl<R: Read> Iterator for RegistryReader<R> {
    type Item = Result<RangeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(row) => match parse_row(&row) {
                    Some(record) => return Some(Ok(record)),
                    None => self.skip(&row.iter().collect::<Vec<_>>().join("|")),
                },
                Err(e) if e.is_io_error() => return Some(Err(e.into())),
                Err(e) => self.skip(&e),
            }
        }
    }
}

fn parse_row(row: &StringRecord) -> Option<RangeRecord> {
    if row.len() < REGISTRY_MIN_FIELDS || row[3].trim() == REGISTRY_PLACEHOLDER {
        return None;
    }
    let start: IpAddr = row[3].trim().parse().ok()?;
    let extent = match (row[2].trim(), start) {
        ("ipv4", IpAddr::V4(_)) => {
            let count: u64 = row[4].trim().parse().ok()?;
            if count == 0 || count % 2 != 0 {
                return None;
            }
            Extent::Count(count as u128)
        }
        ("ipv6", IpAddr::V6(_)) => {
            let len: u8 = row[4].trim().parse().ok()?;
            if !(1..=128).contains(&len) {
                return None;
            }
            Extent::PrefixLen(len)
        }
        _ => return None,
    };
    let size = match extent {
        Extent::Count(count) => count,
        Extent::PrefixLen(len) => prefix_size(Family::V6, len)?,
    };
    range_end(start, size)?;
    Some(RangeRecord {
        start,
        extent,
        key: GeoKey::Country(row[1].trim().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTRACT: &str = "\
2|arin|20240101|12345|19830101|20240101|-0500
arin|*|ipv4|*|1000|summary
arin|*|ipv6|*|500|summary
arin|US|ipv4|8.8.8.0|256|19921201|allocated|abc
arin|CA|ipv4|24.0.0.0|1024|19990101|assigned|def
arin|US|ipv4|192.0.2.1|1|20000101|assigned|odd
arin|US|ipv4|not-an-ip|256|20000101|assigned|bad
arin|US|ipv4|10.0.0.0|many|20000101|assigned|bad
arin|US|ipv4|255.255.255.0|512|20000101|assigned|overflow
arin|US|ipv6|2001:db8::|32|20000101|allocated|ghi
arin|US|ipv6|2001:db8::|0|20000101|allocated|bad
arin|US|ipv6|10.0.0.0|32|20000101|allocated|mismatch
arin|US|asn|1234|1|20000101|allocated|asn
";

    #[test]
    fn keeps_only_well_formed_ranges() {
        let mut reader = RegistryReader::new(EXTRACT.as_bytes());
        let records: Vec<RangeRecord> = reader.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].start, "8.8.8.0".parse::<IpAddr>().unwrap());
        assert_eq!(records[0].extent, Extent::Count(256));
        assert_eq!(records[0].key, GeoKey::Country("US".into()));
        assert_eq!(records[1].key, GeoKey::Country("CA".into()));
        assert_eq!(records[2].extent, Extent::PrefixLen(32));
        assert_eq!(reader.skipped(), 10);
    }

    #[test]
    fn counts_expand_into_covering_prefixes() {
        let row = "ripencc|DE|ipv4|10.0.0.0|768|20000101|allocated";
        let record = RegistryReader::new(row.as_bytes()).next().unwrap().unwrap();
        let nets: Vec<String> = record.networks().iter().map(|n| n.to_string()).collect();
        assert_eq!(nets, vec!["10.0.0.0/23", "10.0.2.0/24"]);
    }

    #[test]
    fn skipped_rows_reach_the_counters() {
        let counters = IngestCounters::new();
        let n = RegistryReader::new(EXTRACT.as_bytes())
            .with_counters(counters.clone())
            .count();
        assert_eq!(n, 3);
        assert_eq!(counters.snapshot().skipped, 10);
    }
}
