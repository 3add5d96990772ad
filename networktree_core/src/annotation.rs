//! Metadata attached to stored networks

use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A row of the geolocation locations side-table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub city_name: String,
    pub subdiv_name: String,
    pub country_iso: String,
    pub country_name: String,
    pub is_part_of_eu: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub country: String,
    pub position: Option<Position>,
    pub location: Option<Location>,
}

impl GeoRecord {
    pub fn country(country: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            country: country.into(),
            position,
            location: None,
        }
    }
}

/// Payload of a tree node.
///
/// Only `Geo` is authoritative. `Sentinel` marks an aggregate synthesized
/// by rebalancing and `Empty` a network announced without usable data;
/// both give way to the first real record for the same network.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Annotation {
    #[default]
    Empty,
    Sentinel,
    Geo(Arc<GeoRecord>),
}

impl Annotation {
    pub fn geo(record: GeoRecord) -> Self {
        Annotation::Geo(Arc::new(record))
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self, Annotation::Geo(_))
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Annotation::Sentinel)
    }

    /// Whether `incoming` may replace `self` on a re-announcement.
    #[inline]
    pub fn accepts(&self, incoming: &Annotation) -> bool {
        !self.is_real() && incoming.is_real()
    }

    pub fn record(&self) -> Option<&GeoRecord> {
        match self {
            Annotation::Geo(r) => Some(r),
            _ => None,
        }
    }

    pub fn country(&self) -> Option<&str> {
        self.record().map(|r| r.country.as_str())
    }
}
