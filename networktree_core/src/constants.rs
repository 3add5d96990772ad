//! Constants and defaults for the prefix tree and ingestion pipeline

/// Sibling bound used when none is configured.
pub const DEFAULT_PRECISION: usize = 64;

/// Smallest bound a level can always be rebalanced down to.
pub const MIN_PRECISION: usize = 2;

/// Largest arena a `u32` node index can address.
pub const MAX_NODES: usize = u32::MAX as usize;

/// Capacity of each bounded stage queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Registry pseudo-country for unassigned/reserved space.
pub const UNKNOWN_COUNTRY: &str = "ZZ";

/// Start-address placeholder used by registry summary rows.
pub const REGISTRY_PLACEHOLDER: &str = "*";

pub const REGISTRY_DELIMITER: u8 = b'|';
pub const REGISTRY_MIN_FIELDS: usize = 5;
pub const GEOLITE_BLOCK_MIN_FIELDS: usize = 10;
pub const GEOLITE_LOCATION_MIN_FIELDS: usize = 14;
