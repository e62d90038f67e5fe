//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Location string of the central logistics store
pub const LOGISTICS: &str = "logistics";

/// Prefix of production zone locations (`production_zone_<N>`)
pub const ZONE_PREFIX: &str = "production_zone_";

/// Prefix marking bill-of-materials SKUs
pub const BOM_PREFIX: &str = "BOM";

/// A parsed warehouse location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Logistics,
    ProductionZone(u32),
    Other(String),
}

impl Location {
    /// Parse a stored location string. Anything that is not `logistics` or
    /// `production_zone_<digits>` is kept verbatim as `Other`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == LOGISTICS {
            return Location::Logistics;
        }
        if let Some(zone) = trimmed.strip_prefix(ZONE_PREFIX) {
            if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(n) = zone.parse::<u32>() {
                    return Location::ProductionZone(n);
                }
            }
        }
        Location::Other(trimmed.to_string())
    }

    pub fn zone(n: u32) -> Self {
        Location::ProductionZone(n)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Location::ProductionZone(_))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Logistics => write!(f, "{}", LOGISTICS),
            Location::ProductionZone(n) => write!(f, "{}{}", ZONE_PREFIX, n),
            Location::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Location filter used by the compared view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationFilter {
    #[default]
    All,
    Logistics,
    Production,
}

impl LocationFilter {
    pub fn matches(&self, location: &str) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Logistics => Location::parse(location) == Location::Logistics,
            LocationFilter::Production => Location::parse(location).is_production(),
        }
    }
}

/// Which count ledger an entry belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountLedger {
    /// Live counts recorded by workers
    #[default]
    Checked,
    /// Expected baseline for the current count
    Expected,
    /// Snapshot carried over from the previous day
    Yesterday,
}

impl CountLedger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountLedger::Checked => "checked",
            CountLedger::Expected => "expected",
            CountLedger::Yesterday => "yesterday",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "checked" => Some(CountLedger::Checked),
            "expected" => Some(CountLedger::Expected),
            "yesterday" => Some(CountLedger::Yesterday),
            _ => None,
        }
    }
}

/// How a count entry came to be written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    /// Absolute observation entered by a worker
    #[default]
    Manual,
    /// Running total written by the scanner
    Scan,
    /// Running total written by a confirmed transaction
    Transfer,
    /// Running total written when a transaction is reversed
    Rectification,
}

impl CountSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountSource::Manual => "manual",
            CountSource::Scan => "scan",
            CountSource::Transfer => "transfer",
            CountSource::Rectification => "rectification",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(CountSource::Manual),
            "scan" => Some(CountSource::Scan),
            "transfer" => Some(CountSource::Transfer),
            "rectification" => Some(CountSource::Rectification),
            _ => None,
        }
    }

    /// Entries written as `previous + delta` rather than as an observation
    pub fn is_running_total(&self) -> bool {
        !matches!(self, CountSource::Manual)
    }
}

/// True for bill-of-materials SKUs, which expand into components elsewhere
pub fn is_bom_sku(sku: &str) -> bool {
    sku.trim().to_ascii_uppercase().starts_with(BOM_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(Location::parse("logistics"), Location::Logistics);
        assert_eq!(Location::parse("production_zone_7"), Location::ProductionZone(7));
        assert_eq!(Location::parse(" production_zone_12 "), Location::ProductionZone(12));
        assert_eq!(
            Location::parse("production_zone_x"),
            Location::Other("production_zone_x".to_string())
        );
        assert_eq!(
            Location::parse("production_zone_"),
            Location::Other("production_zone_".to_string())
        );
    }

    #[test]
    fn test_location_display_round_trip() {
        for raw in ["logistics", "production_zone_3", "dock"] {
            assert_eq!(Location::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_filter_matches() {
        assert!(LocationFilter::Logistics.matches("logistics"));
        assert!(!LocationFilter::Logistics.matches("production_zone_1"));
        assert!(LocationFilter::Production.matches("production_zone_1"));
        assert!(!LocationFilter::Production.matches("dock"));
        assert!(LocationFilter::All.matches("dock"));
    }

    #[test]
    fn test_bom_prefix() {
        assert!(is_bom_sku("BOM-100"));
        assert!(is_bom_sku("bom100"));
        assert!(!is_bom_sku("A001"));
    }
}
