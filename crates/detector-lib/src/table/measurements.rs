//! Measurements indexed by metric then instance

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::{IndexedTable, TableEntry};
use crate::models::Measurement;

/// Measurements indexed by metric name, then instance id
pub type MeasurementsTable = IndexedTable<Measurement>;

impl TableEntry for Measurement {
    fn entry_type(&self) -> &str {
        self.metric()
    }

    fn instance_id(&self) -> &str {
        self.instance()
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp()
    }
}

impl IndexedTable<Measurement> {
    /// New table holding only one component's measurements
    pub fn component(&self, name: &str) -> Self {
        self.filtered(|m| m.component() == name)
    }

    /// Distinct component names
    pub fn components(&self) -> BTreeSet<&str> {
        self.iter().map(Measurement::component).collect()
    }
}
