//! Symptoms indexed by symptom type then instance

use chrono::{DateTime, Utc};

use super::{IndexedTable, TableEntry, TypeView};
use crate::models::{Measurement, Symptom};

/// Symptoms indexed by symptom type, then instance id
pub type SymptomsTable = IndexedTable<Symptom>;

impl TableEntry for Symptom {
    fn entry_type(&self) -> &str {
        self.symptom_type()
    }

    fn instance_id(&self) -> &str {
        self.instance()
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp()
    }
}

impl<'a> TypeView<'a, Symptom> {
    /// Measurements attached to an instance's symptoms of this type
    pub fn assignment(&self, id: &str) -> Vec<&'a Measurement> {
        self.instance(id)
            .iter()
            .flat_map(|symptom| symptom.assignment())
            .collect()
    }
}
