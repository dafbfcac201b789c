//! Run results

use chrono::NaiveDate;
use cohort_diagnostics::{CohortError, Result};
use cohort_eval::{ExtractColumn, PatientId, Value};
use cohort_measures::MeasureTable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One in-population patient, values in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRow {
    pub patient: PatientId,
    pub values: Vec<Value>,
}

/// Per-patient values of every visible variable, sorted by patient id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationExtract {
    pub columns: Vec<ExtractColumn>,
    pub rows: Vec<ExtractRow>,
}

impl PopulationExtract {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn patients(&self) -> Vec<PatientId> {
        self.rows.iter().map(|row| row.patient).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn value(&self, patient: PatientId, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        let row = self
            .rows
            .binary_search_by_key(&patient, |row| row.patient)
            .ok()
            .map(|i| &self.rows[i])?;
        row.values.get(index)
    }

    /// Header plus one text row per patient; dates are cut to their column's precision
    pub fn render(&self) -> Vec<Vec<String>> {
        let header = std::iter::once("patient_id".to_string())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect();
        let body = self.rows.iter().map(|row| {
            std::iter::once(row.patient.to_string())
                .chain(
                    self.columns
                        .iter()
                        .zip(&row.values)
                        .map(|(column, value)| value.render(column.precision)),
                )
                .collect()
        });
        std::iter::once(header).chain(body).collect()
    }
}

/// Counts reported alongside every completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub patients_seen: usize,
    pub in_population: usize,
    /// Patients dropped because an event store query failed or timed out
    pub excluded_by_store_errors: usize,
    /// In-population patients with a missing value, per extract column
    pub unresolved: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOutput {
    pub index_date: NaiveDate,
    pub extract: PopulationExtract,
    pub measures: Vec<MeasureTable>,
    pub report: RunReport,
}

impl StudyOutput {
    pub fn measure(&self, id: &str) -> Option<&MeasureTable> {
        self.measures.iter().find(|m| m.measure_id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CohortError::internal(format!("failed to serialize output: {}", e)))
    }
}
