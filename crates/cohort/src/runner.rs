//! Concurrent per-patient runs
//!
//! Patients are evaluated on a bounded pool of in-flight futures. Each patient's pass
//! is sequential and private; results are merged only after every dispatched
//! patient has finished, then sorted by patient id.

use crate::output::{ExtractRow, PopulationExtract, RunReport, StudyOutput};
use crate::study::Study;
use chrono::{Datelike, Months, NaiveDate};
use cohort_diagnostics::{CohortError, Result};
use cohort_eval::{DateResolver, EventStore, EventStoreError, PatientId, ResolvedVars};
use futures::{StreamExt, future, stream};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that stops a run from dispatching further patients
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Inclusive range of months; each run uses the first day of a month as index date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl IndexDateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(CohortError::invalid_configuration(format!(
                "index date range ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// First day of every month touched by the range
    pub fn index_dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut current = self.start.with_day(1);
        while let Some(date) = current {
            if date > self.end {
                break;
            }
            dates.push(date);
            current = date.checked_add_months(Months::new(1));
        }
        dates
    }
}

impl Study {
    /// Evaluate every patient in the store at `index_date`.
    ///
    /// Patients whose queries fail or time out are excluded and counted in the
    /// report. A cancelled run returns [`CohortError::Cancelled`] and no output.
    pub async fn run(
        &self,
        store: &dyn EventStore,
        index_date: NaiveDate,
        cancel: &CancellationFlag,
    ) -> Result<StudyOutput> {
        if cancel.is_cancelled() {
            return Err(CohortError::Cancelled);
        }
        let patients = store
            .patients()
            .await
            .map_err(|e| CohortError::patient_enumeration(e.to_string()))?;
        info!(
            "run started: index date {}, {} patient(s), concurrency {}",
            index_date,
            patients.len(),
            self.config.concurrency
        );

        let resolver = DateResolver::new(index_date, self.config.today());
        let timeout = self.config.query_timeout();
        let graph = &self.graph;

        let results: Vec<(PatientId, std::result::Result<ResolvedVars, EventStoreError>)> =
            stream::iter(patients)
                .take_while(|_| future::ready(!cancel.is_cancelled()))
                .map(|patient| async move {
                    let result = graph.evaluate_patient(store, patient, resolver, timeout).await;
                    (patient, result)
                })
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;

        if cancel.is_cancelled() {
            warn!(
                "run cancelled at index date {} after {} patient(s); results discarded",
                index_date,
                results.len()
            );
            return Err(CohortError::Cancelled);
        }

        let mut report = RunReport {
            patients_seen: results.len(),
            ..RunReport::default()
        };
        let mut members: Vec<(PatientId, ResolvedVars)> = Vec::new();
        for (patient, result) in results {
            match result {
                Ok(vars) => {
                    if graph.population().is_in_population(&vars) {
                        members.push((patient, vars));
                    }
                }
                Err(err) => {
                    warn!("patient {} excluded: {} [{}]", patient, err, err.code());
                    report.excluded_by_store_errors += 1;
                }
            }
        }
        members.sort_by_key(|(patient, _)| *patient);
        report.in_population = members.len();

        let columns = graph.columns().to_vec();
        for column in &columns {
            let missing = members
                .iter()
                .filter(|(_, vars)| vars.get(&column.name).is_missing())
                .count();
            report.unresolved.insert(column.name.clone(), missing);
        }
        let rows = members
            .iter()
            .map(|(patient, vars)| ExtractRow {
                patient: *patient,
                values: columns.iter().map(|c| vars.get(&c.name).clone()).collect(),
            })
            .collect();

        let population: Vec<ResolvedVars> = members.into_iter().map(|(_, vars)| vars).collect();
        let measures = self.aggregator.tabulate(&population, &self.suppression)?;

        info!(
            "run finished: index date {}, {} seen, {} in population, {} excluded by store errors",
            index_date, report.patients_seen, report.in_population, report.excluded_by_store_errors
        );
        Ok(StudyOutput {
            index_date,
            extract: PopulationExtract { columns, rows },
            measures,
            report,
        })
    }

    /// Run once per month of `range`, in date order
    pub async fn run_monthly(
        &self,
        store: &dyn EventStore,
        range: IndexDateRange,
        cancel: &CancellationFlag,
    ) -> Result<Vec<StudyOutput>> {
        let mut outputs = Vec::new();
        for index_date in range.index_dates() {
            outputs.push(self.run(store, index_date, cancel).await?);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_index_dates() {
        let range = IndexDateRange::new(date(2019, 11, 15), date(2020, 2, 1)).unwrap();
        assert_eq!(
            range.index_dates(),
            vec![date(2019, 11, 1), date(2019, 12, 1), date(2020, 1, 1), date(2020, 2, 1)]
        );
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(IndexDateRange::new(date(2020, 2, 1), date(2020, 1, 1)).is_err());
    }

    #[test]
    fn test_cancellation_flag_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
