//! Event store query surface
//!
//! The engine never reads raw clinical data itself. Everything it knows about a
//! patient comes through [`EventStore`]: coded events matching a codelist inside a
//! date range, and point-in-time demographic facts.

use crate::error::EventStoreError;
use crate::value::Value;
use async_trait::async_trait;
use chrono::NaiveDate;
use cohort_ast::Codelist;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Opaque patient identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u64);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One coded clinical event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalEvent {
    pub code: String,
    pub date: NaiveDate,
}

impl ClinicalEvent {
    pub fn new(code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            code: code.into(),
            date,
        }
    }
}

/// Inclusive date range; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Which record an event query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Primary care clinical record
    ClinicalRecord,
    /// Cause-of-death codes; events are dated on the date of death
    DeathCertificate { underlying_cause_only: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct EventQuery<'a> {
    pub codelist: &'a Codelist,
    pub range: DateRange,
    pub source: EventSource,
}

/// Demographic and administrative facts, looked up as of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fact {
    /// Text `"M"`, `"F"`, ...
    Sex,
    DateOfBirth,
    /// Date of death when it falls on or before the as-of date
    DateOfDeath,
    /// Boolean: a registration covers the as-of date
    Registered,
    /// NUTS1 region of the practice registered at on the as-of date
    PracticeRegion,
    /// Index of multiple deprivation rank of the address held on the as-of date
    IndexOfMultipleDeprivation,
}

/// Query interface consumed by the evaluator. Results must be deterministic for a
/// fixed as-of date.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Every patient known to the store
    async fn patients(&self) -> Result<Vec<PatientId>, EventStoreError>;

    /// Events whose code is in the codelist and whose date is in range, in store order
    async fn query_events(
        &self,
        patient: PatientId,
        query: &EventQuery<'_>,
    ) -> Result<Vec<ClinicalEvent>, EventStoreError>;

    /// A fact as of a date; [`Value::Missing`] when the store has none
    async fn query_fact(
        &self,
        patient: PatientId,
        fact: Fact,
        as_of: NaiveDate,
    ) -> Result<Value, EventStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Registration {
    start: NaiveDate,
    end: Option<NaiveDate>,
    region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Address {
    start: NaiveDate,
    end: Option<NaiveDate>,
    imd: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CauseOfDeath {
    code: String,
    underlying: bool,
}

fn covers(start: NaiveDate, end: Option<NaiveDate>, date: NaiveDate) -> bool {
    date >= start && end.is_none_or(|e| date <= e)
}

/// Everything the in-memory store holds for one patient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientRecord {
    sex: Option<String>,
    date_of_birth: Option<NaiveDate>,
    date_of_death: Option<NaiveDate>,
    registrations: Vec<Registration>,
    addresses: Vec<Address>,
    events: Vec<ClinicalEvent>,
    causes_of_death: Vec<CauseOfDeath>,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    pub fn born(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    pub fn died(mut self, date: NaiveDate) -> Self {
        self.date_of_death = Some(date);
        self
    }

    /// Registration with a practice from `start` to `end` (inclusive, open if `None`)
    pub fn registered(
        mut self,
        start: NaiveDate,
        end: Option<NaiveDate>,
        region: Option<&str>,
    ) -> Self {
        self.registrations.push(Registration {
            start,
            end,
            region: region.map(str::to_string),
        });
        self
    }

    pub fn address(mut self, start: NaiveDate, end: Option<NaiveDate>, imd: Option<u32>) -> Self {
        self.addresses.push(Address { start, end, imd });
        self
    }

    pub fn event(mut self, code: impl Into<String>, date: NaiveDate) -> Self {
        self.events.push(ClinicalEvent::new(code, date));
        self
    }

    /// Cause-of-death code on the death certificate
    pub fn cause_of_death(mut self, code: impl Into<String>, underlying: bool) -> Self {
        self.causes_of_death.push(CauseOfDeath {
            code: code.into(),
            underlying,
        });
        self
    }

    fn fact(&self, fact: Fact, as_of: NaiveDate) -> Value {
        match fact {
            Fact::Sex => self.sex.clone().map_or(Value::Missing, Value::Text),
            Fact::DateOfBirth => self.date_of_birth.into(),
            Fact::DateOfDeath => self.date_of_death.filter(|d| *d <= as_of).into(),
            Fact::Registered => Value::Bool(
                self.registrations
                    .iter()
                    .any(|r| covers(r.start, r.end, as_of)),
            ),
            Fact::PracticeRegion => self
                .registrations
                .iter()
                .rev()
                .find(|r| covers(r.start, r.end, as_of))
                .and_then(|r| r.region.clone())
                .map_or(Value::Missing, Value::Text),
            Fact::IndexOfMultipleDeprivation => self
                .addresses
                .iter()
                .rev()
                .find(|a| covers(a.start, a.end, as_of))
                .and_then(|a| a.imd)
                .map_or(Value::Missing, |imd| Value::Number(Decimal::from(imd))),
        }
    }

    fn events(&self, query: &EventQuery<'_>) -> Vec<ClinicalEvent> {
        match query.source {
            EventSource::ClinicalRecord => self
                .events
                .iter()
                .filter(|e| query.codelist.contains(&e.code) && query.range.contains(e.date))
                .cloned()
                .collect(),
            EventSource::DeathCertificate {
                underlying_cause_only,
            } => {
                let Some(date) = self.date_of_death.filter(|d| query.range.contains(*d)) else {
                    return Vec::new();
                };
                self.causes_of_death
                    .iter()
                    .filter(|c| !underlying_cause_only || c.underlying)
                    .filter(|c| query.codelist.contains(&c.code))
                    .map(|c| ClinicalEvent::new(c.code.clone(), date))
                    .collect()
            }
        }
    }
}

/// Injected failure for a patient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// Every query for the patient fails with this message
    QueryFailed(String),
    /// Every query sleeps this long before answering
    Delay(Duration),
}

/// Store backed by in-memory patient records, with failure injection for tests
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    patients: RwLock<BTreeMap<PatientId, PatientRecord>>,
    failures: RwLock<HashMap<PatientId, StoreFailure>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, patient: PatientId, record: PatientRecord) {
        self.patients.write().insert(patient, record);
    }

    pub fn with_patient(self, patient: u64, record: PatientRecord) -> Self {
        self.insert(PatientId(patient), record);
        self
    }

    /// Make every query for `patient` fail or stall
    pub fn inject_failure(&self, patient: PatientId, failure: StoreFailure) {
        self.failures.write().insert(patient, failure);
    }

    pub fn len(&self) -> usize {
        self.patients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.read().is_empty()
    }

    async fn check_failure(&self, patient: PatientId) -> Result<(), EventStoreError> {
        let failure = self.failures.read().get(&patient).cloned();
        match failure {
            Some(StoreFailure::QueryFailed(message)) => {
                Err(EventStoreError::query_failed(patient, message))
            }
            Some(StoreFailure::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn with_record<T>(
        &self,
        patient: PatientId,
        f: impl FnOnce(&PatientRecord) -> T,
    ) -> Result<T, EventStoreError> {
        self.patients
            .read()
            .get(&patient)
            .map(f)
            .ok_or(EventStoreError::UnknownPatient { patient })
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn patients(&self) -> Result<Vec<PatientId>, EventStoreError> {
        Ok(self.patients.read().keys().copied().collect())
    }

    async fn query_events(
        &self,
        patient: PatientId,
        query: &EventQuery<'_>,
    ) -> Result<Vec<ClinicalEvent>, EventStoreError> {
        self.check_failure(patient).await?;
        self.with_record(patient, |record| record.events(query))
    }

    async fn query_fact(
        &self,
        patient: PatientId,
        fact: Fact,
        as_of: NaiveDate,
    ) -> Result<Value, EventStoreError> {
        self.check_failure(patient).await?;
        self.with_record(patient, |record| record.fact(fact, as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_ast::CodeSystem;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::between(date(2015, 1, 1), date(2022, 12, 31));
        assert!(range.contains(date(2015, 1, 1)));
        assert!(range.contains(date(2022, 12, 31)));
        assert!(!range.contains(date(2023, 1, 1)));
        assert!(DateRange::unbounded().contains(date(1900, 1, 1)));
    }

    #[tokio::test]
    async fn test_events_filtered_by_codelist_and_range() {
        let codelist = Codelist::from_codes(CodeSystem::Snomed, ["399068003"]).unwrap();
        let store = InMemoryEventStore::new().with_patient(
            1,
            PatientRecord::new()
                .event("399068003", date(2014, 6, 1))
                .event("399068003", date(2019, 3, 1))
                .event("22298006", date(2019, 4, 1)),
        );
        let query = EventQuery {
            codelist: &codelist,
            range: DateRange::between(date(2015, 1, 1), date(2022, 12, 31)),
            source: EventSource::ClinicalRecord,
        };
        let events = store.query_events(PatientId(1), &query).await.unwrap();
        assert_eq!(events, vec![ClinicalEvent::new("399068003", date(2019, 3, 1))]);
    }

    #[tokio::test]
    async fn test_registration_facts() {
        let store = InMemoryEventStore::new().with_patient(
            7,
            PatientRecord::new()
                .registered(date(2010, 1, 1), Some(date(2016, 12, 31)), Some("London"))
                .registered(date(2017, 1, 1), None, Some("North East")),
        );
        let as_of = date(2018, 1, 31);
        assert_eq!(
            store.query_fact(PatientId(7), Fact::Registered, as_of).await.unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            store.query_fact(PatientId(7), Fact::PracticeRegion, as_of).await.unwrap(),
            Value::text("North East")
        );
        assert_eq!(
            store.query_fact(PatientId(7), Fact::Registered, date(2009, 1, 1)).await.unwrap(),
            Value::Bool(false)
        );
    }

    #[tokio::test]
    async fn test_injected_failure_and_unknown_patient() {
        let store = InMemoryEventStore::new().with_patient(1, PatientRecord::new());
        store.inject_failure(PatientId(1), StoreFailure::QueryFailed("disk".into()));
        let err = store.query_fact(PatientId(1), Fact::Sex, date(2020, 1, 1)).await.unwrap_err();
        assert_eq!(err.patient(), Some(PatientId(1)));
        let err = store.query_fact(PatientId(2), Fact::Sex, date(2020, 1, 1)).await.unwrap_err();
        assert_eq!(err, EventStoreError::UnknownPatient { patient: PatientId(2) });
    }
}
