//! Shared fixtures for run tests
//!
//! - Codelists used by the prostate rates study
//! - A small in-memory population with known outcomes at 2020-01-01
//! - A store wrapper that counts queries and can cancel the run on the first one

use async_trait::async_trait;
use chrono::NaiveDate;
use cohort::eval::{ClinicalEvent, EventQuery, EventStoreError, Fact, StoreFailure};
use cohort::{
    CancellationFlag, Codelist, CodelistSet, EngineConfig, EventStore, InMemoryEventStore,
    PatientId, PatientRecord, Study, Value,
};
use cohort::ast::CodeSystem;
use parking_lot::Mutex;

pub const PROSTATE_RATES: &str = include_str!("../fixtures/prostate_rates.json");

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn codelists() -> CodelistSet {
    CodelistSet::new()
        .with(
            "prostate_cancer_codes",
            Codelist::from_codes(CodeSystem::Snomed, ["399068003", "254900004", "369485004"])
                .unwrap(),
        )
        .unwrap()
        .with(
            "prostate_cancer_icd10",
            Codelist::from_codes(CodeSystem::Icd10, ["C61"]).unwrap(),
        )
        .unwrap()
        .with(
            "ethnicity_codes",
            Codelist::new(
                CodeSystem::Ctv3,
                [("XaJQv", Some("1")), ("XaJQy", Some("2")), ("XaJR2", Some("3"))],
            )
            .unwrap(),
        )
        .unwrap()
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
        .with_concurrency(4)
        .with_today(date(2020, 6, 1))
}

pub fn prostate_study() -> Study {
    Study::from_json(PROSTATE_RATES, &codelists(), config()).unwrap()
}

fn registered_man(born: NaiveDate, region: &str) -> PatientRecord {
    PatientRecord::new()
        .sex("M")
        .born(born)
        .registered(date(2010, 1, 1), None, Some(region))
}

/// Nine patients; at 2020-01-01 patients 1, 2, 6 and 8 are in the population and
/// patient 9 fails every query.
pub fn prostate_store() -> InMemoryEventStore {
    let store = InMemoryEventStore::new()
        // prevalent since 2019, white, IMD 15000
        .with_patient(
            1,
            registered_man(date(1950, 6, 1), "London")
                .address(date(2005, 1, 1), None, Some(15_012))
                .event("399068003", date(2019, 3, 1))
                .event("XaJQv", date(2001, 1, 1)),
        )
        // incident in January 2020
        .with_patient(
            2,
            registered_man(date(1940, 2, 10), "North East").event("254900004", date(2020, 1, 15)),
        )
        .with_patient(
            3,
            PatientRecord::new()
                .sex("F")
                .born(date(1960, 1, 1))
                .registered(date(2010, 1, 1), None, Some("London")),
        )
        // child
        .with_patient(4, registered_man(date(2005, 1, 1), "London"))
        // died before the index month
        .with_patient(
            5,
            registered_man(date(1950, 1, 1), "London").died(date(2019, 6, 1)),
        )
        .with_patient(6, registered_man(date(1970, 1, 1), "London"))
        // deregistered
        .with_patient(
            7,
            PatientRecord::new()
                .sex("M")
                .born(date(1945, 1, 1))
                .registered(date(2000, 1, 1), Some(date(2015, 1, 1)), Some("London")),
        )
        // prevalent, died of prostate cancer during the index month
        .with_patient(
            8,
            registered_man(date(1948, 5, 5), "London")
                .event("369485004", date(2018, 1, 1))
                .died(date(2020, 1, 20))
                .cause_of_death("C61", true),
        )
        .with_patient(9, registered_man(date(1950, 1, 1), "London"));
    store.inject_failure(PatientId(9), StoreFailure::QueryFailed("connection reset".into()));
    store
}

/// Delegates to an in-memory store and counts queries, optionally cancelling the
/// run on the first one
pub struct CountingStore {
    pub inner: InMemoryEventStore,
    pub cancel_on_query: Option<CancellationFlag>,
    pub queries: Mutex<usize>,
}

impl CountingStore {
    pub fn new(inner: InMemoryEventStore) -> Self {
        Self {
            inner,
            cancel_on_query: None,
            queries: Mutex::new(0),
        }
    }

    pub fn cancelling(inner: InMemoryEventStore, flag: CancellationFlag) -> Self {
        Self {
            cancel_on_query: Some(flag),
            ..Self::new(inner)
        }
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock()
    }

    fn record_query(&self) {
        *self.queries.lock() += 1;
        if let Some(flag) = &self.cancel_on_query {
            flag.cancel();
        }
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn patients(&self) -> Result<Vec<PatientId>, EventStoreError> {
        self.inner.patients().await
    }

    async fn query_events(
        &self,
        patient: PatientId,
        query: &EventQuery<'_>,
    ) -> Result<Vec<ClinicalEvent>, EventStoreError> {
        self.record_query();
        self.inner.query_events(patient, query).await
    }

    async fn query_fact(
        &self,
        patient: PatientId,
        fact: Fact,
        as_of: NaiveDate,
    ) -> Result<Value, EventStoreError> {
        self.record_query();
        self.inner.query_fact(patient, fact, as_of).await
    }
}
