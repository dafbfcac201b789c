//! Per-patient evaluation state

use crate::date::DateResolver;
use crate::error::EventStoreError;
use crate::store::{ClinicalEvent, EventQuery, EventStore, Fact, PatientId};
use crate::value::Value;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

static MISSING: Value = Value::Missing;

/// Resolved variable values of one patient for one evaluation pass.
///
/// A value is written at most once; later writes for the same name are ignored so
/// every reader of a variable sees the same value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVars {
    values: HashMap<String, Value>,
}

impl ResolvedVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a variable; [`Value::Missing`] when it has not been resolved
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&MISSING)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Cache a value. Returns false, leaving the cache unchanged, if the name is
    /// already resolved.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.values.contains_key(&name) {
            return false;
        }
        self.values.insert(name, value);
        true
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ResolvedVars {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

/// Everything one patient's pass needs: the store, the date anchors, the query
/// timeout and the value cache.
pub struct EvaluationContext<'a> {
    pub patient: PatientId,
    pub resolver: DateResolver,
    pub resolved: ResolvedVars,
    store: &'a dyn EventStore,
    timeout: Duration,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        store: &'a dyn EventStore,
        patient: PatientId,
        resolver: DateResolver,
        timeout: Duration,
    ) -> Self {
        Self {
            patient,
            resolver,
            resolved: ResolvedVars::new(),
            store,
            timeout,
        }
    }

    pub fn index_date(&self) -> NaiveDate {
        self.resolver.index_date()
    }

    pub async fn query_events(
        &self,
        query: &EventQuery<'_>,
    ) -> Result<Vec<ClinicalEvent>, EventStoreError> {
        self.bounded(self.store.query_events(self.patient, query)).await
    }

    pub async fn query_fact(&self, fact: Fact, as_of: NaiveDate) -> Result<Value, EventStoreError> {
        self.bounded(self.store.query_fact(self.patient, fact, as_of)).await
    }

    async fn bounded<T>(
        &self,
        query: impl Future<Output = Result<T, EventStoreError>>,
    ) -> Result<T, EventStoreError> {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(EventStoreError::Timeout {
                patient: self.patient,
                millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
