//! Engine configuration

use chrono::{NaiveDate, Utc};
use cohort_diagnostics::{CohortError, Result};
use cohort_measures::SuppressionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run-wide settings, independent of any study definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Patients evaluated concurrently
    pub concurrency: usize,
    /// Per-query event store timeout
    pub query_timeout_ms: u64,
    /// Fixed date for the `today` anchor; the current UTC date when unset
    pub today: Option<NaiveDate>,
    pub suppression: SuppressionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            query_timeout_ms: 30_000,
            today: None,
            suppression: SuppressionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CohortError::invalid_configuration(format!("engine configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(CohortError::invalid_configuration("concurrency must be at least 1"));
        }
        if self.query_timeout_ms == 0 {
            return Err(CohortError::invalid_configuration(
                "query_timeout_ms must be at least 1",
            ));
        }
        if self.suppression.threshold == 0 {
            return Err(CohortError::invalid_configuration(
                "suppression threshold must be at least 1",
            ));
        }
        if self.suppression.rounding_base == 0 {
            return Err(CohortError::invalid_configuration(
                "suppression rounding_base must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn with_suppression(mut self, policy: SuppressionPolicy) -> Self {
        self.suppression = policy;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_diagnostics::COH0110;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"concurrency": 2, "today": "2020-06-01"}"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.today(), NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert_eq!(config.suppression, SuppressionPolicy::new(8, 5));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = EngineConfig::from_json(r#"{"concurrency": 0}"#).unwrap_err();
        assert_eq!(err.code(), COH0110);
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let err = EngineConfig::from_json(r#"{"concurrency": "many"}"#).unwrap_err();
        assert_eq!(err.code(), COH0110);
    }
}
