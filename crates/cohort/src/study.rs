//! Compiled studies

use crate::config::EngineConfig;
use chrono::NaiveDate;
use cohort_ast::{CodelistSet, StudyDefinition};
use cohort_diagnostics::{CohortError, Result};
use cohort_eval::VariableGraph;
use cohort_measures::{MeasureAggregator, SuppressionEngine};
use log::debug;

/// A study whose rules have passed every configuration check.
///
/// Compilation never touches patient data; a `Study` that exists can only fail a
/// run through the event store or the disclosure check.
#[derive(Debug, Clone)]
pub struct Study {
    definition: StudyDefinition,
    pub(crate) graph: VariableGraph,
    pub(crate) aggregator: MeasureAggregator,
    pub(crate) suppression: SuppressionEngine,
    pub(crate) config: EngineConfig,
}

impl Study {
    pub fn compile(
        definition: StudyDefinition,
        codelists: &CodelistSet,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let graph = VariableGraph::build(&definition, codelists)?;
        let aggregator = MeasureAggregator::new(&definition.measures, &graph)?;
        debug!(
            "study compiled: {} variable(s), {} measure(s)",
            graph.len(),
            aggregator.measures().len()
        );
        Ok(Self {
            suppression: SuppressionEngine::new(config.suppression),
            definition,
            graph,
            aggregator,
            config,
        })
    }

    /// Compile a study definition given as JSON
    pub fn from_json(json: &str, codelists: &CodelistSet, config: EngineConfig) -> Result<Self> {
        let definition: StudyDefinition = serde_json::from_str(json)
            .map_err(|e| CohortError::invalid_configuration(format!("study definition: {}", e)))?;
        Self::compile(definition, codelists, config)
    }

    pub fn definition(&self) -> &StudyDefinition {
        &self.definition
    }

    pub fn graph(&self) -> &VariableGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The declared index date, else the configured `today`
    pub fn default_index_date(&self) -> NaiveDate {
        self.definition
            .index_date
            .unwrap_or_else(|| self.config.today())
    }
}
