//! Variable dependency graph
//!
//! Building the graph flattens nested sub-variables into global nodes, compiles every
//! expression and relative date, checks that each reference names exactly one
//! declaration, and orders the nodes so every variable comes after the variables it
//! reads. Evaluation then walks that order once per patient.

use crate::categorise::Categoriser;
use crate::context::{EvaluationContext, ResolvedVars};
use crate::date::DateResolver;
use crate::error::{DateResolutionError, EventStoreError};
use crate::expression::CompiledExpression;
use crate::population::PopulationFilter;
use crate::store::{ClinicalEvent, DateRange, EventQuery, EventSource, EventStore, Fact, PatientId};
use crate::value::Value;
use chrono::NaiveDate;
use cohort_ast::{
    ClinicalEventsDef, Codelist, CodelistSet, DateExpr, DatePrecision, DeathCertificateDef,
    DeathReturning, DiedDef, EventReturning, POPULATION, PeriodDef, PopulationDef,
    StudyDefinition, VariableDef,
};
use cohort_diagnostics::{CohortError, Result};
use cohort_parser::parse_date_expression;
use indexmap::IndexMap;
use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Suffix of the implicit column holding a matched event's date
pub const DATE_OF_MATCH_SUFFIX: &str = "_date";

/// One column of the population extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractColumn {
    pub name: String,
    /// Reporting precision for date values in this column
    pub precision: DatePrecision,
}

/// Which of several matching events a value-returning query reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Earliest date; ties go to the event the store returned first
    First,
    /// Latest date; ties go to the event the store returned last
    Last,
}

impl MatchPolicy {
    pub fn select<'e>(&self, events: &'e [ClinicalEvent]) -> Option<&'e ClinicalEvent> {
        events.iter().fold(None, |best, event| match (self, best) {
            (MatchPolicy::First, Some(b)) if b.date <= event.date => Some(b),
            (MatchPolicy::Last, Some(b)) if b.date > event.date => Some(b),
            _ => Some(event),
        })
    }
}

/// Compiled date-range constraint
#[derive(Debug, Clone, Default, PartialEq)]
struct PeriodRule {
    start: Option<DateExpr>,
    end: Option<DateExpr>,
}

impl PeriodRule {
    fn compile(variable: &str, period: &PeriodDef) -> Result<Self> {
        let forms = [
            period.on_or_before.is_some(),
            period.on_or_after.is_some(),
            period.between.is_some(),
        ];
        if forms.iter().filter(|set| **set).count() > 1 {
            return Err(CohortError::invalid_declaration(
                variable,
                "use only one of on_or_before, on_or_after and between",
            ));
        }

        let mut rule = Self::default();
        if let Some(end) = &period.on_or_before {
            rule.end = Some(compile_date(variable, end)?);
        }
        if let Some(start) = &period.on_or_after {
            rule.start = Some(compile_date(variable, start)?);
        }
        if let Some((start, end)) = &period.between {
            rule.start = Some(compile_date(variable, start)?);
            rule.end = Some(compile_date(variable, end)?);
        }
        Ok(rule)
    }

    fn anchors(&self) -> impl Iterator<Item = &str> {
        self.start
            .iter()
            .chain(self.end.iter())
            .filter_map(DateExpr::anchor_variable)
    }

    fn resolve(
        &self,
        resolver: &DateResolver,
        vars: &ResolvedVars,
    ) -> std::result::Result<DateRange, DateResolutionError> {
        let start = self.start.as_ref().map(|e| resolver.resolve(e, vars)).transpose()?;
        let end = self.end.as_ref().map(|e| resolver.resolve(e, vars)).transpose()?;
        Ok(DateRange { start, end })
    }
}

fn compile_date(variable: &str, source: &str) -> Result<DateExpr> {
    parse_date_expression(source)
        .map_err(|e| CohortError::malformed_date_expression(variable, source, e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
struct EventRule {
    codelist: Codelist,
    period: PeriodRule,
    policy: MatchPolicy,
    returning: EventReturning,
    date_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    ClinicalEvents(EventRule),
    DeathCertificate {
        codelist: Codelist,
        period: PeriodRule,
        underlying_cause_only: bool,
        returning: DeathReturning,
    },
    DiedFromAnyCause {
        period: PeriodRule,
        returning: DeathReturning,
    },
    Sex,
    Age(DateExpr),
    Registered(DateExpr),
    PracticeRegion(DateExpr),
    Deprivation {
        reference: DateExpr,
        round_to_nearest: Option<u32>,
    },
    Satisfying(CompiledExpression),
    Categorised(Categoriser),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    name: String,
    kind: NodeKind,
    /// Owning node names this node reads, deduplicated
    dependencies: Vec<String>,
    visible: bool,
    precision: DatePrecision,
}

impl Node {
    fn date_column(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::ClinicalEvents(rule) => rule.date_column.as_deref(),
            _ => None,
        }
    }
}

/// Value of a node plus the implicit date-of-match column, when it has one
struct Resolution {
    value: Value,
    date_of_match: Option<Value>,
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Self {
            value,
            date_of_match: None,
        }
    }
}

/// Compiled, acyclic variable graph
#[derive(Debug, Clone)]
pub struct VariableGraph {
    nodes: IndexMap<String, Node>,
    /// Implicit `<name>_date` columns and the node that produces them
    aliases: HashMap<String, String>,
    order: Vec<usize>,
    columns: Vec<ExtractColumn>,
    population: PopulationFilter,
}

impl VariableGraph {
    /// Validate and compile the variables and population rule of a study
    pub fn build(definition: &StudyDefinition, codelists: &CodelistSet) -> Result<Self> {
        let mut declarations: IndexMap<String, (&VariableDef, bool)> = IndexMap::new();
        for (name, def) in &definition.variables {
            flatten(name, def, true, &mut declarations)?;
        }
        let population_rule = match &definition.population {
            PopulationDef::All => None,
            PopulationDef::Satisfying {
                expression,
                variables,
            } => {
                for (name, def) in variables {
                    flatten(name, def, false, &mut declarations)?;
                }
                Some(expression)
            }
        };

        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(declarations.len());
        let mut references: Vec<Vec<String>> = Vec::with_capacity(declarations.len());
        for (name, (def, visible)) in &declarations {
            let (node, refs) = compile_node(name, def, *visible, codelists)?;
            nodes.insert(name.clone(), node);
            references.push(refs);
        }

        let mut aliases = HashMap::new();
        for node in nodes.values() {
            if let Some(column) = node.date_column() {
                if nodes.contains_key(column) || aliases.contains_key(column) {
                    return Err(CohortError::duplicate_variable(column));
                }
                aliases.insert(column.to_string(), node.name.clone());
            }
        }

        let mut graph = Self {
            nodes,
            aliases,
            order: Vec::new(),
            columns: Vec::new(),
            population: PopulationFilter::All,
        };

        for (index, refs) in references.into_iter().enumerate() {
            let owner_name = graph.nodes[index].name.clone();
            let mut dependencies: Vec<String> = Vec::with_capacity(refs.len());
            for reference in &refs {
                let owner = graph
                    .owner_of(reference)
                    .ok_or_else(|| CohortError::undeclared_variable(reference, &owner_name))?
                    .to_string();
                if !dependencies.contains(&owner) {
                    dependencies.push(owner);
                }
            }
            graph.nodes[index].dependencies = dependencies;
        }

        if let Some(expression) = population_rule {
            let filter = CompiledExpression::compile(POPULATION, expression)?;
            for reference in filter.references() {
                if graph.owner_of(reference).is_none() {
                    return Err(CohortError::undeclared_variable(reference, POPULATION));
                }
            }
            graph.population = PopulationFilter::Satisfying(filter);
        }

        graph.order = topological_order(&graph.nodes)?;
        graph.columns = graph
            .nodes
            .values()
            .filter(|node| node.visible)
            .flat_map(|node| {
                let own = ExtractColumn {
                    name: node.name.clone(),
                    precision: node.precision,
                };
                let date = node.date_column().map(|column| ExtractColumn {
                    name: column.to_string(),
                    precision: node.precision,
                });
                std::iter::once(own).chain(date)
            })
            .collect();

        debug!(
            "variable graph built: {} nodes, evaluation order [{}]",
            graph.nodes.len(),
            graph.evaluation_order().join(", ")
        );
        Ok(graph)
    }

    /// Node producing `name`: the node itself, or the owner of an implicit date column
    fn owner_of<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.nodes.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }

    /// True if `name` is a declared variable or an implicit date column
    pub fn contains(&self, name: &str) -> bool {
        self.owner_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Variable names in evaluation order
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.nodes[index].name.as_str())
            .collect()
    }

    /// Direct dependencies of a variable
    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|node| node.dependencies.as_slice())
    }

    /// Extract columns in declaration order; nested sub-variables are hidden
    pub fn columns(&self) -> &[ExtractColumn] {
        &self.columns
    }

    pub fn population(&self) -> &PopulationFilter {
        &self.population
    }

    /// Resolve every variable for the context's patient, in topological order.
    ///
    /// Values already cached in the context are kept. An event store failure aborts
    /// the pass; the caller excludes the patient.
    pub async fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> std::result::Result<(), EventStoreError> {
        for &index in &self.order {
            let node = &self.nodes[index];
            if ctx.resolved.contains(&node.name) {
                continue;
            }
            let resolution = node.kind.resolve(&node.name, ctx).await?;
            ctx.resolved.insert(node.name.as_str(), resolution.value);
            if let (Some(column), Some(date)) = (node.date_column(), resolution.date_of_match) {
                ctx.resolved.insert(column, date);
            }
        }
        Ok(())
    }

    /// Evaluate one patient from scratch and return the resolved values
    pub async fn evaluate_patient(
        &self,
        store: &dyn EventStore,
        patient: PatientId,
        resolver: DateResolver,
        timeout: Duration,
    ) -> std::result::Result<ResolvedVars, EventStoreError> {
        let mut ctx = EvaluationContext::new(store, patient, resolver, timeout);
        self.evaluate(&mut ctx).await?;
        Ok(ctx.resolved)
    }
}

fn flatten<'d>(
    name: &str,
    def: &'d VariableDef,
    visible: bool,
    declarations: &mut IndexMap<String, (&'d VariableDef, bool)>,
) -> Result<()> {
    if name == POPULATION {
        return Err(CohortError::invalid_declaration(
            name,
            "'population' is reserved for the population rule",
        ));
    }
    if declarations.contains_key(name) {
        return Err(CohortError::duplicate_variable(name));
    }
    declarations.insert(name.to_string(), (def, visible));
    if let Some(nested) = def.nested() {
        for (child, child_def) in nested {
            flatten(child, child_def, false, declarations)?;
        }
    }
    Ok(())
}

fn lookup_codelist(variable: &str, codelists: &CodelistSet, name: &str) -> Result<Codelist> {
    codelists
        .get(name)
        .cloned()
        .ok_or_else(|| CohortError::unknown_codelist(variable, name))
}

/// Compile one declaration; also returns the names it references as written
fn compile_node(
    name: &str,
    def: &VariableDef,
    visible: bool,
    codelists: &CodelistSet,
) -> Result<(Node, Vec<String>)> {
    let mut precision = DatePrecision::Day;
    let mut refs: Vec<String> = Vec::new();

    let kind = match def {
        VariableDef::WithTheseClinicalEvents(events) => {
            let rule = compile_events(name, events, codelists)?;
            refs.extend(rule.period.anchors().map(str::to_string));
            if rule.returning == EventReturning::Date || rule.date_column.is_some() {
                precision = events.date_precision();
            }
            NodeKind::ClinicalEvents(rule)
        }
        VariableDef::WithTheseCodesOnDeathCertificate(DeathCertificateDef {
            codelist,
            period,
            match_only_underlying_cause,
            returning,
            date_format,
        }) => {
            let period = PeriodRule::compile(name, period)?;
            refs.extend(period.anchors().map(str::to_string));
            precision = date_format.map(Into::into).unwrap_or_default();
            NodeKind::DeathCertificate {
                codelist: lookup_codelist(name, codelists, codelist)?,
                period,
                underlying_cause_only: *match_only_underlying_cause,
                returning: *returning,
            }
        }
        VariableDef::DiedFromAnyCause(DiedDef {
            period,
            returning,
            date_format,
        }) => {
            let period = PeriodRule::compile(name, period)?;
            refs.extend(period.anchors().map(str::to_string));
            precision = date_format.map(Into::into).unwrap_or_default();
            NodeKind::DiedFromAnyCause {
                period,
                returning: *returning,
            }
        }
        VariableDef::Sex => NodeKind::Sex,
        VariableDef::AgeAsOf { reference_date } => {
            let reference = compile_date(name, reference_date)?;
            refs.extend(reference.anchor_variable().map(str::to_string));
            NodeKind::Age(reference)
        }
        VariableDef::RegisteredAsOf { reference_date } => {
            let reference = compile_date(name, reference_date)?;
            refs.extend(reference.anchor_variable().map(str::to_string));
            NodeKind::Registered(reference)
        }
        VariableDef::RegisteredPracticeAsOf { reference_date, .. } => {
            let reference = compile_date(name, reference_date)?;
            refs.extend(reference.anchor_variable().map(str::to_string));
            NodeKind::PracticeRegion(reference)
        }
        VariableDef::AddressAsOf {
            reference_date,
            round_to_nearest,
            ..
        } => {
            if *round_to_nearest == Some(0) {
                return Err(CohortError::invalid_declaration(
                    name,
                    "round_to_nearest must be positive",
                ));
            }
            let reference = compile_date(name, reference_date)?;
            refs.extend(reference.anchor_variable().map(str::to_string));
            NodeKind::Deprivation {
                reference,
                round_to_nearest: *round_to_nearest,
            }
        }
        VariableDef::Satisfying { expression, .. } => {
            let compiled = CompiledExpression::compile(name, expression)?;
            refs.extend(compiled.references().iter().cloned());
            NodeKind::Satisfying(compiled)
        }
        VariableDef::CategorisedAs { categories, .. } => {
            let categoriser = Categoriser::compile(name, categories)?;
            refs.extend(categoriser.references().into_iter().map(str::to_string));
            NodeKind::Categorised(categoriser)
        }
    };

    let node = Node {
        name: name.to_string(),
        kind,
        dependencies: Vec::new(),
        visible,
        precision,
    };
    Ok((node, refs))
}

fn compile_events(
    name: &str,
    def: &ClinicalEventsDef,
    codelists: &CodelistSet,
) -> Result<EventRule> {
    let policy = match (def.find_first_match_in_period, def.find_last_match_in_period) {
        (true, true) => {
            return Err(CohortError::invalid_declaration(
                name,
                "find_first_match_in_period and find_last_match_in_period are exclusive",
            ));
        }
        (true, false) => MatchPolicy::First,
        _ => MatchPolicy::Last,
    };

    Ok(EventRule {
        codelist: lookup_codelist(name, codelists, &def.codelist)?,
        period: PeriodRule::compile(name, &def.period)?,
        policy,
        returning: def.returning,
        date_column: def
            .include_date_of_match
            .then(|| format!("{}{}", name, DATE_OF_MATCH_SUFFIX)),
    })
}

fn topological_order(nodes: &IndexMap<String, Node>) -> Result<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(
        index: usize,
        nodes: &IndexMap<String, Node>,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[index] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|&i| i == index).unwrap_or(0);
                let cycle: Vec<String> = path[start..]
                    .iter()
                    .chain(std::iter::once(&index))
                    .map(|&i| nodes[i].name.clone())
                    .collect();
                return Err(CohortError::cyclic_dependency(&cycle));
            }
            Mark::Unvisited => {}
        }

        marks[index] = Mark::InProgress;
        path.push(index);
        for dependency in &nodes[index].dependencies {
            let next = nodes.get_index_of(dependency).ok_or_else(|| {
                CohortError::internal(format!("dependency '{}' has no node", dependency))
            })?;
            visit(next, nodes, marks, path, order)?;
        }
        path.pop();
        marks[index] = Mark::Done;
        order.push(index);
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(nodes.len());
    for index in 0..nodes.len() {
        visit(index, nodes, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

/// Resolve a reference date, logging and returning `None` when it cannot be
fn reference_date(name: &str, expr: &DateExpr, ctx: &EvaluationContext<'_>) -> Option<NaiveDate> {
    ctx.resolver
        .resolve(expr, &ctx.resolved)
        .inspect_err(|e| debug!("patient {}: '{}' unresolved: {}", ctx.patient, name, e))
        .ok()
}

fn period_range(name: &str, period: &PeriodRule, ctx: &EvaluationContext<'_>) -> Option<DateRange> {
    period
        .resolve(&ctx.resolver, &ctx.resolved)
        .inspect_err(|e| debug!("patient {}: '{}' unresolved: {}", ctx.patient, name, e))
        .ok()
}

fn round_to_multiple(value: Decimal, step: u32) -> Decimal {
    let step = Decimal::from(step);
    (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

impl NodeKind {
    async fn resolve(
        &self,
        name: &str,
        ctx: &EvaluationContext<'_>,
    ) -> std::result::Result<Resolution, EventStoreError> {
        let value = match self {
            NodeKind::ClinicalEvents(rule) => return rule.resolve(name, ctx).await,
            NodeKind::DeathCertificate {
                codelist,
                period,
                underlying_cause_only,
                returning,
            } => {
                let Some(range) = period_range(name, period, ctx) else {
                    return Ok(Value::Missing.into());
                };
                let query = EventQuery {
                    codelist,
                    range,
                    source: EventSource::DeathCertificate {
                        underlying_cause_only: *underlying_cause_only,
                    },
                };
                let events = ctx.query_events(&query).await?;
                match returning {
                    DeathReturning::BinaryFlag => Value::Bool(!events.is_empty()),
                    DeathReturning::DateOfDeath => events.first().map(|e| e.date).into(),
                }
            }
            NodeKind::DiedFromAnyCause { period, returning } => {
                let Some(range) = period_range(name, period, ctx) else {
                    return Ok(Value::Missing.into());
                };
                let as_of = range.end.unwrap_or(NaiveDate::MAX);
                let death = ctx
                    .query_fact(Fact::DateOfDeath, as_of)
                    .await?
                    .as_date()
                    .filter(|date| range.contains(*date));
                match returning {
                    DeathReturning::BinaryFlag => Value::Bool(death.is_some()),
                    DeathReturning::DateOfDeath => death.into(),
                }
            }
            NodeKind::Sex => ctx.query_fact(Fact::Sex, ctx.index_date()).await?,
            NodeKind::Age(reference) => {
                let Some(as_of) = reference_date(name, reference, ctx) else {
                    return Ok(Value::Missing.into());
                };
                let born = ctx.query_fact(Fact::DateOfBirth, as_of).await?.as_date();
                born.and_then(|dob| as_of.years_since(dob))
                    .map_or(Value::Missing, Value::number)
            }
            NodeKind::Registered(reference) => match reference_date(name, reference, ctx) {
                Some(as_of) => ctx.query_fact(Fact::Registered, as_of).await?,
                None => Value::Missing,
            },
            NodeKind::PracticeRegion(reference) => match reference_date(name, reference, ctx) {
                Some(as_of) => ctx.query_fact(Fact::PracticeRegion, as_of).await?,
                None => Value::Missing,
            },
            NodeKind::Deprivation {
                reference,
                round_to_nearest,
            } => {
                let Some(as_of) = reference_date(name, reference, ctx) else {
                    return Ok(Value::Missing.into());
                };
                let value = ctx.query_fact(Fact::IndexOfMultipleDeprivation, as_of).await?;
                match (round_to_nearest, value.as_number()) {
                    (Some(step), Some(n)) => Value::Number(round_to_multiple(n, *step)),
                    _ => value,
                }
            }
            NodeKind::Satisfying(expr) => Value::Bool(expr.is_satisfied(&ctx.resolved)),
            NodeKind::Categorised(categoriser) => Value::text(categoriser.categorise(&ctx.resolved)),
        };
        Ok(value.into())
    }
}

impl EventRule {
    async fn resolve(
        &self,
        name: &str,
        ctx: &EvaluationContext<'_>,
    ) -> std::result::Result<Resolution, EventStoreError> {
        let Some(range) = period_range(name, &self.period, ctx) else {
            return Ok(Resolution {
                value: Value::Missing,
                date_of_match: self.date_column.as_ref().map(|_| Value::Missing),
            });
        };

        let query = EventQuery {
            codelist: &self.codelist,
            range,
            source: EventSource::ClinicalRecord,
        };
        let events = ctx.query_events(&query).await?;
        let selected = self.policy.select(&events);

        let value = match self.returning {
            EventReturning::BinaryFlag => Value::Bool(!events.is_empty()),
            EventReturning::Date => selected.map(|e| e.date).into(),
            EventReturning::Category => selected.map_or(Value::Missing, |e| {
                Value::text(self.codelist.category_or_unclassified(&e.code))
            }),
            EventReturning::Code => selected.map_or(Value::Missing, |e| Value::text(&e.code)),
            EventReturning::NumberOfMatchesInPeriod => Value::number(events.len()),
        };

        Ok(Resolution {
            value,
            date_of_match: self
                .date_column
                .as_ref()
                .map(|_| Value::from(selected.map(|e| e.date))),
        })
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
    fn test_first_match_tie_keeps_store_order() {
        let events = vec![
            ClinicalEvent::new("a", date(2019, 3, 1)),
            ClinicalEvent::new("b", date(2019, 3, 1)),
            ClinicalEvent::new("c", date(2021, 6, 10)),
        ];
        assert_eq!(MatchPolicy::First.select(&events).map(|e| e.code.as_str()), Some("a"));
        assert_eq!(MatchPolicy::Last.select(&events).map(|e| e.code.as_str()), Some("c"));
        assert_eq!(MatchPolicy::Last.select(&events[..2]).map(|e| e.code.as_str()), Some("b"));
        assert_eq!(MatchPolicy::First.select(&[]), None);
    }

    #[test]
    fn test_round_to_multiple() {
        assert_eq!(round_to_multiple(Decimal::from(32844), 100), Decimal::from(32800));
        assert_eq!(round_to_multiple(Decimal::from(150), 100), Decimal::from(200));
        assert_eq!(round_to_multiple(Decimal::from(149), 100), Decimal::from(100));
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let study = StudyDefinition::new().with_variable("a", VariableDef::satisfying("a OR TRUE"));
        let err = VariableGraph::build(&study, &CodelistSet::new()).unwrap_err();
        assert_eq!(err.code(), cohort_diagnostics::COH0102);
        assert!(err.to_string().contains("a -> a"));
    }
}
