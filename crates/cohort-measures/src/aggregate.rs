//! Numerator/denominator tallies over the filtered population

use crate::suppression::SuppressionEngine;
use crate::table::{GroupKey, MISSING_GROUP, MeasureRow, MeasureTable};
use cohort_ast::{MeasureDef, POPULATION};
use cohort_diagnostics::{CohortError, Result};
use cohort_eval::{ResolvedVars, VariableGraph};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::{BTreeMap, HashSet};

/// Counts of one group. Merging is plain addition, so partial tallies from
/// parallel workers combine in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTally {
    pub numerator: u64,
    pub denominator: u64,
}

impl GroupTally {
    fn merge(&mut self, other: GroupTally) {
        self.numerator += other.numerator;
        self.denominator += other.denominator;
    }
}

type Tallies = BTreeMap<GroupKey, GroupTally>;

fn merge_tallies(mut left: Tallies, right: Tallies) -> Tallies {
    for (key, tally) in right {
        left.entry(key).or_default().merge(tally);
    }
    left
}

/// Validated measure declarations
#[derive(Debug, Clone)]
pub struct MeasureAggregator {
    measures: Vec<MeasureDef>,
}

impl MeasureAggregator {
    /// Check every measure against the compiled variables
    pub fn new(measures: &[MeasureDef], graph: &VariableGraph) -> Result<Self> {
        let mut ids = HashSet::with_capacity(measures.len());
        for measure in measures {
            if !ids.insert(measure.id.as_str()) {
                return Err(CohortError::invalid_measure(&measure.id, "declared more than once"));
            }
            if measure.numerator == POPULATION {
                return Err(CohortError::invalid_measure(
                    &measure.id,
                    "the numerator must be a variable",
                ));
            }
            if !graph.contains(&measure.numerator) {
                return Err(CohortError::invalid_measure(
                    &measure.id,
                    format!("numerator '{}' is not a declared variable", measure.numerator),
                ));
            }
            if measure.denominator != POPULATION && !graph.contains(&measure.denominator) {
                return Err(CohortError::invalid_measure(
                    &measure.id,
                    format!("denominator '{}' is not a declared variable", measure.denominator),
                ));
            }
            for variable in measure.group_by.variables() {
                if !graph.contains(variable) {
                    return Err(CohortError::invalid_measure(
                        &measure.id,
                        format!("group_by '{}' is not a declared variable", variable),
                    ));
                }
            }
        }
        Ok(Self {
            measures: measures.to_vec(),
        })
    }

    pub fn measures(&self) -> &[MeasureDef] {
        &self.measures
    }

    /// Raw tables, one per measure, in declaration order
    pub fn aggregate(&self, population: &[ResolvedVars]) -> Vec<MeasureTable> {
        self.measures
            .iter()
            .map(|measure| aggregate_measure(measure, population))
            .collect()
    }

    /// Aggregate and apply suppression to the measures that request it
    pub fn tabulate(
        &self,
        population: &[ResolvedVars],
        engine: &SuppressionEngine,
    ) -> Result<Vec<MeasureTable>> {
        let mut tables = self.aggregate(population);
        for (table, measure) in tables.iter_mut().zip(&self.measures) {
            if measure.small_number_suppression {
                engine.apply(table)?;
            }
        }
        Ok(tables)
    }
}

fn group_key(measure: &MeasureDef, vars: &ResolvedVars) -> GroupKey {
    measure
        .group_by
        .variables()
        .iter()
        .map(|name| {
            vars.get(name)
                .label()
                .unwrap_or_else(|| MISSING_GROUP.to_string())
        })
        .collect()
}

/// Tally one measure. Patients outside the denominator are skipped entirely, so
/// each group's numerator never exceeds its denominator.
pub fn aggregate_measure(measure: &MeasureDef, population: &[ResolvedVars]) -> MeasureTable {
    let in_denominator = |vars: &ResolvedVars| {
        measure.denominator == POPULATION || vars.get(&measure.denominator).is_truthy()
    };

    let mut tallies = population
        .par_iter()
        .filter(|vars| in_denominator(*vars))
        .fold(Tallies::new, |mut acc, vars| {
            let tally = acc.entry(group_key(measure, vars)).or_default();
            tally.denominator += 1;
            if vars.get(&measure.numerator).is_truthy() {
                tally.numerator += 1;
            }
            acc
        })
        .reduce(Tallies::new, merge_tallies);

    let group_by = measure.group_by.variables().to_vec();
    if group_by.is_empty() && tallies.is_empty() {
        tallies.insert(GroupKey::new(), GroupTally::default());
    }

    debug!(
        "measure '{}': {} group(s) over {} patient(s)",
        measure.id,
        tallies.len(),
        population.len()
    );

    let rows = tallies
        .into_iter()
        .map(|(group, tally)| MeasureRow::new(group, tally.numerator, tally.denominator))
        .collect();
    MeasureTable::new(&measure.id, group_by, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_eval::Value;
    use pretty_assertions::assert_eq;

    fn patient(sex: Option<&str>, asthma: bool) -> ResolvedVars {
        let mut vars = ResolvedVars::new();
        if let Some(sex) = sex {
            vars.insert("sex", Value::text(sex));
        }
        vars.insert("asthma", Value::Bool(asthma));
        vars
    }

    #[test]
    fn test_missing_group_catch_all() {
        let measure = MeasureDef::new("asthma_by_sex", "asthma", POPULATION).group_by("sex");
        let population = vec![
            patient(Some("F"), true),
            patient(Some("F"), false),
            patient(None, true),
        ];
        let table = aggregate_measure(&measure, &population);

        let groups: Vec<(String, u64, u64)> = table
            .rows
            .iter()
            .map(|r| {
                (
                    r.group_label(),
                    r.numerator.value().unwrap_or_default(),
                    r.denominator.value().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            groups,
            vec![
                ("(missing)".to_string(), 1, 1),
                ("F".to_string(), 1, 2),
            ]
        );
    }

    #[test]
    fn test_empty_population_single_row() {
        let measure = MeasureDef::new("m", "asthma", POPULATION);
        let table = aggregate_measure(&measure, &[]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].rate, None);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut left = Tallies::new();
        left.insert(GroupKey::new(), GroupTally { numerator: 1, denominator: 2 });
        let mut right = Tallies::new();
        right.insert(GroupKey::new(), GroupTally { numerator: 3, denominator: 4 });
        let merged = merge_tallies(left, right);
        assert_eq!(merged[&GroupKey::new()], GroupTally { numerator: 4, denominator: 6 });
    }
}
