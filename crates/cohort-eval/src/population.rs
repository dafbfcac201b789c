//! Population membership

use crate::context::ResolvedVars;
use crate::expression::CompiledExpression;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PopulationFilter {
    /// Every patient the store knows
    #[default]
    All,
    Satisfying(CompiledExpression),
}

impl PopulationFilter {
    /// A patient belongs when every referenced variable is resolved and the
    /// expression holds. Never fails.
    pub fn is_in_population(&self, vars: &ResolvedVars) -> bool {
        match self {
            Self::All => true,
            Self::Satisfying(expr) => {
                expr.references().iter().all(|name| !vars.get(name).is_missing())
                    && expr.is_satisfied(vars)
            }
        }
    }

    pub fn references(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Satisfying(expr) => expr.references(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn prostate_population() -> PopulationFilter {
        PopulationFilter::Satisfying(
            CompiledExpression::compile(
                "population",
                r#"age >= 18 AND age <= 120 AND sex = "M" AND prostate_ca"#,
            )
            .unwrap(),
        )
    }

    fn patient(age: Option<i64>) -> ResolvedVars {
        [
            ("age", age.map_or(Value::Missing, Value::number)),
            ("sex", Value::text("M")),
            ("prostate_ca", Value::Bool(true)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_adult_included() {
        assert!(prostate_population().is_in_population(&patient(Some(70))));
    }

    #[test]
    fn test_child_excluded() {
        assert!(!prostate_population().is_in_population(&patient(Some(15))));
    }

    #[test]
    fn test_missing_reference_excluded() {
        let filter = PopulationFilter::Satisfying(
            CompiledExpression::compile("population", "NOT died").unwrap(),
        );
        assert!(!filter.is_in_population(&ResolvedVars::new()));
        assert!(PopulationFilter::All.is_in_population(&ResolvedVars::new()));
    }
}
