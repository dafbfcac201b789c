//! Ordered categorisation rules

use crate::context::ResolvedVars;
use crate::expression::CompiledExpression;
use cohort_ast::DEFAULT_CATEGORY;
use cohort_diagnostics::{CohortError, Result};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub label: String,
    pub condition: CompiledExpression,
}

/// Maps resolved values to one label: the first rule that holds, else the default.
///
/// A category whose expression is the literal `DEFAULT` names the fallback label.
/// Without one, the fallback is `DEFAULT` itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Categoriser {
    rules: Vec<CategoryRule>,
    default_label: String,
}

impl Categoriser {
    /// Compile `label -> expression` rules declared for `variable`
    pub fn compile(variable: &str, categories: &IndexMap<String, String>) -> Result<Self> {
        let mut rules = Vec::with_capacity(categories.len());
        let mut default_label: Option<&str> = None;

        for (label, source) in categories {
            if source.trim() == DEFAULT_CATEGORY {
                if let Some(previous) = default_label {
                    return Err(CohortError::invalid_declaration(
                        variable,
                        format!(
                            "categories '{}' and '{}' are both marked DEFAULT",
                            previous, label
                        ),
                    ));
                }
                default_label = Some(label);
                continue;
            }
            rules.push(CategoryRule {
                label: label.clone(),
                condition: CompiledExpression::compile(variable, source)?,
            });
        }

        if rules.is_empty() && default_label.is_none() {
            return Err(CohortError::invalid_declaration(
                variable,
                "categorised_as declares no categories",
            ));
        }

        Ok(Self {
            rules,
            default_label: default_label.unwrap_or(DEFAULT_CATEGORY).to_string(),
        })
    }

    pub fn categorise(&self, vars: &ResolvedVars) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.condition.is_satisfied(vars))
            .map_or(self.default_label.as_str(), |rule| rule.label.as_str())
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Variables referenced by any rule, deduplicated
    pub fn references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for name in rule.condition.references() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn age_bands() -> Categoriser {
        let categories: IndexMap<String, String> = [
            ("0-17", "age < 18"),
            ("18-64", "age >= 18 AND age < 65"),
            ("65+", "age >= 65"),
            ("missing", "DEFAULT"),
        ]
        .into_iter()
        .map(|(l, e)| (l.to_string(), e.to_string()))
        .collect();
        Categoriser::compile("age_group", &categories).unwrap()
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let cat = age_bands();
        let vars: ResolvedVars = [("age", Value::number(70))].into_iter().collect();
        assert_eq!(cat.categorise(&vars), "65+");
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let cat = age_bands();
        assert_eq!(cat.categorise(&ResolvedVars::new()), "missing");
        assert_eq!(cat.default_label(), "missing");
        assert_eq!(cat.references(), vec!["age"]);
    }

    #[test]
    fn test_two_defaults_rejected() {
        let categories: IndexMap<String, String> = [("a", "DEFAULT"), ("b", "DEFAULT")]
            .into_iter()
            .map(|(l, e)| (l.to_string(), e.to_string()))
            .collect();
        assert!(Categoriser::compile("x", &categories).unwrap_err().is_config_error());
    }
}
