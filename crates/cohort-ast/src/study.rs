//! Declarative study model
//!
//! A [`StudyDefinition`] is the rule set as authored: a population rule, an ordered
//! set of named variables and a list of measures. Expressions and relative dates are
//! kept as source text here; they are parsed and validated when the study is compiled.
//!
//! The model deserializes from JSON of the form
//!
//! ```json
//! {
//!   "index_date": "2015-01-01",
//!   "population": { "type": "satisfying", "expression": "registered AND NOT has_died" },
//!   "variables": {
//!     "registered": { "type": "registered_as_of", "reference_date": "last_day_of_month(index_date)" },
//!     "has_died": { "type": "died_from_any_cause", "on_or_before": "index_date" }
//!   },
//!   "measures": [
//!     { "id": "mortality_rate", "numerator": "has_died", "denominator": "population" }
//!   ]
//! }
//! ```

use crate::{DateFormat, DatePrecision};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved name meaning "every patient in the population"
pub const POPULATION: &str = "population";

/// Category value marking the fallback label of a `categorised_as` rule
pub const DEFAULT_CATEGORY: &str = "DEFAULT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    /// Default index date when a run does not supply one
    #[serde(default)]
    pub index_date: Option<NaiveDate>,
    #[serde(default)]
    pub population: PopulationDef,
    /// Declared variables, in extract column order
    #[serde(default)]
    pub variables: IndexMap<String, VariableDef>,
    #[serde(default)]
    pub measures: Vec<MeasureDef>,
}

impl StudyDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index_date(mut self, date: NaiveDate) -> Self {
        self.index_date = Some(date);
        self
    }

    pub fn with_population(mut self, population: PopulationDef) -> Self {
        self.population = population;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, def: VariableDef) -> Self {
        self.variables.insert(name.into(), def);
        self
    }

    pub fn with_measure(mut self, measure: MeasureDef) -> Self {
        self.measures.push(measure);
        self
    }
}

/// Population membership rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopulationDef {
    /// Every patient known to the event store
    #[default]
    All,
    /// Patients for whom the expression holds
    Satisfying {
        expression: String,
        #[serde(default)]
        variables: IndexMap<String, VariableDef>,
    },
}

impl PopulationDef {
    pub fn satisfying(expression: impl Into<String>) -> Self {
        Self::Satisfying {
            expression: expression.into(),
            variables: IndexMap::new(),
        }
    }
}

/// A declared variable: one tagged variant per kind of derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableDef {
    WithTheseClinicalEvents(ClinicalEventsDef),
    WithTheseCodesOnDeathCertificate(DeathCertificateDef),
    DiedFromAnyCause(DiedDef),
    Sex,
    AgeAsOf {
        reference_date: String,
    },
    RegisteredAsOf {
        reference_date: String,
    },
    RegisteredPracticeAsOf {
        reference_date: String,
        #[serde(default)]
        returning: PracticeReturning,
    },
    AddressAsOf {
        reference_date: String,
        #[serde(default)]
        returning: AddressReturning,
        #[serde(default)]
        round_to_nearest: Option<u32>,
    },
    /// Boolean expression over other variables
    Satisfying {
        expression: String,
        #[serde(default)]
        variables: IndexMap<String, VariableDef>,
    },
    /// Ordered `label -> expression` rules; one label may map to `"DEFAULT"`
    CategorisedAs {
        categories: IndexMap<String, String>,
        #[serde(default)]
        variables: IndexMap<String, VariableDef>,
    },
}

impl VariableDef {
    pub fn satisfying(expression: impl Into<String>) -> Self {
        Self::Satisfying {
            expression: expression.into(),
            variables: IndexMap::new(),
        }
    }

    /// Categorisation from `(label, expression)` pairs in declared order
    pub fn categorised_as<'a>(categories: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::CategorisedAs {
            categories: categories
                .into_iter()
                .map(|(label, expr)| (label.to_string(), expr.to_string()))
                .collect(),
            variables: IndexMap::new(),
        }
    }

    pub fn age_as_of(reference_date: impl Into<String>) -> Self {
        Self::AgeAsOf {
            reference_date: reference_date.into(),
        }
    }

    pub fn registered_as_of(reference_date: impl Into<String>) -> Self {
        Self::RegisteredAsOf {
            reference_date: reference_date.into(),
        }
    }

    /// Attach a nested sub-variable (only `satisfying` and `categorised_as` nest)
    pub fn with_nested(mut self, name: impl Into<String>, def: VariableDef) -> Self {
        if let Self::Satisfying { variables, .. } | Self::CategorisedAs { variables, .. } =
            &mut self
        {
            variables.insert(name.into(), def);
        }
        self
    }

    /// Nested sub-variable declarations, if any
    pub fn nested(&self) -> Option<&IndexMap<String, VariableDef>> {
        match self {
            Self::Satisfying { variables, .. } | Self::CategorisedAs { variables, .. } => {
                Some(variables)
            }
            _ => None,
        }
    }

    /// Declaration keyword, as used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::WithTheseClinicalEvents(_) => "with_these_clinical_events",
            Self::WithTheseCodesOnDeathCertificate(_) => "with_these_codes_on_death_certificate",
            Self::DiedFromAnyCause(_) => "died_from_any_cause",
            Self::Sex => "sex",
            Self::AgeAsOf { .. } => "age_as_of",
            Self::RegisteredAsOf { .. } => "registered_as_of",
            Self::RegisteredPracticeAsOf { .. } => "registered_practice_as_of",
            Self::AddressAsOf { .. } => "address_as_of",
            Self::Satisfying { .. } => "satisfying",
            Self::CategorisedAs { .. } => "categorised_as",
        }
    }
}

/// Date-range constraint on an event query. At most one of the three forms is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between: Option<(String, String)>,
}

impl PeriodDef {
    pub fn on_or_before(date: impl Into<String>) -> Self {
        Self {
            on_or_before: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn on_or_after(date: impl Into<String>) -> Self {
        Self {
            on_or_after: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            between: Some((start.into(), end.into())),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventReturning {
    #[default]
    BinaryFlag,
    Date,
    Category,
    Code,
    NumberOfMatchesInPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEventsDef {
    pub codelist: String,
    #[serde(flatten)]
    pub period: PeriodDef,
    #[serde(default)]
    pub returning: EventReturning,
    #[serde(default)]
    pub find_first_match_in_period: bool,
    #[serde(default)]
    pub find_last_match_in_period: bool,
    #[serde(default)]
    pub include_date_of_match: bool,
    #[serde(default)]
    pub include_month: bool,
    #[serde(default)]
    pub include_day: bool,
    #[serde(default)]
    pub date_format: Option<DateFormat>,
}

impl ClinicalEventsDef {
    pub fn new(codelist: impl Into<String>) -> Self {
        Self {
            codelist: codelist.into(),
            period: PeriodDef::default(),
            returning: EventReturning::BinaryFlag,
            find_first_match_in_period: false,
            find_last_match_in_period: false,
            include_date_of_match: false,
            include_month: false,
            include_day: false,
            date_format: None,
        }
    }

    pub fn period(mut self, period: PeriodDef) -> Self {
        self.period = period;
        self
    }

    pub fn returning(mut self, returning: EventReturning) -> Self {
        self.returning = returning;
        self
    }

    pub fn find_first(mut self) -> Self {
        self.find_first_match_in_period = true;
        self
    }

    pub fn find_last(mut self) -> Self {
        self.find_last_match_in_period = true;
        self
    }

    /// Expose the matched date as `<name>_date` at day precision
    pub fn include_date_of_match(mut self) -> Self {
        self.include_date_of_match = true;
        self.date_format = Some(DateFormat::YearMonthDay);
        self
    }

    /// Reporting precision of the matched date
    pub fn date_precision(&self) -> DatePrecision {
        match self.date_format {
            Some(format) => format.into(),
            None if self.include_day => DatePrecision::Day,
            None if self.include_month => DatePrecision::Month,
            None => DatePrecision::Year,
        }
    }
}

impl From<ClinicalEventsDef> for VariableDef {
    fn from(def: ClinicalEventsDef) -> Self {
        VariableDef::WithTheseClinicalEvents(def)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathReturning {
    #[default]
    BinaryFlag,
    DateOfDeath,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiedDef {
    #[serde(flatten)]
    pub period: PeriodDef,
    #[serde(default)]
    pub returning: DeathReturning,
    #[serde(default)]
    pub date_format: Option<DateFormat>,
}

impl From<DiedDef> for VariableDef {
    fn from(def: DiedDef) -> Self {
        VariableDef::DiedFromAnyCause(def)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathCertificateDef {
    pub codelist: String,
    #[serde(flatten)]
    pub period: PeriodDef,
    #[serde(default)]
    pub match_only_underlying_cause: bool,
    #[serde(default)]
    pub returning: DeathReturning,
    #[serde(default)]
    pub date_format: Option<DateFormat>,
}

impl From<DeathCertificateDef> for VariableDef {
    fn from(def: DeathCertificateDef) -> Self {
        VariableDef::WithTheseCodesOnDeathCertificate(def)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeReturning {
    #[default]
    Nuts1RegionName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressReturning {
    #[default]
    IndexOfMultipleDeprivation,
}

/// Grouping of a measure's rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GroupBySpec", into = "GroupBySpec")]
pub enum GroupBy {
    /// A single implicit group holding the whole population
    #[default]
    Population,
    /// One group per distinct combination of these variables' values
    Variables(Vec<String>),
}

impl GroupBy {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variables(vec![name.into()])
    }

    pub fn variables(&self) -> &[String] {
        match self {
            GroupBy::Population => &[],
            GroupBy::Variables(names) => names,
        }
    }
}

/// Wire form of [`GroupBy`]: a name, `"population"`, or a list of names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GroupBySpec {
    One(String),
    Many(Vec<String>),
}

impl From<GroupBySpec> for GroupBy {
    fn from(spec: GroupBySpec) -> Self {
        let names = match spec {
            GroupBySpec::One(name) => vec![name],
            GroupBySpec::Many(names) => names,
        };
        if names.is_empty() || names.iter().all(|n| n == POPULATION) {
            GroupBy::Population
        } else {
            GroupBy::Variables(names)
        }
    }
}

impl From<GroupBy> for GroupBySpec {
    fn from(group_by: GroupBy) -> Self {
        match group_by {
            GroupBy::Population => GroupBySpec::One(POPULATION.to_string()),
            GroupBy::Variables(names) if names.len() == 1 => {
                GroupBySpec::One(names.into_iter().next().unwrap_or_default())
            }
            GroupBy::Variables(names) => GroupBySpec::Many(names),
        }
    }
}

/// A numerator/denominator rate, optionally stratified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDef {
    pub id: String,
    pub numerator: String,
    /// Variable name or `"population"`
    pub denominator: String,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub small_number_suppression: bool,
}

impl MeasureDef {
    pub fn new(
        id: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            group_by: GroupBy::Population,
            small_number_suppression: false,
        }
    }

    pub fn group_by(mut self, variable: impl Into<String>) -> Self {
        self.group_by = GroupBy::variable(variable);
        self
    }

    pub fn with_suppression(mut self) -> Self {
        self.small_number_suppression = true;
        self
    }
}
