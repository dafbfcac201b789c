//! Tests for building and evaluating variable graphs
//!
//! Covers:
//! - Configuration errors raised at build time
//! - Topological ordering, including implicit date-of-match columns
//! - Clinical event match policies and returning forms
//! - Nested categorisation
//! - Death certificate causes and date precision
//! - Event store timeouts

use chrono::NaiveDate;
use cohort_ast::{
    ClinicalEventsDef, CodeSystem, Codelist, CodelistSet, DateFormat, DatePrecision,
    DeathCertificateDef, DeathReturning, DiedDef, EventReturning, PeriodDef, PopulationDef,
    StudyDefinition, VariableDef,
};
use cohort_diagnostics::{COH0100, COH0101, COH0102, COH0105, COH0106, COH0107};
use cohort_eval::{
    DateResolver, InMemoryEventStore, PatientId, PatientRecord, StoreFailure, Value,
    VariableGraph, EventStoreError,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn codelists() -> CodelistSet {
    CodelistSet::new()
        .with(
            "prostate_cancer_codes",
            Codelist::from_codes(CodeSystem::Snomed, ["399068003", "254900004"]).unwrap(),
        )
        .unwrap()
        .with(
            "ethnicity_codes",
            Codelist::new(
                CodeSystem::Ctv3,
                [
                    ("XaJQv", Some("1")),
                    ("XaJR2", Some("3")),
                    ("XaJRB", None),
                ],
            )
            .unwrap(),
        )
        .unwrap()
        .with(
            "prostate_cancer_icd10",
            Codelist::from_codes(CodeSystem::Icd10, ["C61"]).unwrap(),
        )
        .unwrap()
        .with(
            "myocardial_infarction_icd10",
            Codelist::from_codes(CodeSystem::Icd10, ["I21"]).unwrap(),
        )
        .unwrap()
}

fn resolver() -> DateResolver {
    DateResolver::new(date(2020, 1, 1), date(2020, 1, 1))
}

fn build(study: &StudyDefinition) -> VariableGraph {
    VariableGraph::build(study, &codelists()).unwrap_or_else(|e| panic!("build failed: {}", e))
}

fn on_death_certificate(
    codelist: &str,
    underlying_only: bool,
    returning: DeathReturning,
    date_format: Option<DateFormat>,
) -> VariableDef {
    DeathCertificateDef {
        codelist: codelist.to_string(),
        period: PeriodDef::default(),
        match_only_underlying_cause: underlying_only,
        returning,
        date_format,
    }
    .into()
}

fn prostate_ca() -> ClinicalEventsDef {
    ClinicalEventsDef::new("prostate_cancer_codes")
        .period(PeriodDef::between("2015-01-01", "2022-12-31"))
        .find_first()
        .include_date_of_match()
}

// === Build errors ===

#[test]
fn test_mutual_dependency_reports_cycle() {
    let study = StudyDefinition::new()
        .with_variable("a", VariableDef::satisfying("b"))
        .with_variable("b", VariableDef::satisfying("a"));
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0102);
    assert!(err.to_string().contains("a -> b -> a"), "{}", err);
}

#[test]
fn test_undeclared_reference() {
    let study = StudyDefinition::new().with_variable("a", VariableDef::satisfying("b AND c"));
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0100);
}

#[test]
fn test_undeclared_population_reference() {
    let study = StudyDefinition::new()
        .with_population(PopulationDef::satisfying("registered"));
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0100);
}

#[test]
fn test_nested_name_collision() {
    let study = StudyDefinition::new()
        .with_variable("registered", VariableDef::registered_as_of("index_date"))
        .with_variable(
            "flag",
            VariableDef::satisfying("registered")
                .with_nested("registered", VariableDef::registered_as_of("today")),
        );
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0101);
}

#[test]
fn test_malformed_date_expression() {
    let study = StudyDefinition::new().with_variable("age", VariableDef::age_as_of("2020-02-30"));
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0105);
}

#[test]
fn test_unknown_codelist() {
    let study = StudyDefinition::new()
        .with_variable("x", ClinicalEventsDef::new("no_such_codes").into());
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0106);
}

#[test]
fn test_conflicting_match_flags() {
    let study = StudyDefinition::new().with_variable(
        "x",
        ClinicalEventsDef::new("prostate_cancer_codes").find_first().find_last().into(),
    );
    let err = VariableGraph::build(&study, &codelists()).unwrap_err();
    assert_eq!(err.code(), COH0107);
}

// === Ordering ===

#[test]
fn test_date_of_match_anchor_orders_owner_first() {
    let study = StudyDefinition::new()
        .with_variable("age_at_diagnosis", VariableDef::age_as_of("prostate_ca_date"))
        .with_variable("prostate_ca", prostate_ca().into());
    let graph = build(&study);

    assert_eq!(graph.evaluation_order(), vec!["prostate_ca", "age_at_diagnosis"]);
    assert_eq!(
        graph.dependencies("age_at_diagnosis"),
        Some(["prostate_ca".to_string()].as_slice())
    );
    let columns: Vec<&str> = graph.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["age_at_diagnosis", "prostate_ca", "prostate_ca_date"]);
}

#[test]
fn test_nested_variables_hidden_from_extract() {
    let study = StudyDefinition::new().with_variable(
        "adult",
        VariableDef::satisfying("age >= 18").with_nested("age", VariableDef::age_as_of("index_date")),
    );
    let graph = build(&study);
    assert_eq!(graph.evaluation_order(), vec!["age", "adult"]);
    assert_eq!(graph.columns().len(), 1);
    assert!(graph.contains("age"));
}

// === Evaluation ===

#[tokio::test]
async fn test_first_match_in_period() {
    let study = StudyDefinition::new()
        .with_variable("prostate_ca", prostate_ca().into())
        .with_variable("age_at_diagnosis", VariableDef::age_as_of("prostate_ca_date"));
    let graph = build(&study);
    let store = InMemoryEventStore::new().with_patient(
        1,
        PatientRecord::new()
            .born(date(1950, 6, 1))
            .event("254900004", date(2021, 6, 10))
            .event("399068003", date(2019, 3, 1))
            .event("399068003", date(2014, 1, 1)),
    );

    let vars = graph
        .evaluate_patient(&store, PatientId(1), resolver(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(vars.get("prostate_ca"), &Value::Bool(true));
    assert_eq!(vars.get("prostate_ca_date"), &Value::Date(date(2019, 3, 1)));
    assert_eq!(vars.get("age_at_diagnosis"), &Value::number(68));
}

#[tokio::test]
async fn test_no_match_flag_false_date_missing() {
    let study = StudyDefinition::new()
        .with_variable("prostate_ca", prostate_ca().into())
        .with_variable("age_at_diagnosis", VariableDef::age_as_of("prostate_ca_date"));
    let graph = build(&study);
    let store = InMemoryEventStore::new()
        .with_patient(2, PatientRecord::new().born(date(1950, 6, 1)));

    let vars = graph
        .evaluate_patient(&store, PatientId(2), resolver(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(vars.get("prostate_ca"), &Value::Bool(false));
    assert!(vars.get("prostate_ca_date").is_missing());
    assert!(vars.get("age_at_diagnosis").is_missing());
}

#[tokio::test]
async fn test_death_certificate_underlying_cause() {
    let study = StudyDefinition::new()
        .with_variable(
            "any_cause",
            on_death_certificate("prostate_cancer_icd10", false, DeathReturning::BinaryFlag, None),
        )
        .with_variable(
            "underlying",
            on_death_certificate("prostate_cancer_icd10", true, DeathReturning::BinaryFlag, None),
        )
        .with_variable(
            "underlying_mi",
            on_death_certificate("myocardial_infarction_icd10", true, DeathReturning::BinaryFlag, None),
        )
        .with_variable(
            "dod",
            on_death_certificate(
                "prostate_cancer_icd10",
                false,
                DeathReturning::DateOfDeath,
                Some(DateFormat::YearMonthDay),
            ),
        )
        .with_variable(
            "died_month",
            DiedDef {
                returning: DeathReturning::DateOfDeath,
                date_format: Some(DateFormat::YearMonth),
                ..DiedDef::default()
            }
            .into(),
        );
    let graph = build(&study);
    let store = InMemoryEventStore::new().with_patient(
        3,
        PatientRecord::new()
            .born(date(1940, 2, 1))
            .died(date(2019, 5, 5))
            .cause_of_death("C61", false)
            .cause_of_death("I21", true),
    );

    let vars = graph
        .evaluate_patient(&store, PatientId(3), resolver(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(vars.get("any_cause"), &Value::Bool(true));
    assert_eq!(vars.get("underlying"), &Value::Bool(false));
    assert_eq!(vars.get("underlying_mi"), &Value::Bool(true));
    assert_eq!(vars.get("dod"), &Value::Date(date(2019, 5, 5)));

    let rendered: Vec<(String, String)> = graph
        .columns()
        .iter()
        .filter(|c| c.name == "dod" || c.name == "died_month")
        .map(|c| (c.name.clone(), vars.get(&c.name).render(c.precision)))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("dod".to_string(), "2019-05-05".to_string()),
            ("died_month".to_string(), "2019-05".to_string()),
        ]
    );
    assert_eq!(
        graph.columns().iter().find(|c| c.name == "dod").map(|c| c.precision),
        Some(DatePrecision::Day)
    );
}

#[tokio::test]
async fn test_nested_ethnicity_categorisation() {
    let study = StudyDefinition::new().with_variable(
        "ethnicity",
        VariableDef::categorised_as([("0", "DEFAULT"), ("1", "eth = '1'"), ("3", "eth = 3")])
            .with_nested(
                "eth",
                ClinicalEventsDef::new("ethnicity_codes")
                    .returning(EventReturning::Category)
                    .find_last()
                    .into(),
            ),
    );
    let graph = build(&study);
    let store = InMemoryEventStore::new()
        .with_patient(
            1,
            PatientRecord::new()
                .event("XaJQv", date(2010, 1, 1))
                .event("XaJR2", date(2012, 1, 1)),
        )
        .with_patient(2, PatientRecord::new().event("XaJRB", date(2012, 1, 1)))
        .with_patient(3, PatientRecord::new());

    let mut labels = Vec::new();
    for patient in 1..=3 {
        let vars = graph
            .evaluate_patient(&store, PatientId(patient), resolver(), TIMEOUT)
            .await
            .unwrap();
        labels.push((vars.get("eth").clone(), vars.get("ethnicity").clone()));
    }

    assert_eq!(
        labels,
        vec![
            (Value::text("3"), Value::text("3")),
            (Value::text("unclassified"), Value::text("0")),
            (Value::Missing, Value::text("0")),
        ]
    );
}

#[tokio::test]
async fn test_match_count_and_code() {
    let study = StudyDefinition::new()
        .with_variable(
            "n",
            ClinicalEventsDef::new("prostate_cancer_codes")
                .returning(EventReturning::NumberOfMatchesInPeriod)
                .into(),
        )
        .with_variable(
            "last_code",
            ClinicalEventsDef::new("prostate_cancer_codes")
                .returning(EventReturning::Code)
                .into(),
        );
    let graph = build(&study);
    let store = InMemoryEventStore::new().with_patient(
        1,
        PatientRecord::new()
            .event("399068003", date(2019, 3, 1))
            .event("254900004", date(2021, 6, 10)),
    );

    let vars = graph
        .evaluate_patient(&store, PatientId(1), resolver(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(vars.get("n"), &Value::number(2));
    assert_eq!(vars.get("last_code"), &Value::text("254900004"));
}

#[tokio::test]
async fn test_query_timeout() {
    let study = StudyDefinition::new().with_variable("sex", VariableDef::Sex);
    let graph = build(&study);
    let store = InMemoryEventStore::new().with_patient(1, PatientRecord::new().sex("F"));
    store.inject_failure(PatientId(1), StoreFailure::Delay(Duration::from_millis(200)));

    let err = graph
        .evaluate_patient(&store, PatientId(1), resolver(), Duration::from_millis(10))
        .await
        .unwrap_err();

    assert_eq!(err, EventStoreError::Timeout { patient: PatientId(1), millis: 10 });
}
