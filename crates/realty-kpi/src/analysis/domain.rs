use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field holding the ISO code that monetary values of a record are denominated in.
pub const CURRENCY_FIELD: &str = "currency_code";

/// Single cell of a property record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Number(_) => None,
        }
    }
}

/// One row of property input data, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl PropertyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, FieldValue::Number(value));
        self
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, FieldValue::Text(value.into()));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Numeric value of `name`, `None` when absent or not a number.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    pub fn currency_code(&self) -> Option<&str> {
        self.get(CURRENCY_FIELD).and_then(FieldValue::as_text)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Percentage,
    Currency,
    Ratio,
    Years,
}

impl MetricUnit {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percentage => "Percentage",
            Self::Currency => "Currency",
            Self::Ratio => "Ratio",
            Self::Years => "Years",
        }
    }
}

/// Reason code attached to every diagnostic the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    MissingField,
    NotNumeric,
    NegativeValue,
    OutOfRange,
    NonFinite,
    UnknownCurrency,
    MissingExchangeRate,
    DivisionByZero,
    DomainError,
    DependencyUnavailable,
}

impl IssueReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::NotNumeric => "not_numeric",
            Self::NegativeValue => "negative_value",
            Self::OutOfRange => "out_of_range",
            Self::NonFinite => "non_finite",
            Self::UnknownCurrency => "unknown_currency",
            Self::MissingExchangeRate => "missing_exchange_rate",
            Self::DivisionByZero => "division_by_zero",
            Self::DomainError => "domain_error",
            Self::DependencyUnavailable => "dependency_unavailable",
        }
    }

    /// Phrase completing "N of M records ..." in diagnostic summaries.
    pub const fn summary_phrase(self) -> &'static str {
        match self {
            Self::MissingField => "missing required fields",
            Self::NotNumeric => "with non-numeric inputs",
            Self::NegativeValue => "with negative inputs",
            Self::OutOfRange => "with rates outside the 0-1 range",
            Self::NonFinite => "with non-finite inputs",
            Self::UnknownCurrency => "with an unknown currency",
            Self::MissingExchangeRate => "without an exchange rate",
            Self::DivisionByZero => "dividing by zero",
            Self::DomainError => "outside the formula's domain",
            Self::DependencyUnavailable => "lacking a prerequisite metric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub record_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: IssueReason,
    pub detail: String,
}

impl ValidationIssue {
    pub fn for_metric(
        record_index: usize,
        metric: &str,
        field: Option<&str>,
        reason: IssueReason,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            record_index,
            metric: Some(metric.to_string()),
            field: field.map(str::to_string),
            reason,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome {
    Available { value: f64 },
    Unavailable { issues: Vec<ValidationIssue> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: String,
    pub record_index: usize,
    pub outcome: MetricOutcome,
}

impl MetricResult {
    pub fn value(&self) -> Option<f64> {
        match self.outcome {
            MetricOutcome::Available { value } => Some(value),
            MetricOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value().is_some()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match &self.outcome {
            MetricOutcome::Available { .. } => &[],
            MetricOutcome::Unavailable { issues } => issues,
        }
    }
}

/// Outcomes of the selected metrics for one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    pub record_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_currency: Option<String>,
    pub metrics: Vec<MetricResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

impl RecordResult {
    pub fn metric(&self, id: &str) -> Option<&MetricResult> {
        self.metrics.iter().find(|result| result.metric == id)
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.metric(id).and_then(MetricResult::value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `None` when the total overflows `f64`.
    pub sum: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateOutcome {
    NoData,
    Summary(AggregateStats),
}

impl AggregateOutcome {
    pub fn stats(&self) -> Option<&AggregateStats> {
        match self {
            AggregateOutcome::Summary(stats) => Some(stats),
            AggregateOutcome::NoData => None,
        }
    }
}

/// Portfolio-level distribution of one selected KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiAggregate {
    pub metric: String,
    pub unit: MetricUnit,
    pub available: usize,
    pub unavailable: usize,
    pub statistics: AggregateOutcome,
}
