//! KPI analysis engine: metric catalog, currency normalization, per-record validation and
//! evaluation, and portfolio aggregates.

pub mod aggregate;
pub mod analyzer;
pub mod catalog;
pub mod currency;
pub mod domain;
pub(crate) mod evaluator;
pub mod registry;
pub mod result;
pub mod router;
pub mod service;
pub(crate) mod validator;

pub use aggregate::describe;
pub use analyzer::{
    AnalysisError, AnalysisRequest, Analyzer, AnalyzerOptions, DEFAULT_PARALLEL_THRESHOLD,
};
pub use currency::{
    CurrencyCode, CurrencyError, CurrencyNormalizer, ExchangeRate, ExchangeRates,
    DEFAULT_CURRENCY,
};
pub use domain::{
    AggregateOutcome, AggregateStats, FieldValue, IssueReason, KpiAggregate, MetricOutcome,
    MetricResult, MetricUnit, PropertyRecord, RecordResult, ValidationIssue, CURRENCY_FIELD,
};
pub use evaluator::{ComputedMetrics, EvaluationError, MetricInputs};
pub use registry::{
    FieldKind, FieldRequirement, FieldSpec, Formula, KpiDefinition, KpiDefinitionView,
    MetricRegistry, RegistryError,
};
pub use result::{AnalysisResult, DiagnosticSummary};
pub use router::analysis_router;
pub use service::{
    AnalysisOutcome, AnalysisServiceError, AnalysisSubmission, PortfolioAnalysisService,
};
pub use validator::{FieldIssue, RecordValidator};
