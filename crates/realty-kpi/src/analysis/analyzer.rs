use super::aggregate;
use super::currency::{CurrencyCode, CurrencyError, CurrencyNormalizer, ExchangeRates};
use super::domain::{
    IssueReason, MetricOutcome, MetricResult, PropertyRecord, RecordResult, ValidationIssue,
    CURRENCY_FIELD,
};
use super::evaluator::{self, ComputedMetrics, MetricInputs};
use super::registry::{KpiDefinition, MetricRegistry, RegistryError};
use super::result::AnalysisResult;
use super::validator::RecordValidator;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 512;

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Working currency when neither the caller nor the dataset names one.
    pub default_currency: CurrencyCode,
    /// Datasets at least this large are evaluated on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("no KPIs selected for analysis")]
    NoMetricsSelected,
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),
    #[error("metric registry misconfigured: {0}")]
    Configuration(RegistryError),
    #[error("analysis of {total} records was cancelled")]
    Cancelled { total: usize },
}

impl From<RegistryError> for AnalysisError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::UnknownMetric(id) => Self::UnknownMetric(id),
            other => Self::Configuration(other),
        }
    }
}

/// Inputs of one analysis beyond the dataset and the KPI selection.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub dataset: &'a [PropertyRecord],
    pub selected: &'a [String],
    pub exchange_rates: Option<&'a ExchangeRates>,
    pub target_currency: Option<&'a CurrencyCode>,
    pub cancellation: Option<&'a AtomicBool>,
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(dataset: &'a [PropertyRecord], selected: &'a [String]) -> Self {
        Self {
            dataset,
            selected,
            exchange_rates: None,
            target_currency: None,
            cancellation: None,
        }
    }

    pub fn with_exchange_rates(mut self, rates: &'a ExchangeRates) -> Self {
        self.exchange_rates = Some(rates);
        self
    }

    pub fn with_target_currency(mut self, currency: &'a CurrencyCode) -> Self {
        self.target_currency = Some(currency);
        self
    }

    /// Flag checked between records; setting it aborts the analysis.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancellation = Some(flag);
        self
    }
}

/// Stateless orchestrator turning a dataset and a KPI selection into an `AnalysisResult`.
#[derive(Debug, Clone)]
pub struct Analyzer {
    registry: Arc<MetricRegistry>,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self::with_options(registry, AnalyzerOptions::default())
    }

    pub fn with_options(registry: Arc<MetricRegistry>, options: AnalyzerOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn analyze(
        &self,
        dataset: &[PropertyRecord],
        selected: &[String],
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with(AnalysisRequest::new(dataset, selected))
    }

    pub fn analyze_with(
        &self,
        request: AnalysisRequest<'_>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let selected = dedupe(request.selected);
        if selected.is_empty() {
            warn!("analysis requested without any KPI selected");
            return Err(AnalysisError::NoMetricsSelected);
        }

        let plan = self.registry.dependency_order(&selected).map_err(|err| {
            warn!(error = %err, "analysis requested with an invalid KPI selection");
            AnalysisError::from(err)
        })?;

        let working_currency = request
            .target_currency
            .cloned()
            .or_else(|| first_dataset_currency(request.dataset))
            .unwrap_or_else(|| self.options.default_currency.clone());

        let no_rates = ExchangeRates::default();
        let rates = request.exchange_rates.unwrap_or(&no_rates);
        let pass = RecordPass {
            registry: &self.registry,
            plan: &plan,
            selected: &selected,
            normalizer: CurrencyNormalizer::new(&self.registry, rates),
            validator: RecordValidator::new(&self.registry),
            working_currency: &working_currency,
        };

        let total = request.dataset.len();
        let evaluate = |(index, record): (usize, &PropertyRecord)| {
            if request
                .cancellation
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                return Err(AnalysisError::Cancelled { total });
            }
            Ok(pass.run(index, record))
        };

        let parallel = total >= self.options.parallel_threshold;
        let records: Vec<RecordResult> = if parallel {
            request
                .dataset
                .par_iter()
                .enumerate()
                .map(&evaluate)
                .collect::<Result<_, _>>()?
        } else {
            request
                .dataset
                .iter()
                .enumerate()
                .map(&evaluate)
                .collect::<Result<_, _>>()?
        };

        let aggregates = aggregate::summarize(&selected, &self.registry, &records);

        debug!(
            records = total,
            selected = selected.len(),
            evaluated = plan.len(),
            currency = %working_currency,
            parallel,
            "analysis complete"
        );

        Ok(AnalysisResult::new(
            selected,
            working_currency,
            records,
            aggregates,
        ))
    }
}

fn dedupe(selected: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    selected
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn first_dataset_currency(dataset: &[PropertyRecord]) -> Option<CurrencyCode> {
    dataset
        .iter()
        .filter_map(PropertyRecord::currency_code)
        .find_map(|raw| CurrencyCode::parse(raw).ok())
}

/// Why a metric could not be produced for one record.
struct Unavailable {
    /// Issues raised while evaluating this metric itself.
    own: Vec<ValidationIssue>,
    /// Root causes carried over from failed prerequisites.
    inherited: Vec<ValidationIssue>,
}

impl Unavailable {
    fn own(issues: Vec<ValidationIssue>) -> Self {
        Self {
            own: issues,
            inherited: Vec::new(),
        }
    }

    fn all_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = self.own.clone();
        for issue in &self.inherited {
            if !issues.contains(issue) {
                issues.push(issue.clone());
            }
        }
        issues
    }
}

/// Shared, read-only state for evaluating every record of one analysis.
struct RecordPass<'a> {
    registry: &'a MetricRegistry,
    plan: &'a [&'a KpiDefinition],
    selected: &'a [String],
    normalizer: CurrencyNormalizer<'a>,
    validator: RecordValidator<'a>,
    working_currency: &'a CurrencyCode,
}

impl RecordPass<'_> {
    fn run(&self, index: usize, record: &PropertyRecord) -> RecordResult {
        let (normalized, currency_failure) =
            match self.normalizer.normalize(record, self.working_currency) {
                Ok(normalized) => (Cow::Owned(normalized), None),
                Err(err) => (Cow::Borrowed(record), Some(err)),
            };

        let mut computed = ComputedMetrics::default();
        let mut failures: BTreeMap<&'static str, Unavailable> = BTreeMap::new();
        let mut issues = Vec::new();

        for definition in self.plan {
            match self.evaluate(
                index,
                definition,
                &normalized,
                currency_failure.as_ref(),
                &computed,
                &failures,
            ) {
                Ok(value) => computed.insert(definition.id, value),
                Err(unavailable) => {
                    issues.extend(unavailable.own.iter().cloned());
                    failures.insert(definition.id, unavailable);
                }
            }
        }

        let metrics = self
            .selected
            .iter()
            .map(|id| {
                let outcome = match computed.get(id) {
                    Some(value) => MetricOutcome::Available { value },
                    None => MetricOutcome::Unavailable {
                        issues: failures
                            .get(id.as_str())
                            .map(Unavailable::all_issues)
                            .unwrap_or_default(),
                    },
                };
                MetricResult {
                    metric: id.clone(),
                    record_index: index,
                    outcome,
                }
            })
            .collect();

        RecordResult {
            record_index: index,
            source_currency: record.currency_code().map(str::to_string),
            metrics,
            issues,
        }
    }

    fn evaluate(
        &self,
        index: usize,
        definition: &KpiDefinition,
        record: &PropertyRecord,
        currency_failure: Option<&CurrencyError>,
        computed: &ComputedMetrics,
        failures: &BTreeMap<&'static str, Unavailable>,
    ) -> Result<f64, Unavailable> {
        let failed: Vec<(&str, &Unavailable)> = definition
            .dependencies
            .iter()
            .filter_map(|dependency| failures.get(dependency).map(|f| (*dependency, f)))
            .collect();

        if !failed.is_empty() {
            let own = failed
                .iter()
                .map(|(dependency, _)| {
                    ValidationIssue::for_metric(
                        index,
                        definition.id,
                        None,
                        IssueReason::DependencyUnavailable,
                        format!("prerequisite metric {dependency} is unavailable"),
                    )
                })
                .collect();

            let mut inherited: Vec<ValidationIssue> = Vec::new();
            for (_, unavailable) in &failed {
                for issue in unavailable.all_issues() {
                    if issue.reason != IssueReason::DependencyUnavailable
                        && !inherited.contains(&issue)
                    {
                        inherited.push(issue);
                    }
                }
            }

            return Err(Unavailable { own, inherited });
        }

        if let Some(err) = currency_failure {
            if self.registry.is_monetary(definition.id) {
                let reason = match err {
                    CurrencyError::UnknownCurrency(_) => IssueReason::UnknownCurrency,
                    CurrencyError::MissingExchangeRate { .. }
                    | CurrencyError::InvalidRate { .. } => IssueReason::MissingExchangeRate,
                };
                return Err(Unavailable::own(vec![ValidationIssue::for_metric(
                    index,
                    definition.id,
                    Some(CURRENCY_FIELD),
                    reason,
                    err.to_string(),
                )]));
            }
        }

        let field_issues = self.validator.validate_for(record, definition);
        if !field_issues.is_empty() {
            return Err(Unavailable::own(
                field_issues
                    .into_iter()
                    .map(|issue| {
                        ValidationIssue::for_metric(
                            index,
                            definition.id,
                            Some(&issue.field),
                            issue.reason,
                            issue.detail,
                        )
                    })
                    .collect(),
            ));
        }

        evaluator::evaluate(definition, &MetricInputs::new(record, computed)).map_err(|err| {
            Unavailable::own(vec![ValidationIssue::for_metric(
                index,
                definition.id,
                None,
                err.reason(),
                err.to_string(),
            )])
        })
    }
}
