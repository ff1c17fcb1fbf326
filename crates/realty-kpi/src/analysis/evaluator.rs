use super::catalog::{metrics, names};
use super::domain::{IssueReason, PropertyRecord};
use super::registry::KpiDefinition;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("division by zero: {0} is zero")]
    DivisionByZero(&'static str),
    #[error("{0}")]
    DomainError(String),
    #[error("input `{0}` is unavailable")]
    MissingInput(String),
}

impl EvaluationError {
    pub const fn reason(&self) -> IssueReason {
        match self {
            EvaluationError::DivisionByZero(_) => IssueReason::DivisionByZero,
            EvaluationError::DomainError(_) => IssueReason::DomainError,
            EvaluationError::MissingInput(_) => IssueReason::MissingField,
        }
    }
}

/// Metric values already computed for the record currently being evaluated.
#[derive(Debug, Default, Clone)]
pub struct ComputedMetrics {
    values: BTreeMap<&'static str, f64>,
}

impl ComputedMetrics {
    pub fn insert(&mut self, id: &'static str, value: f64) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }
}

pub struct MetricInputs<'a> {
    record: &'a PropertyRecord,
    computed: &'a ComputedMetrics,
}

impl<'a> MetricInputs<'a> {
    pub fn new(record: &'a PropertyRecord, computed: &'a ComputedMetrics) -> Self {
        Self { record, computed }
    }

    pub fn field(&self, name: &str) -> Result<f64, EvaluationError> {
        self.record
            .number(name)
            .ok_or_else(|| EvaluationError::MissingInput(name.to_string()))
    }

    pub fn optional_field(&self, name: &str) -> f64 {
        self.record.number(name).unwrap_or(0.0)
    }

    pub fn metric(&self, id: &str) -> Result<f64, EvaluationError> {
        self.computed
            .get(id)
            .ok_or_else(|| EvaluationError::MissingInput(id.to_string()))
    }

    /// Annual gross rent, falling back to twelve months of `monthly_rent`.
    pub fn annual_rent(&self) -> Result<f64, EvaluationError> {
        match self.record.number(names::ANNUAL_RENT) {
            Some(annual) => Ok(annual),
            None => Ok(self.field(names::MONTHLY_RENT)? * 12.0),
        }
    }
}

/// Runs the formula of `definition`; a non-finite outcome is a domain error.
pub fn evaluate(
    definition: &KpiDefinition,
    inputs: &MetricInputs<'_>,
) -> Result<f64, EvaluationError> {
    let value = (definition.formula)(inputs)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::DomainError(format!(
            "{} evaluated to a non-finite value",
            definition.id
        )))
    }
}

fn ratio(numerator: f64, denominator: f64, what: &'static str) -> Result<f64, EvaluationError> {
    if denominator == 0.0 {
        return Err(EvaluationError::DivisionByZero(what));
    }
    Ok(numerator / denominator)
}

pub(crate) fn net_operating_income(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let rent = inputs.annual_rent()?;
    let vacancy = inputs.field(names::VACANCY_RATE)?;
    let expenses = inputs.field(names::OPERATING_EXPENSES)?;
    Ok(rent * (1.0 - vacancy) - expenses)
}

pub(crate) fn capitalization_rate(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let noi = inputs.metric(metrics::NOI)?;
    let price = inputs.field(names::PURCHASE_PRICE)?;
    Ok(ratio(noi, price, names::PURCHASE_PRICE)? * 100.0)
}

pub(crate) fn gross_rent_multiplier(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let price = inputs.field(names::PURCHASE_PRICE)?;
    ratio(price, inputs.annual_rent()?, names::ANNUAL_RENT)
}

pub(crate) fn operating_expense_ratio(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let effective_income = inputs.annual_rent()? * (1.0 - inputs.field(names::VACANCY_RATE)?);
    let expenses = inputs.field(names::OPERATING_EXPENSES)?;
    Ok(ratio(expenses, effective_income, "effective gross income")? * 100.0)
}

/// Level monthly payment on the financed amount, annualized.
pub(crate) fn annual_debt_service(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let principal = inputs.field(names::PURCHASE_PRICE)? - inputs.field(names::DOWN_PAYMENT)?;
    if principal < 0.0 {
        return Err(EvaluationError::DomainError(
            "down payment exceeds purchase price".to_string(),
        ));
    }
    if principal == 0.0 {
        return Ok(0.0);
    }

    let payments = inputs.field(names::LOAN_TERM_YEARS)? * 12.0;
    if payments == 0.0 {
        return Err(EvaluationError::DivisionByZero(names::LOAN_TERM_YEARS));
    }

    let monthly_rate = inputs.field(names::LOAN_INTEREST_RATE)? / 12.0;
    let monthly_payment = if monthly_rate == 0.0 {
        principal / payments
    } else {
        let discount = 1.0 - (1.0 + monthly_rate).powf(-payments);
        ratio(principal * monthly_rate, discount, "amortization discount factor")?
    };

    Ok(monthly_payment * 12.0)
}

pub(crate) fn annual_cash_flow(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    Ok(inputs.metric(metrics::NOI)? - inputs.metric(metrics::ANNUAL_DEBT_SERVICE)?)
}

pub(crate) fn total_cash_invested(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    Ok(inputs.field(names::DOWN_PAYMENT)? + inputs.optional_field(names::CLOSING_COSTS))
}

pub(crate) fn cash_on_cash_return(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let cash_flow = inputs.metric(metrics::ANNUAL_CASH_FLOW)?;
    let invested = inputs.metric(metrics::TOTAL_CASH_INVESTED)?;
    Ok(ratio(cash_flow, invested, metrics::TOTAL_CASH_INVESTED)? * 100.0)
}

pub(crate) fn debt_service_coverage_ratio(
    inputs: &MetricInputs<'_>,
) -> Result<f64, EvaluationError> {
    let noi = inputs.metric(metrics::NOI)?;
    let debt_service = inputs.metric(metrics::ANNUAL_DEBT_SERVICE)?;
    ratio(noi, debt_service, metrics::ANNUAL_DEBT_SERVICE)
}

pub(crate) fn annual_appreciation(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    Ok(inputs.field(names::PURCHASE_PRICE)? * inputs.field(names::APPRECIATION_RATE)?)
}

pub(crate) fn return_on_investment(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let gain =
        inputs.metric(metrics::ANNUAL_CASH_FLOW)? + inputs.metric(metrics::ANNUAL_APPRECIATION)?;
    let invested = inputs.metric(metrics::TOTAL_CASH_INVESTED)?;
    Ok(ratio(gain, invested, metrics::TOTAL_CASH_INVESTED)? * 100.0)
}

pub(crate) fn payback_period(inputs: &MetricInputs<'_>) -> Result<f64, EvaluationError> {
    let cash_flow = inputs.metric(metrics::ANNUAL_CASH_FLOW)?;
    if cash_flow <= 0.0 {
        return Err(EvaluationError::DomainError(
            "annual cash flow must be positive for the investment to pay back".to_string(),
        ));
    }
    Ok(inputs.metric(metrics::TOTAL_CASH_INVESTED)? / cash_flow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
    }

    fn rental() -> PropertyRecord {
        PropertyRecord::new()
            .with_number(names::PURCHASE_PRICE, 200_000.0)
            .with_number(names::ANNUAL_RENT, 24_000.0)
            .with_number(names::VACANCY_RATE, 0.05)
            .with_number(names::OPERATING_EXPENSES, 6_000.0)
    }

    #[test]
    fn noi_applies_vacancy_before_expenses() {
        let computed = ComputedMetrics::default();
        let value = net_operating_income(&MetricInputs::new(&rental(), &computed)).expect("noi");
        assert!(close(value, 16_800.0));
    }

    #[test]
    fn monthly_rent_is_annualized_when_annual_rent_absent() {
        let mut record = rental();
        record.remove(names::ANNUAL_RENT);
        let record = record.with_number(names::MONTHLY_RENT, 2_000.0);
        let computed = ComputedMetrics::default();

        let value = gross_rent_multiplier(&MetricInputs::new(&record, &computed)).expect("grm");
        assert!(close(value, 200_000.0 / 24_000.0));
    }

    #[test]
    fn cap_rate_rejects_zero_price() {
        let record = rental().with_number(names::PURCHASE_PRICE, 0.0);
        let mut computed = ComputedMetrics::default();
        computed.insert(metrics::NOI, 16_800.0);

        let error = capitalization_rate(&MetricInputs::new(&record, &computed)).unwrap_err();
        assert_eq!(error, EvaluationError::DivisionByZero(names::PURCHASE_PRICE));
        assert_eq!(error.reason(), IssueReason::DivisionByZero);
    }

    #[test]
    fn debt_service_matches_standard_amortization() {
        let record = rental()
            .with_number(names::DOWN_PAYMENT, 40_000.0)
            .with_number(names::LOAN_INTEREST_RATE, 0.06)
            .with_number(names::LOAN_TERM_YEARS, 30.0);
        let computed = ComputedMetrics::default();

        let annual = annual_debt_service(&MetricInputs::new(&record, &computed)).expect("ads");
        // 160k at 6% over 30 years: 959.28 per month
        assert!((annual / 12.0 - 959.28).abs() < 0.01, "monthly payment {}", annual / 12.0);
    }

    #[test]
    fn interest_free_loans_amortize_linearly() {
        let record = rental()
            .with_number(names::DOWN_PAYMENT, 80_000.0)
            .with_number(names::LOAN_INTEREST_RATE, 0.0)
            .with_number(names::LOAN_TERM_YEARS, 10.0);
        let computed = ComputedMetrics::default();

        let annual = annual_debt_service(&MetricInputs::new(&record, &computed)).expect("ads");
        assert!(close(annual, 12_000.0));
    }

    #[test]
    fn debt_service_rejects_down_payment_above_price() {
        let record = rental()
            .with_number(names::DOWN_PAYMENT, 250_000.0)
            .with_number(names::LOAN_INTEREST_RATE, 0.05)
            .with_number(names::LOAN_TERM_YEARS, 30.0);
        let computed = ComputedMetrics::default();

        let error = annual_debt_service(&MetricInputs::new(&record, &computed)).unwrap_err();
        assert_eq!(error.reason(), IssueReason::DomainError);
    }

    #[test]
    fn payback_requires_positive_cash_flow() {
        let record = PropertyRecord::new();
        let mut computed = ComputedMetrics::default();
        computed.insert(metrics::ANNUAL_CASH_FLOW, -1_500.0);
        computed.insert(metrics::TOTAL_CASH_INVESTED, 50_000.0);

        let error = payback_period(&MetricInputs::new(&record, &computed)).unwrap_err();
        assert!(matches!(error, EvaluationError::DomainError(_)));

        computed.insert(metrics::ANNUAL_CASH_FLOW, 5_000.0);
        let years = payback_period(&MetricInputs::new(&record, &computed)).expect("payback");
        assert!(close(years, 10.0));
    }

    #[test]
    fn roi_counts_appreciation_alongside_cash_flow() {
        let record = PropertyRecord::new();
        let mut computed = ComputedMetrics::default();
        computed.insert(metrics::ANNUAL_CASH_FLOW, 3_000.0);
        computed.insert(metrics::ANNUAL_APPRECIATION, 7_000.0);
        computed.insert(metrics::TOTAL_CASH_INVESTED, 50_000.0);

        let roi = return_on_investment(&MetricInputs::new(&record, &computed)).expect("roi");
        assert!(close(roi, 20.0));
    }
}
