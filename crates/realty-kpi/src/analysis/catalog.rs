use super::domain::{MetricUnit, CURRENCY_FIELD};
use super::evaluator as formulas;
use super::registry::{FieldKind, FieldRequirement, FieldSpec, KpiDefinition};

pub mod names {
    pub const PURCHASE_PRICE: &str = "purchase_price";
    pub const ANNUAL_RENT: &str = "annual_rent";
    pub const MONTHLY_RENT: &str = "monthly_rent";
    pub const VACANCY_RATE: &str = "vacancy_rate";
    pub const OPERATING_EXPENSES: &str = "operating_expenses";
    pub const DOWN_PAYMENT: &str = "down_payment";
    pub const CLOSING_COSTS: &str = "closing_costs";
    pub const LOAN_INTEREST_RATE: &str = "loan_interest_rate";
    pub const LOAN_TERM_YEARS: &str = "loan_term_years";
    pub const APPRECIATION_RATE: &str = "appreciation_rate";
}

pub mod metrics {
    pub const NOI: &str = "noi";
    pub const CAP_RATE: &str = "cap_rate";
    pub const GROSS_RENT_MULTIPLIER: &str = "gross_rent_multiplier";
    pub const OPERATING_EXPENSE_RATIO: &str = "operating_expense_ratio";
    pub const ANNUAL_DEBT_SERVICE: &str = "annual_debt_service";
    pub const ANNUAL_CASH_FLOW: &str = "annual_cash_flow";
    pub const TOTAL_CASH_INVESTED: &str = "total_cash_invested";
    pub const CASH_ON_CASH_RETURN: &str = "cash_on_cash_return";
    pub const DSCR: &str = "dscr";
    pub const ANNUAL_APPRECIATION: &str = "annual_appreciation";
    pub const ROI: &str = "roi";
    pub const PAYBACK_PERIOD: &str = "payback_period";
}

use metrics::*;
use names::*;

const RENT: FieldRequirement = FieldRequirement::OneOf(&[ANNUAL_RENT, MONTHLY_RENT]);

pub(crate) fn standard_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            name: PURCHASE_PRICE,
            label: "Purchase price",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: ANNUAL_RENT,
            label: "Annual gross rent",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: MONTHLY_RENT,
            label: "Monthly gross rent",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: VACANCY_RATE,
            label: "Vacancy rate",
            kind: FieldKind::Rate,
        },
        FieldSpec {
            name: OPERATING_EXPENSES,
            label: "Annual operating expenses",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: DOWN_PAYMENT,
            label: "Down payment",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: CLOSING_COSTS,
            label: "Closing costs",
            kind: FieldKind::Monetary,
        },
        FieldSpec {
            name: LOAN_INTEREST_RATE,
            label: "Loan interest rate (annual)",
            kind: FieldKind::Rate,
        },
        FieldSpec {
            name: LOAN_TERM_YEARS,
            label: "Loan term",
            kind: FieldKind::Years,
        },
        FieldSpec {
            name: APPRECIATION_RATE,
            label: "Annual appreciation rate",
            kind: FieldKind::SignedRate,
        },
        FieldSpec {
            name: CURRENCY_FIELD,
            label: "Currency",
            kind: FieldKind::Categorical,
        },
    ]
}

pub(crate) fn standard_definitions() -> Vec<KpiDefinition> {
    use FieldRequirement::Field;

    vec![
        KpiDefinition {
            id: NOI,
            label: "Net Operating Income",
            unit: MetricUnit::Currency,
            required: vec![RENT, Field(VACANCY_RATE), Field(OPERATING_EXPENSES)],
            optional: Vec::new(),
            dependencies: Vec::new(),
            formula: formulas::net_operating_income,
        },
        KpiDefinition {
            id: CAP_RATE,
            label: "Capitalization Rate",
            unit: MetricUnit::Percentage,
            required: vec![Field(PURCHASE_PRICE)],
            optional: Vec::new(),
            dependencies: vec![NOI],
            formula: formulas::capitalization_rate,
        },
        KpiDefinition {
            id: GROSS_RENT_MULTIPLIER,
            label: "Gross Rent Multiplier",
            unit: MetricUnit::Ratio,
            required: vec![Field(PURCHASE_PRICE), RENT],
            optional: Vec::new(),
            dependencies: Vec::new(),
            formula: formulas::gross_rent_multiplier,
        },
        KpiDefinition {
            id: OPERATING_EXPENSE_RATIO,
            label: "Operating Expense Ratio",
            unit: MetricUnit::Percentage,
            required: vec![RENT, Field(VACANCY_RATE), Field(OPERATING_EXPENSES)],
            optional: Vec::new(),
            dependencies: Vec::new(),
            formula: formulas::operating_expense_ratio,
        },
        KpiDefinition {
            id: ANNUAL_DEBT_SERVICE,
            label: "Annual Debt Service",
            unit: MetricUnit::Currency,
            required: vec![
                Field(PURCHASE_PRICE),
                Field(DOWN_PAYMENT),
                Field(LOAN_INTEREST_RATE),
                Field(LOAN_TERM_YEARS),
            ],
            optional: Vec::new(),
            dependencies: Vec::new(),
            formula: formulas::annual_debt_service,
        },
        KpiDefinition {
            id: ANNUAL_CASH_FLOW,
            label: "Annual Cash Flow",
            unit: MetricUnit::Currency,
            required: Vec::new(),
            optional: Vec::new(),
            dependencies: vec![NOI, ANNUAL_DEBT_SERVICE],
            formula: formulas::annual_cash_flow,
        },
        KpiDefinition {
            id: TOTAL_CASH_INVESTED,
            label: "Total Cash Invested",
            unit: MetricUnit::Currency,
            required: vec![Field(DOWN_PAYMENT)],
            optional: vec![CLOSING_COSTS],
            dependencies: Vec::new(),
            formula: formulas::total_cash_invested,
        },
        KpiDefinition {
            id: CASH_ON_CASH_RETURN,
            label: "Cash-on-Cash Return",
            unit: MetricUnit::Percentage,
            required: Vec::new(),
            optional: Vec::new(),
            dependencies: vec![ANNUAL_CASH_FLOW, TOTAL_CASH_INVESTED],
            formula: formulas::cash_on_cash_return,
        },
        KpiDefinition {
            id: DSCR,
            label: "Debt Service Coverage Ratio",
            unit: MetricUnit::Ratio,
            required: Vec::new(),
            optional: Vec::new(),
            dependencies: vec![NOI, ANNUAL_DEBT_SERVICE],
            formula: formulas::debt_service_coverage_ratio,
        },
        KpiDefinition {
            id: ANNUAL_APPRECIATION,
            label: "Annual Appreciation",
            unit: MetricUnit::Currency,
            required: vec![Field(PURCHASE_PRICE), Field(APPRECIATION_RATE)],
            optional: Vec::new(),
            dependencies: Vec::new(),
            formula: formulas::annual_appreciation,
        },
        KpiDefinition {
            id: ROI,
            label: "Return on Investment",
            unit: MetricUnit::Percentage,
            required: Vec::new(),
            optional: Vec::new(),
            dependencies: vec![ANNUAL_CASH_FLOW, ANNUAL_APPRECIATION, TOTAL_CASH_INVESTED],
            formula: formulas::return_on_investment,
        },
        KpiDefinition {
            id: PAYBACK_PERIOD,
            label: "Payback Period",
            unit: MetricUnit::Years,
            required: Vec::new(),
            optional: Vec::new(),
            dependencies: vec![ANNUAL_CASH_FLOW, TOTAL_CASH_INVESTED],
            formula: formulas::payback_period,
        },
    ]
}
