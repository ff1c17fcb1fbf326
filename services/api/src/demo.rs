use crate::infra::{build_analyzer, load_rates, load_records, parse_currency};
use clap::Args;
use realty_kpi::analysis::catalog::{metrics, names};
use realty_kpi::analysis::{
    AnalysisRequest, AnalysisResult, CurrencyCode, ExchangeRates, MetricRegistry, MetricUnit,
    PropertyRecord, CURRENCY_FIELD,
};
use realty_kpi::config::{AnalysisConfig, AppConfig};
use realty_kpi::error::AppError;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct KpisArgs {
    /// Print the input fields needed for these KPI ids instead of the catalog
    #[arg(long)]
    pub(crate) kpi: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// JSON file holding an array of flat property records
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// JSON file holding `{ "from", "to", "rate" }` exchange-rate entries
    #[arg(long)]
    pub(crate) rates: Option<PathBuf>,
    /// KPI id to compute (repeatable)
    #[arg(long, required = true)]
    pub(crate) kpi: Vec<String>,
    /// Working currency (defaults to the first currency in the dataset)
    #[arg(long, value_parser = parse_currency)]
    pub(crate) target: Option<CurrencyCode>,
    /// Emit the full result as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// EUR to USD conversion factor applied to the second property
    #[arg(long, default_value_t = 1.1)]
    pub(crate) eur_rate: f64,
    /// Emit the full result as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_kpis(args: KpisArgs) -> Result<(), AppError> {
    let registry = MetricRegistry::standard()?;

    if args.kpi.is_empty() {
        println!("Supported KPIs");
        for definition in registry.definitions() {
            let view = definition.to_view();
            println!("- {} ({}) [{}]", view.label, view.id, view.unit_label);
            if !view.required_fields.is_empty() {
                println!("  requires: {}", view.required_fields.join(", "));
            }
            if !view.optional_fields.is_empty() {
                println!("  optional: {}", view.optional_fields.join(", "));
            }
            if !view.dependencies.is_empty() {
                println!("  builds on: {}", view.dependencies.join(", "));
            }
        }
        return Ok(());
    }

    println!("Input fields for {}", args.kpi.join(", "));
    for field in registry.input_fields(&args.kpi)? {
        println!("- {} ({}) [{}]", field.label, field.name, field.kind.label());
    }
    Ok(())
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let records = load_records(&args.dataset)?;
    let rates = load_rates(args.rates.as_deref())?;

    analyze_and_render(
        &config.analysis,
        &records,
        &args.kpi,
        &rates,
        args.target.as_ref(),
        args.json,
    )
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let records = demo_portfolio();
    let rates = ExchangeRates::new().with_rate("EUR", "USD", args.eur_rate)?;
    let selected: Vec<String> = [
        metrics::NOI,
        metrics::CAP_RATE,
        metrics::GROSS_RENT_MULTIPLIER,
        metrics::CASH_ON_CASH_RETURN,
        metrics::DSCR,
        metrics::PAYBACK_PERIOD,
    ]
    .iter()
    .map(|id| id.to_string())
    .collect();

    if !args.json {
        println!(
            "KPI analysis demo: one USD and one EUR property, EUR->USD at {}",
            args.eur_rate
        );
    }
    analyze_and_render(
        &AnalysisConfig::default(),
        &records,
        &selected,
        &rates,
        None,
        args.json,
    )
}

fn analyze_and_render(
    config: &AnalysisConfig,
    records: &[PropertyRecord],
    selected: &[String],
    rates: &ExchangeRates,
    target: Option<&CurrencyCode>,
    as_json: bool,
) -> Result<(), AppError> {
    let analyzer = build_analyzer(config)?;
    let mut request = AnalysisRequest::new(records, selected).with_exchange_rates(rates);
    if let Some(target) = target {
        request = request.with_target_currency(target);
    }
    let result = analyzer.analyze_with(request)?;

    if as_json {
        let payload = json!({
            "result": result,
            "diagnostics": result.diagnostics(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render_analysis(&result, analyzer.registry());
    }
    Ok(())
}

/// Two identical rentals, the second priced in EUR.
fn demo_portfolio() -> Vec<PropertyRecord> {
    let base = PropertyRecord::new()
        .with_number(names::PURCHASE_PRICE, 200_000.0)
        .with_number(names::ANNUAL_RENT, 24_000.0)
        .with_number(names::VACANCY_RATE, 0.05)
        .with_number(names::OPERATING_EXPENSES, 6_000.0)
        .with_number(names::DOWN_PAYMENT, 50_000.0)
        .with_number(names::CLOSING_COSTS, 4_000.0)
        .with_number(names::LOAN_INTEREST_RATE, 0.06)
        .with_number(names::LOAN_TERM_YEARS, 30.0);

    vec![
        base.clone().with_text(CURRENCY_FIELD, "USD"),
        base.with_text(CURRENCY_FIELD, "EUR"),
    ]
}

fn format_value(unit: MetricUnit, value: f64, currency: &CurrencyCode) -> String {
    match unit {
        MetricUnit::Percentage => format!("{value:.2}%"),
        MetricUnit::Currency => format!("{value:.2} {currency}"),
        MetricUnit::Ratio => format!("{value:.2}x"),
        MetricUnit::Years => format!("{value:.1} years"),
    }
}

fn label<'a>(registry: &'a MetricRegistry, id: &'a str) -> &'a str {
    registry
        .get(id)
        .map(|definition| definition.label)
        .unwrap_or(id)
}

pub(crate) fn render_analysis(result: &AnalysisResult, registry: &MetricRegistry) {
    let currency = result.working_currency();
    println!(
        "\nWorking currency {} | {} records | {} KPIs",
        currency,
        result.records().len(),
        result.selected_kpis().len()
    );

    for record in result.records() {
        let source = record.source_currency.as_deref().unwrap_or(currency.as_str());
        println!("\nProperty {} ({source})", record.record_index + 1);
        for metric in &record.metrics {
            let name = label(registry, &metric.metric);
            match metric.value() {
                Some(value) => {
                    let unit = registry
                        .get(&metric.metric)
                        .map(|definition| definition.unit)
                        .unwrap_or(MetricUnit::Ratio);
                    println!("- {name}: {}", format_value(unit, value, currency));
                }
                None => {
                    let reasons: Vec<&str> = metric
                        .issues()
                        .iter()
                        .map(|issue| issue.reason.code())
                        .collect();
                    println!("- {name}: unavailable ({})", reasons.join(", "));
                }
            }
        }
    }

    println!("\nPortfolio summary");
    for aggregate in result.aggregates() {
        let name = label(registry, &aggregate.metric);
        match aggregate.statistics.stats() {
            Some(stats) => println!(
                "- {name}: mean {} | median {} | range {} to {} ({} of {} properties)",
                format_value(aggregate.unit, stats.mean, currency),
                format_value(aggregate.unit, stats.median, currency),
                format_value(aggregate.unit, stats.min, currency),
                format_value(aggregate.unit, stats.max, currency),
                aggregate.available,
                aggregate.available + aggregate.unavailable,
            ),
            None => println!("- {name}: no data"),
        }
    }

    let diagnostics = result.diagnostics();
    if !diagnostics.is_empty() {
        println!("\nDiagnostics");
        for diagnostic in diagnostics {
            println!("- {}", diagnostic.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use realty_kpi::analysis::Analyzer;

    #[test]
    fn demo_portfolio_converges_on_one_cap_rate() {
        let registry = Arc::new(MetricRegistry::standard().expect("registry"));
        let rates = ExchangeRates::new()
            .with_rate("EUR", "USD", 1.1)
            .expect("rate");
        let records = demo_portfolio();
        let selected = vec![metrics::CAP_RATE.to_string()];

        let result = Analyzer::new(registry)
            .analyze_with(AnalysisRequest::new(&records, &selected).with_exchange_rates(&rates))
            .expect("analysis");

        for value in result.values(metrics::CAP_RATE) {
            assert!((value.expect("available") - 8.4).abs() < 1e-9);
        }
    }

    #[test]
    fn values_are_formatted_by_unit() {
        let usd = CurrencyCode::default();
        assert_eq!(format_value(MetricUnit::Percentage, 8.4, &usd), "8.40%");
        assert_eq!(format_value(MetricUnit::Currency, 16_800.0, &usd), "16800.00 USD");
        assert_eq!(format_value(MetricUnit::Ratio, 1.254, &usd), "1.25x");
        assert_eq!(format_value(MetricUnit::Years, 3.26, &usd), "3.3 years");
    }
}
