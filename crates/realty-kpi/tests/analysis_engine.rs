//! End-to-end behavior of the analysis engine through its public facade.

use std::sync::Arc;

use realty_kpi::analysis::catalog::{metrics, names};
use realty_kpi::analysis::{
    AnalysisRequest, Analyzer, CurrencyCode, ExchangeRates, IssueReason, MetricRegistry,
    PropertyRecord, CURRENCY_FIELD,
};

fn analyzer() -> Analyzer {
    Analyzer::new(Arc::new(MetricRegistry::standard().expect("standard registry")))
}

fn kpis(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn property(price: f64, currency: &str) -> PropertyRecord {
    PropertyRecord::new()
        .with_number(names::PURCHASE_PRICE, price)
        .with_number(names::ANNUAL_RENT, 24_000.0)
        .with_number(names::VACANCY_RATE, 0.05)
        .with_number(names::OPERATING_EXPENSES, 6_000.0)
        .with_text(CURRENCY_FIELD, currency)
}

fn leveraged(price: f64) -> PropertyRecord {
    PropertyRecord::new()
        .with_number(names::PURCHASE_PRICE, price)
        .with_number(names::MONTHLY_RENT, 2_500.0)
        .with_number(names::VACANCY_RATE, 0.04)
        .with_number(names::OPERATING_EXPENSES, 7_200.0)
        .with_number(names::DOWN_PAYMENT, price * 0.25)
        .with_number(names::CLOSING_COSTS, 6_000.0)
        .with_number(names::LOAN_INTEREST_RATE, 0.065)
        .with_number(names::LOAN_TERM_YEARS, 30.0)
        .with_number(names::APPRECIATION_RATE, 0.03)
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
}

#[test]
fn mixed_currency_portfolio_yields_identical_cap_rates() {
    let dataset = vec![property(200_000.0, "USD"), property(200_000.0, "EUR")];
    let rates = ExchangeRates::new()
        .with_rate("EUR", "USD", 1.1)
        .expect("valid rate");
    let selected = kpis(&[metrics::CAP_RATE]);

    let result = analyzer()
        .analyze_with(AnalysisRequest::new(&dataset, &selected).with_exchange_rates(&rates))
        .expect("analysis succeeds");

    assert_eq!(result.working_currency().as_str(), "USD");
    let values = result.values(metrics::CAP_RATE);
    assert_eq!(values.len(), 2);
    for value in values {
        assert!(close(value.expect("cap rate available"), 8.4));
    }
    assert_eq!(
        result.record(1).and_then(|record| record.source_currency.as_deref()),
        Some("EUR")
    );
}

#[test]
fn cap_rate_matches_noi_over_price() {
    let dataset: Vec<PropertyRecord> = [150_000.0, 275_000.0, 410_500.0]
        .into_iter()
        .map(leveraged)
        .collect();
    let selected = kpis(&[metrics::NOI, metrics::CAP_RATE]);

    let result = analyzer().analyze(&dataset, &selected).expect("analysis");

    for (record, input) in result.records().iter().zip(&dataset) {
        let noi = record.value(metrics::NOI).expect("noi");
        let price = input.number(names::PURCHASE_PRICE).expect("price");
        assert!(close(noi, 2_500.0 * 12.0 * 0.96 - 7_200.0));
        assert!(close(
            record.value(metrics::CAP_RATE).expect("cap rate"),
            noi / price * 100.0
        ));
    }
}

#[test]
fn zero_purchase_price_is_unavailable_not_infinite() {
    let dataset = vec![property(0.0, "USD")];
    let result = analyzer()
        .analyze(&dataset, &kpis(&[metrics::CAP_RATE]))
        .expect("analysis");

    let outcome = result
        .record(0)
        .and_then(|record| record.metric(metrics::CAP_RATE))
        .expect("cap rate outcome present");
    assert!(outcome.value().is_none());
    assert_eq!(outcome.issues()[0].reason, IssueReason::DivisionByZero);

    let serialized = serde_json::to_string(&result).expect("result serializes");
    assert!(!serialized.contains("NaN"));
    assert!(!serialized.contains("inf"));
}

#[test]
fn aggregates_cover_only_available_records() {
    let mut missing_price = property(100_000.0, "USD");
    missing_price.remove(names::PURCHASE_PRICE);
    let dataset = vec![
        property(336_000.0, "USD"),
        property(224_000.0, "USD"),
        property(168_000.0, "USD"),
        missing_price,
    ];

    let result = analyzer()
        .analyze(&dataset, &kpis(&[metrics::CAP_RATE]))
        .expect("analysis");
    let aggregate = result.aggregate(metrics::CAP_RATE).expect("aggregate");

    assert_eq!(aggregate.available, 3);
    assert_eq!(aggregate.unavailable, 1);
    let stats = aggregate.statistics.stats().expect("summary");
    assert_eq!(stats.count, 3);
    assert!(close(stats.mean, 7.5));
    assert!(close(stats.median, 7.5));

    let diagnostics = result.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].reason, IssueReason::MissingField);
    assert_eq!(
        diagnostics[0].message,
        "1 of 4 records missing required fields for cap_rate"
    );
}

#[test]
fn every_record_appears_even_when_nothing_is_computable() {
    let dataset = vec![PropertyRecord::new(), PropertyRecord::new()];
    let result = analyzer()
        .analyze(&dataset, &kpis(&[metrics::ROI, metrics::DSCR]))
        .expect("analysis");

    assert_eq!(result.records().len(), 2);
    for (index, record) in result.records().iter().enumerate() {
        assert_eq!(record.record_index, index);
        assert_eq!(record.metrics.len(), 2);
        assert!(record.metrics.iter().all(|metric| !metric.is_available()));
    }
    assert!(result
        .aggregates()
        .iter()
        .all(|aggregate| aggregate.statistics.stats().is_none()));
}

#[test]
fn repeated_analysis_is_identical() {
    let dataset: Vec<PropertyRecord> = (0..20)
        .map(|step| leveraged(180_000.0 + step as f64 * 12_500.0))
        .collect();
    let selected = kpis(&[
        metrics::CASH_ON_CASH_RETURN,
        metrics::ROI,
        metrics::DSCR,
        metrics::PAYBACK_PERIOD,
    ]);
    let analyzer = analyzer();

    let first = analyzer.analyze(&dataset, &selected).expect("first run");
    let second = analyzer.analyze(&dataset, &selected).expect("second run");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("json"),
        serde_json::to_string(&second).expect("json")
    );
}

#[test]
fn leveraged_property_produces_full_kpi_set() {
    let dataset = vec![leveraged(300_000.0)];
    let selected: Vec<String> = MetricRegistry::standard()
        .expect("registry")
        .definitions()
        .iter()
        .map(|definition| definition.id.to_string())
        .collect();

    let result = analyzer().analyze(&dataset, &selected).expect("analysis");
    let record = result.record(0).expect("record");

    for id in &selected {
        assert!(record.value(id).is_some(), "{id} should be available");
    }
    assert!(record.issues.is_empty());

    let invested = record.value(metrics::TOTAL_CASH_INVESTED).expect("invested");
    assert!(close(invested, 75_000.0 + 6_000.0));
}

#[test]
fn explicit_target_currency_overrides_dataset_currency() {
    let dataset = vec![property(200_000.0, "EUR")];
    let rates = ExchangeRates::new()
        .with_rate("EUR", "USD", 1.1)
        .expect("valid rate");
    let target = CurrencyCode::parse("usd").expect("usd");
    let selected = kpis(&[metrics::NOI]);

    let result = analyzer()
        .analyze_with(
            AnalysisRequest::new(&dataset, &selected)
                .with_exchange_rates(&rates)
                .with_target_currency(&target),
        )
        .expect("analysis");

    assert_eq!(result.working_currency().as_str(), "USD");
    let noi = result.values(metrics::NOI)[0].expect("noi");
    assert!(close(noi, (24_000.0 * 0.95 - 6_000.0) * 1.1));
}

#[test]
fn unknown_record_currency_blocks_only_that_record() {
    let dataset = vec![property(200_000.0, "USD"), property(200_000.0, "XYZ")];
    let result = analyzer()
        .analyze(&dataset, &kpis(&[metrics::CAP_RATE]))
        .expect("analysis");

    assert!(result.values(metrics::CAP_RATE)[0].is_some());
    let blocked = result
        .record(1)
        .and_then(|record| record.metric(metrics::CAP_RATE))
        .expect("outcome");
    assert!(blocked
        .issues()
        .iter()
        .any(|issue| issue.reason == IssueReason::UnknownCurrency));
}
