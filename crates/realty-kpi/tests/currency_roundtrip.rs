use proptest::prelude::*;
use realty_kpi::analysis::catalog::names;
use realty_kpi::analysis::{
    CurrencyCode, CurrencyNormalizer, ExchangeRates, MetricRegistry, PropertyRecord, CURRENCY_FIELD,
};

const MONETARY: [&str; 4] = [
    names::PURCHASE_PRICE,
    names::ANNUAL_RENT,
    names::OPERATING_EXPENSES,
    names::DOWN_PAYMENT,
];

fn currency() -> impl Strategy<Value = CurrencyCode> {
    prop::sample::select(CurrencyCode::known().to_vec())
        .prop_map(|code| CurrencyCode::parse(code).expect("known code"))
}

proptest! {
    #[test]
    fn normalizing_there_and_back_restores_monetary_values(
        from in currency(),
        to in currency(),
        rate in 0.001f64..1_000.0,
        amounts in prop::array::uniform4(0.0f64..5_000_000.0),
        vacancy in 0.0f64..=1.0,
    ) {
        let registry = MetricRegistry::standard().expect("registry");
        let rates = ExchangeRates::new()
            .with_rate(from.as_str(), to.as_str(), rate)
            .expect("positive rate");
        let normalizer = CurrencyNormalizer::new(&registry, &rates);

        let mut record = PropertyRecord::new()
            .with_number(names::VACANCY_RATE, vacancy)
            .with_text(CURRENCY_FIELD, from.as_str());
        for (field, amount) in MONETARY.iter().zip(amounts) {
            record = record.with_number(*field, amount);
        }

        let there = normalizer.normalize(&record, &to).expect("forward conversion");
        let back = normalizer.normalize(&there, &from).expect("inverse conversion");

        prop_assert_eq!(back.currency_code(), Some(from.as_str()));
        prop_assert_eq!(back.number(names::VACANCY_RATE), Some(vacancy));
        for (field, amount) in MONETARY.iter().zip(amounts) {
            let restored = back.number(field).expect("monetary field kept");
            prop_assert!((restored - amount).abs() <= 1e-9 * amount.max(1.0));
        }
    }
}
