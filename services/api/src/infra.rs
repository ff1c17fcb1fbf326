use metrics_exporter_prometheus::PrometheusHandle;
use realty_kpi::analysis::{
    Analyzer, CurrencyCode, ExchangeRates, MetricRegistry, PortfolioAnalysisService,
    PropertyRecord,
};
use realty_kpi::config::AnalysisConfig;
use realty_kpi::error::AppError;
use realty_kpi::history::{AnalysisHistoryService, InMemoryHistoryRepository};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type HistoryStore = InMemoryHistoryRepository;

pub(crate) fn build_analyzer(config: &AnalysisConfig) -> Result<Arc<Analyzer>, AppError> {
    let registry = Arc::new(MetricRegistry::standard()?);
    Ok(Arc::new(Analyzer::with_options(
        registry,
        config.analyzer_options(),
    )))
}

pub(crate) fn build_service(
    config: &AnalysisConfig,
) -> Result<Arc<PortfolioAnalysisService<HistoryStore>>, AppError> {
    let analyzer = build_analyzer(config)?;
    let history = AnalysisHistoryService::with_limit(
        Arc::new(HistoryStore::default()),
        config.history_limit,
    );
    Ok(Arc::new(PortfolioAnalysisService::new(analyzer, history)))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Dataset file: a JSON array of flat record objects.
pub(crate) fn load_records(path: &Path) -> Result<Vec<PropertyRecord>, AppError> {
    read_json(path)
}

/// Rate file: a JSON array of `{ "from", "to", "rate" }` entries.
pub(crate) fn load_rates(path: Option<&Path>) -> Result<ExchangeRates, AppError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(ExchangeRates::default()),
    }
}

pub(crate) fn parse_currency(raw: &str) -> Result<CurrencyCode, String> {
    CurrencyCode::parse(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("realty-kpi-{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("create scratch file");
        file.write_all(contents.as_bytes()).expect("write scratch file");
        path
    }

    #[test]
    fn dataset_file_loads_flat_records() {
        let path = scratch_file(
            "dataset.json",
            r#"[{"purchase_price": 150000, "annual_rent": 18000, "currency_code": "EUR"}]"#,
        );
        let records = load_records(&path).expect("dataset loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number("purchase_price"), Some(150_000.0));
        assert_eq!(records[0].currency_code(), Some("EUR"));
    }

    #[test]
    fn malformed_rates_are_input_errors() {
        let path = scratch_file("rates.json", r#"[{"from": "EUR", "to": "USD", "rate": 0}]"#);
        let error = load_rates(Some(path.as_path())).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(error, AppError::Input(_)));
    }

    #[test]
    fn missing_rate_file_means_no_conversions() {
        assert!(load_rates(None).expect("empty table").is_empty());
    }
}
