use super::domain::{FieldValue, PropertyRecord, CURRENCY_FIELD};
use super::registry::MetricRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CURRENCY: &str = "USD";

const KNOWN_CURRENCIES: &[&str] = &[
    "AED", "AUD", "BHD", "CAD", "CHF", "CNY", "EGP", "EUR", "GBP", "INR", "JOD", "JPY", "KWD",
    "MAD", "NZD", "OMR", "QAR", "SAR", "SEK", "SGD", "TRY", "USD", "ZAR",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurrencyError {
    #[error("unknown currency code `{0}`")]
    UnknownCurrency(String),
    #[error("no exchange rate from {from} to {to}")]
    MissingExchangeRate { from: CurrencyCode, to: CurrencyCode },
    #[error("exchange rate {from} -> {to} must be a positive finite number, got {rate}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: f64,
    },
}

/// Upper-case ISO 4217 code from the supported currency set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self, CurrencyError> {
        let code = raw.trim().to_ascii_uppercase();
        if KNOWN_CURRENCIES.binary_search(&code.as_str()).is_ok() {
            Ok(Self(code))
        } else {
            Err(CurrencyError::UnknownCurrency(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn known() -> &'static [&'static str] {
        KNOWN_CURRENCIES
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(DEFAULT_CURRENCY.to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: f64,
}

/// Multiplicative conversion factors keyed by (source, target).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ExchangeRate>", into = "Vec<ExchangeRate>")]
pub struct ExchangeRates {
    rates: BTreeMap<(CurrencyCode, CurrencyCode), f64>,
}

impl ExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: f64,
    ) -> Result<(), CurrencyError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CurrencyError::InvalidRate { from, to, rate });
        }
        self.rates.insert((from, to), rate);
        Ok(())
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Result<Self, CurrencyError> {
        self.insert(CurrencyCode::parse(from)?, CurrencyCode::parse(to)?, rate)?;
        Ok(self)
    }

    /// Factor converting `from` amounts into `to`; an inverse entry is used when
    /// only the opposite direction is known.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<f64, CurrencyError> {
        if from == to {
            return Ok(1.0);
        }

        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }

        self.rates
            .get(&(to.clone(), from.clone()))
            .map(|inverse| 1.0 / inverse)
            .ok_or_else(|| CurrencyError::MissingExchangeRate {
                from: from.clone(),
                to: to.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl TryFrom<Vec<ExchangeRate>> for ExchangeRates {
    type Error = CurrencyError;

    fn try_from(entries: Vec<ExchangeRate>) -> Result<Self, Self::Error> {
        let mut rates = Self::new();
        for entry in entries {
            rates.insert(entry.from, entry.to, entry.rate)?;
        }
        Ok(rates)
    }
}

impl From<ExchangeRates> for Vec<ExchangeRate> {
    fn from(value: ExchangeRates) -> Self {
        value
            .rates
            .into_iter()
            .map(|((from, to), rate)| ExchangeRate { from, to, rate })
            .collect()
    }
}

/// Currency of a record: its own code, or `fallback` when it carries none.
pub fn record_currency(
    record: &PropertyRecord,
    fallback: &CurrencyCode,
) -> Result<CurrencyCode, CurrencyError> {
    match record.get(CURRENCY_FIELD) {
        None => Ok(fallback.clone()),
        Some(FieldValue::Text(raw)) => CurrencyCode::parse(raw),
        Some(FieldValue::Number(value)) => Err(CurrencyError::UnknownCurrency(value.to_string())),
    }
}

/// Converts the monetary fields of records into a single working currency.
pub struct CurrencyNormalizer<'a> {
    registry: &'a MetricRegistry,
    rates: &'a ExchangeRates,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(registry: &'a MetricRegistry, rates: &'a ExchangeRates) -> Self {
        Self { registry, rates }
    }

    pub fn normalize(
        &self,
        record: &PropertyRecord,
        target: &CurrencyCode,
    ) -> Result<PropertyRecord, CurrencyError> {
        let source = record_currency(record, target)?;
        let factor = self.rates.rate(&source, target)?;

        let mut normalized = record.clone();
        if source != *target {
            for spec in self.registry.fields().iter().filter(|spec| spec.kind.is_monetary()) {
                if let Some(value) = record.number(spec.name) {
                    normalized.set(spec.name, FieldValue::Number(value * factor));
                }
            }
        }
        normalized.set(CURRENCY_FIELD, FieldValue::Text(target.to_string()));

        Ok(normalized)
    }
}
