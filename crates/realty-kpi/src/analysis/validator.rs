use super::domain::{FieldValue, IssueReason, PropertyRecord};
use super::registry::{FieldKind, FieldRequirement, KpiDefinition, MetricRegistry};

/// Problem with one field of a record, before it is tied to a record index and KPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: IssueReason,
    pub detail: String,
}

impl FieldIssue {
    fn new(field: &str, reason: IssueReason, detail: String) -> Self {
        Self {
            field: field.to_string(),
            reason,
            detail,
        }
    }
}

/// Checks records against field requirements using the registry's field kinds.
pub struct RecordValidator<'a> {
    registry: &'a MetricRegistry,
}

impl<'a> RecordValidator<'a> {
    pub fn new(registry: &'a MetricRegistry) -> Self {
        Self { registry }
    }

    pub fn validate_for(&self, record: &PropertyRecord, kpi: &KpiDefinition) -> Vec<FieldIssue> {
        self.validate(record, &kpi.required, &kpi.optional)
    }

    pub fn validate(
        &self,
        record: &PropertyRecord,
        required: &[FieldRequirement],
        optional: &[&str],
    ) -> Vec<FieldIssue> {
        let mut issues = Vec::new();

        for requirement in required {
            let present = requirement
                .fields()
                .iter()
                .copied()
                .find(|name| record.contains(name));

            match present {
                Some(name) => issues.extend(self.check(record, name)),
                None => issues.push(FieldIssue::new(
                    &requirement.describe(),
                    IssueReason::MissingField,
                    format!("required field {} is missing", requirement.describe()),
                )),
            }
        }

        for name in optional.iter().filter(|name| record.contains(name)) {
            issues.extend(self.check(record, name));
        }

        issues
    }

    fn check(&self, record: &PropertyRecord, name: &str) -> Option<FieldIssue> {
        let value = match record.get(name)? {
            FieldValue::Number(value) => *value,
            FieldValue::Text(text) => {
                return Some(FieldIssue::new(
                    name,
                    IssueReason::NotNumeric,
                    format!("{name} must be numeric, got {text:?}"),
                ));
            }
        };

        if !value.is_finite() {
            return Some(FieldIssue::new(
                name,
                IssueReason::NonFinite,
                format!("{name} must be a finite number"),
            ));
        }

        let kind = self
            .registry
            .field(name)
            .map(|spec| spec.kind)
            .unwrap_or(FieldKind::Monetary);

        match kind {
            FieldKind::SignedRate if value.abs() > 1.0 => Some(FieldIssue::new(
                name,
                IssueReason::OutOfRange,
                format!("{name} must be a fraction between -1 and 1, got {value}"),
            )),
            FieldKind::SignedRate | FieldKind::Categorical => None,
            _ if value < 0.0 => Some(FieldIssue::new(
                name,
                IssueReason::NegativeValue,
                format!("{name} must not be negative, got {value}"),
            )),
            FieldKind::Rate if value > 1.0 => Some(FieldIssue::new(
                name,
                IssueReason::OutOfRange,
                format!("{name} must be a fraction between 0 and 1, got {value}"),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::catalog::names;

    fn registry() -> MetricRegistry {
        MetricRegistry::standard().expect("registry")
    }

    fn noi_inputs() -> PropertyRecord {
        PropertyRecord::new()
            .with_number(names::ANNUAL_RENT, 24_000.0)
            .with_number(names::VACANCY_RATE, 0.05)
            .with_number(names::OPERATING_EXPENSES, 6_000.0)
    }

    #[test]
    fn complete_record_passes() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let noi = registry.get("noi").expect("noi");

        assert!(validator.validate_for(&noi_inputs(), noi).is_empty());
    }

    #[test]
    fn missing_rent_names_both_alternatives() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let mut record = noi_inputs();
        record.remove(names::ANNUAL_RENT);

        let issues = validator.validate_for(&record, registry.get("noi").expect("noi"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "annual_rent or monthly_rent");
        assert_eq!(issues[0].reason, IssueReason::MissingField);
    }

    #[test]
    fn rates_use_fraction_convention() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let record = noi_inputs().with_number(names::VACANCY_RATE, 5.0);

        let issues = validator.validate_for(&record, registry.get("noi").expect("noi"));
        assert_eq!(issues[0].reason, IssueReason::OutOfRange);
        assert_eq!(issues[0].field, names::VACANCY_RATE);
    }

    #[test]
    fn negative_and_text_values_are_flagged() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let record = noi_inputs()
            .with_number(names::OPERATING_EXPENSES, -10.0)
            .with_text(names::ANNUAL_RENT, "twenty thousand");

        let reasons: Vec<IssueReason> = validator
            .validate_for(&record, registry.get("noi").expect("noi"))
            .into_iter()
            .map(|issue| issue.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![IssueReason::NotNumeric, IssueReason::NegativeValue]
        );
    }

    #[test]
    fn appreciation_may_be_negative() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let record = PropertyRecord::new()
            .with_number(names::PURCHASE_PRICE, 150_000.0)
            .with_number(names::APPRECIATION_RATE, -0.02);

        let appreciation = registry.get("annual_appreciation").expect("metric");
        assert!(validator.validate_for(&record, appreciation).is_empty());
    }

    #[test]
    fn optional_fields_are_checked_only_when_present() {
        let registry = registry();
        let validator = RecordValidator::new(&registry);
        let invested = registry.get("total_cash_invested").expect("metric");

        let record = PropertyRecord::new().with_number(names::DOWN_PAYMENT, 40_000.0);
        assert!(validator.validate_for(&record, invested).is_empty());

        let record = record.with_number(names::CLOSING_COSTS, -1.0);
        let issues = validator.validate_for(&record, invested);
        assert_eq!(issues[0].field, names::CLOSING_COSTS);
    }
}
