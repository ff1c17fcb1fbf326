use super::catalog;
use super::domain::MetricUnit;
use super::evaluator::{EvaluationError, MetricInputs};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Pure formula computing one KPI from a normalized record and its prerequisites.
pub type Formula = fn(&MetricInputs<'_>) -> Result<f64, EvaluationError>;

/// Classification of an input field; drives currency normalization and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Monetary,
    /// Fraction in `0..=1`.
    Rate,
    /// Fraction in `-1..=1`.
    SignedRate,
    Years,
    Categorical,
}

impl FieldKind {
    pub const fn is_monetary(self) -> bool {
        matches!(self, Self::Monetary)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Monetary => "Monetary",
            Self::Rate => "Rate (fraction)",
            Self::SignedRate => "Signed rate (fraction)",
            Self::Years => "Years",
            Self::Categorical => "Categorical",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// Input a KPI cannot be computed without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRequirement {
    Field(&'static str),
    /// Satisfied by the first listed field present on the record.
    OneOf(&'static [&'static str]),
}

impl FieldRequirement {
    pub fn fields(&self) -> &[&'static str] {
        match self {
            FieldRequirement::Field(name) => std::slice::from_ref(name),
            FieldRequirement::OneOf(names) => names,
        }
    }

    pub fn describe(&self) -> String {
        self.fields().join(" or ")
    }
}

#[derive(Debug, Clone)]
pub struct KpiDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: MetricUnit,
    pub required: Vec<FieldRequirement>,
    pub optional: Vec<&'static str>,
    pub dependencies: Vec<&'static str>,
    pub formula: Formula,
}

impl KpiDefinition {
    pub fn input_field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .flat_map(|requirement| requirement.fields().iter().copied())
            .chain(self.optional.iter().copied())
    }

    pub fn to_view(&self) -> KpiDefinitionView {
        KpiDefinitionView {
            id: self.id,
            label: self.label,
            unit: self.unit,
            unit_label: self.unit.label(),
            required_fields: self.required.iter().map(FieldRequirement::describe).collect(),
            optional_fields: self.optional.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Serializable catalog entry for metric-selection and manual-entry collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct KpiDefinitionView {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: MetricUnit,
    pub unit_label: &'static str,
    pub required_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),
    #[error("metric `{0}` is defined more than once")]
    DuplicateMetric(String),
    #[error("metric `{metric}` depends on undefined metric `{dependency}`")]
    MissingDependency { metric: String, dependency: String },
    #[error("metric `{metric}` references unknown field `{field}`")]
    UnknownField { metric: String, field: String },
    #[error("cyclic metric dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Catalog of supported KPIs and the input fields they read.
#[derive(Debug)]
pub struct MetricRegistry {
    fields: Vec<FieldSpec>,
    definitions: Vec<KpiDefinition>,
    index: HashMap<&'static str, usize>,
    monetary: Vec<bool>,
}

impl MetricRegistry {
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_parts(catalog::standard_fields(), catalog::standard_definitions())
    }

    /// Builds a registry, rejecting duplicate ids, dangling references and cycles.
    pub fn from_parts(
        fields: Vec<FieldSpec>,
        definitions: Vec<KpiDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if index.insert(definition.id, position).is_some() {
                return Err(RegistryError::DuplicateMetric(definition.id.to_string()));
            }
        }

        for definition in &definitions {
            if let Some(field) = definition
                .input_field_names()
                .find(|name| !fields.iter().any(|spec| spec.name == *name))
            {
                return Err(RegistryError::UnknownField {
                    metric: definition.id.to_string(),
                    field: field.to_string(),
                });
            }

            if let Some(dependency) = definition
                .dependencies
                .iter()
                .find(|dependency| !index.contains_key(*dependency))
            {
                return Err(RegistryError::MissingDependency {
                    metric: definition.id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        let monetary = definitions
            .iter()
            .map(|definition| {
                definition.input_field_names().any(|name| {
                    fields
                        .iter()
                        .any(|spec| spec.name == name && spec.kind.is_monetary())
                })
            })
            .collect();

        let registry = Self {
            fields,
            definitions,
            index,
            monetary,
        };

        let all_ids: Vec<&str> = registry.definitions.iter().map(|d| d.id).collect();
        registry.dependency_order(&all_ids)?;

        debug!(
            metrics = registry.definitions.len(),
            fields = registry.fields.len(),
            "metric registry loaded"
        );
        Ok(registry)
    }

    pub fn definitions(&self) -> &[KpiDefinition] {
        &self.definitions
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn get(&self, id: &str) -> Result<&KpiDefinition, RegistryError> {
        self.index
            .get(id)
            .map(|&position| &self.definitions[position])
            .ok_or_else(|| RegistryError::UnknownMetric(id.to_string()))
    }

    /// Whether the KPI reads any monetary field.
    pub fn is_monetary(&self, id: &str) -> bool {
        self.index
            .get(id)
            .map(|&position| self.monetary[position])
            .unwrap_or(false)
    }

    /// Evaluation order covering the selection and every transitive dependency;
    /// prerequisites always precede the metrics that read them.
    pub fn dependency_order<S: AsRef<str>>(
        &self,
        selected: &[S],
    ) -> Result<Vec<&KpiDefinition>, RegistryError> {
        let mut marks = vec![Mark::Unvisited; self.definitions.len()];
        let mut path = Vec::new();
        let mut order = Vec::new();

        for id in selected {
            let id = id.as_ref();
            let position = *self
                .index
                .get(id)
                .ok_or_else(|| RegistryError::UnknownMetric(id.to_string()))?;
            self.visit(position, &mut marks, &mut path, &mut order)?;
        }

        Ok(order
            .into_iter()
            .map(|position| &self.definitions[position])
            .collect())
    }

    /// Fields a manual-entry form must prompt for to compute the selection.
    pub fn input_fields<S: AsRef<str>>(
        &self,
        selected: &[S],
    ) -> Result<Vec<&FieldSpec>, RegistryError> {
        let names: BTreeSet<&'static str> = self
            .dependency_order(selected)?
            .into_iter()
            .flat_map(KpiDefinition::input_field_names)
            .collect();

        Ok(self
            .fields
            .iter()
            .filter(|spec| names.contains(spec.name))
            .collect())
    }

    fn visit(
        &self,
        position: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), RegistryError> {
        match marks[position] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|&p| p == position).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&position))
                    .map(|&p| self.definitions[p].id.to_string())
                    .collect();
                return Err(RegistryError::CyclicDependency { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[position] = Mark::InProgress;
        path.push(position);

        let definition = &self.definitions[position];
        for dependency in &definition.dependencies {
            let dependency_position = *self.index.get(dependency).ok_or_else(|| {
                RegistryError::MissingDependency {
                    metric: definition.id.to_string(),
                    dependency: dependency.to_string(),
                }
            })?;
            self.visit(dependency_position, marks, path, order)?;
        }

        path.pop();
        marks[position] = Mark::Done;
        order.push(position);
        Ok(())
    }
}
