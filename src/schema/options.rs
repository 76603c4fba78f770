use super::condition::Condition;
use super::value::{FieldValue, FieldValues};
use crate::shared::{FieldId, ModeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            description: None,
        }
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        value.as_text() == Some(self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalOption {
    #[serde(flatten)]
    pub option: FieldOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

/// Source of the valid choices for a `select` field.
///
/// Evaluation is pure and total: incomplete inputs produce an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OptionSetDocument", into = "OptionSetDocument")]
pub enum OptionSet {
    Static(Vec<FieldOption>),
    Keyed {
        field: FieldId,
        cases: BTreeMap<String, Vec<FieldOption>>,
        fallback: Vec<FieldOption>,
    },
    Filtered(Vec<ConditionalOption>),
}

impl OptionSet {
    pub fn resolve(&self, mode: &ModeId, values: &FieldValues) -> Vec<FieldOption> {
        match self {
            OptionSet::Static(options) => options.clone(),
            OptionSet::Keyed {
                field,
                cases,
                fallback,
            } => values
                .get(field)
                .and_then(|current| cases.get(&*current.as_key()))
                .unwrap_or(fallback)
                .clone(),
            OptionSet::Filtered(options) => options
                .iter()
                .filter(|entry| {
                    entry
                        .when
                        .as_ref()
                        .map_or(true, |condition| condition.evaluate(mode, values))
                })
                .map(|entry| entry.option.clone())
                .collect(),
        }
    }

    /// Every option the set can ever yield.
    pub fn all_options(&self) -> Vec<&FieldOption> {
        match self {
            OptionSet::Static(options) => options.iter().collect(),
            OptionSet::Keyed {
                cases, fallback, ..
            } => cases
                .values()
                .flat_map(|options| options.iter())
                .chain(fallback.iter())
                .collect(),
            OptionSet::Filtered(options) => options.iter().map(|entry| &entry.option).collect(),
        }
    }

    /// Fields whose values this set reads.
    pub fn referenced_fields(&self) -> Vec<&FieldId> {
        match self {
            OptionSet::Static(_) => Vec::new(),
            OptionSet::Keyed { field, .. } => vec![field],
            OptionSet::Filtered(options) => {
                let mut out: Vec<&FieldId> = Vec::new();
                for condition in options.iter().filter_map(|entry| entry.when.as_ref()) {
                    for field in condition.referenced_fields() {
                        if !out.contains(&field) {
                            out.push(field);
                        }
                    }
                }
                out
            }
        }
    }

    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            OptionSet::Filtered(options) => options
                .iter()
                .filter_map(|entry| entry.when.as_ref())
                .collect(),
            OptionSet::Static(_) | OptionSet::Keyed { .. } => Vec::new(),
        }
    }
}

/// YAML shape: exactly one of `static`, `keyed_by` (+ `cases`, `fallback`),
/// or `filtered`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct OptionSetDocument {
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub(crate) static_options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) keyed_by: Option<FieldId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) cases: BTreeMap<String, Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) fallback: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) filtered: Option<Vec<ConditionalOption>>,
}

impl TryFrom<OptionSetDocument> for OptionSet {
    type Error = String;

    fn try_from(value: OptionSetDocument) -> Result<Self, Self::Error> {
        match (value.static_options, value.keyed_by, value.filtered) {
            (Some(options), None, None) => {
                if !value.cases.is_empty() || !value.fallback.is_empty() {
                    return Err("`cases` and `fallback` require `keyed_by`".to_string());
                }
                Ok(OptionSet::Static(options))
            }
            (None, Some(field), None) => Ok(OptionSet::Keyed {
                field,
                cases: value.cases,
                fallback: value.fallback,
            }),
            (None, None, Some(options)) => {
                if !value.cases.is_empty() || !value.fallback.is_empty() {
                    return Err("`cases` and `fallback` require `keyed_by`".to_string());
                }
                Ok(OptionSet::Filtered(options))
            }
            (None, None, None) => {
                Err("options require one of `static`, `keyed_by` or `filtered`".to_string())
            }
            _ => Err("options accept only one of `static`, `keyed_by` or `filtered`".to_string()),
        }
    }
}

impl From<OptionSet> for OptionSetDocument {
    fn from(value: OptionSet) -> Self {
        match value {
            OptionSet::Static(options) => Self {
                static_options: Some(options),
                ..Self::default()
            },
            OptionSet::Keyed {
                field,
                cases,
                fallback,
            } => Self {
                keyed_by: Some(field),
                cases,
                fallback,
                ..Self::default()
            },
            OptionSet::Filtered(options) => Self {
                filtered: Some(options),
                ..Self::default()
            },
        }
    }
}
