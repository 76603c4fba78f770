use super::value::{FieldValue, FieldValues};
use crate::shared::{FieldId, ModeId};
use serde::{Deserialize, Serialize};

/// Pure predicate over the active mode and the current field values.
///
/// In YAML each condition is a single-key map:
///
/// ```yaml
/// all:
///   - mode: framework
///   - equals: { field: frameworkUi, value: true }
///   - not: { one_of: { field: framework, values: [remix] } }
/// ```
///
/// A condition on a field with no stored value never matches `equals` /
/// `one_of` / `is_set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub enum Condition {
    Equals { field: FieldId, value: FieldValue },
    OneOf { field: FieldId, values: Vec<FieldValue> },
    IsSet { field: FieldId },
    Mode { mode: ModeId },
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn evaluate(&self, mode: &ModeId, values: &FieldValues) -> bool {
        match self {
            Condition::Equals { field, value } => values.get(field) == Some(value),
            Condition::OneOf { field, values: any } => values
                .get(field)
                .is_some_and(|current| any.contains(current)),
            Condition::IsSet { field } => values.contains_key(field),
            Condition::Mode { mode: expected } => expected == mode,
            Condition::Not(inner) => !inner.evaluate(mode, values),
            Condition::All(items) => items.iter().all(|item| item.evaluate(mode, values)),
            Condition::Any(items) => items.iter().any(|item| item.evaluate(mode, values)),
        }
    }

    pub fn referenced_fields(&self) -> Vec<&FieldId> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    pub fn referenced_modes(&self) -> Vec<&ModeId> {
        let mut out = Vec::new();
        self.collect_modes(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldId>) {
        match self {
            Condition::Equals { field, .. }
            | Condition::OneOf { field, .. }
            | Condition::IsSet { field } => {
                if !out.contains(&field) {
                    out.push(field);
                }
            }
            Condition::Mode { .. } => {}
            Condition::Not(inner) => inner.collect_fields(out),
            Condition::All(items) | Condition::Any(items) => {
                for item in items {
                    item.collect_fields(out);
                }
            }
        }
    }

    fn collect_modes<'a>(&'a self, out: &mut Vec<&'a ModeId>) {
        match self {
            Condition::Mode { mode } => out.push(mode),
            Condition::Equals { .. } | Condition::OneOf { .. } | Condition::IsSet { .. } => {}
            Condition::Not(inner) => inner.collect_modes(out),
            Condition::All(items) | Condition::Any(items) => {
                for item in items {
                    item.collect_modes(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldMatch {
    field: FieldId,
    value: FieldValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldMatchAny {
    field: FieldId,
    values: Vec<FieldValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
enum ConditionRepr {
    Equals { equals: FieldMatch },
    OneOf { one_of: FieldMatchAny },
    IsSet { is_set: FieldId },
    Mode { mode: ModeId },
    Not { not: Box<Condition> },
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
}

impl From<ConditionRepr> for Condition {
    fn from(value: ConditionRepr) -> Self {
        match value {
            ConditionRepr::Equals { equals } => Condition::Equals {
                field: equals.field,
                value: equals.value,
            },
            ConditionRepr::OneOf { one_of } => Condition::OneOf {
                field: one_of.field,
                values: one_of.values,
            },
            ConditionRepr::IsSet { is_set } => Condition::IsSet { field: is_set },
            ConditionRepr::Mode { mode } => Condition::Mode { mode },
            ConditionRepr::Not { not } => Condition::Not(not),
            ConditionRepr::All { all } => Condition::All(all),
            ConditionRepr::Any { any } => Condition::Any(any),
        }
    }
}

impl From<Condition> for ConditionRepr {
    fn from(value: Condition) -> Self {
        match value {
            Condition::Equals { field, value } => ConditionRepr::Equals {
                equals: FieldMatch { field, value },
            },
            Condition::OneOf { field, values } => ConditionRepr::OneOf {
                one_of: FieldMatchAny { field, values },
            },
            Condition::IsSet { field } => ConditionRepr::IsSet { is_set: field },
            Condition::Mode { mode } => ConditionRepr::Mode { mode },
            Condition::Not(inner) => ConditionRepr::Not { not: inner },
            Condition::All(items) => ConditionRepr::All { all: items },
            Condition::Any(items) => ConditionRepr::Any { any: items },
        }
    }
}
