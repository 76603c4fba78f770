use super::fields::is_field_active;
use super::options::{contains_value, first_value};
use super::state::{FieldValue, FieldValues, StateModel};
use crate::schema::{FieldDef, FieldKind, FieldOption, Schema};
use crate::shared::FieldId;
use std::collections::BTreeMap;

/// A caller request against the state. Ids are raw strings because they come
/// from the caller and may not exist in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateIntent {
    SetMode(String),
    SetField { field: String, value: FieldValue },
}

impl UpdateIntent {
    pub fn set_mode(mode: &str) -> Self {
        UpdateIntent::SetMode(mode.to_string())
    }

    pub fn set_field(field: &str, value: impl Into<FieldValue>) -> Self {
        UpdateIntent::SetField {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateIntent::SetMode(_) => "set_mode",
            UpdateIntent::SetField { .. } => "set_field",
        }
    }
}

/// A rejected caller request. The state it was applied to is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown mode `{mode}`")]
    UnknownMode { mode: String },
    #[error("unknown field `{field}`")]
    UnknownField { field: String },
    #[error("field `{field}` is not active in mode `{mode}`")]
    InactiveField { field: String, mode: String },
    #[error("field `{field}` expects a {expected} value, got `{value}`")]
    KindMismatch {
        field: String,
        expected: &'static str,
        value: String,
    },
    #[error("`{value}` is not a valid option for field `{field}`")]
    InvalidOption { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeEffect {
    /// The caller's own value landed.
    Assigned { field: FieldId, value: FieldValue },
    /// A stale value snapped to the first valid option.
    Reset {
        field: FieldId,
        from: FieldValue,
        to: FieldValue,
    },
    /// The option list went empty and the value was dropped.
    Cleared { field: FieldId, previous: FieldValue },
    Defaulted { field: FieldId, value: FieldValue },
    Parked { field: FieldId, value: FieldValue },
    Restored { field: FieldId, value: FieldValue },
}

impl CascadeEffect {
    pub fn field(&self) -> &FieldId {
        match self {
            CascadeEffect::Assigned { field, .. }
            | CascadeEffect::Reset { field, .. }
            | CascadeEffect::Cleared { field, .. }
            | CascadeEffect::Defaulted { field, .. }
            | CascadeEffect::Parked { field, .. }
            | CascadeEffect::Restored { field, .. } => field,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeEffect::Assigned { .. } => "assigned",
            CascadeEffect::Reset { .. } => "reset",
            CascadeEffect::Cleared { .. } => "cleared",
            CascadeEffect::Defaulted { .. } => "defaulted",
            CascadeEffect::Parked { .. } => "parked",
            CascadeEffect::Restored { .. } => "restored",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub effects: Vec<CascadeEffect>,
}

impl CascadeReport {
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effect_for(&self, field: &str) -> Option<&CascadeEffect> {
        self.effects
            .iter()
            .find(|effect| effect.field().as_str() == field)
    }

    fn push(&mut self, effect: CascadeEffect) {
        self.effects.push(effect);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub state: StateModel,
    pub report: CascadeReport,
}

/// Caller-supplied starting point: an optional mode and field values merged
/// over schema defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOverrides {
    pub mode: Option<String>,
    pub values: BTreeMap<String, FieldValue>,
}

impl StateOverrides {
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn with_value(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }
}

/// Result of building a state from overrides. Overrides that could not be
/// honored are listed in `rejected`; the state is consistent regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    pub state: StateModel,
    pub report: CascadeReport,
    pub rejected: Vec<ConfigError>,
}

pub fn apply_update(
    schema: &Schema,
    state: &StateModel,
    intent: &UpdateIntent,
) -> Result<CascadeOutcome, ConfigError> {
    match intent {
        UpdateIntent::SetMode(mode) => {
            let Some(mode_def) = schema.mode(mode) else {
                return Err(ConfigError::UnknownMode { mode: mode.clone() });
            };
            let mut next = state.clone();
            next.mode = mode_def.id.clone();
            let mut report = CascadeReport::default();
            reconcile(
                schema,
                &mut next,
                schema.dependencies().order(),
                Pass::ModeSwitch,
                &mut report,
            );
            Ok(CascadeOutcome {
                state: next,
                report,
            })
        }
        UpdateIntent::SetField { field, value } => {
            let Some(position) = schema.field_position(field) else {
                return Err(ConfigError::UnknownField {
                    field: field.clone(),
                });
            };
            let def = &schema.fields()[position];
            validate_assignment(def, state, value)?;

            let mut next = state.clone();
            next.parked.remove(&def.id);
            let mut report = CascadeReport::default();
            if next.values.insert(def.id.clone(), value.clone()).as_ref() != Some(value) {
                report.push(CascadeEffect::Assigned {
                    field: def.id.clone(),
                    value: value.clone(),
                });
            }
            reconcile(
                schema,
                &mut next,
                schema.dependencies().closure(position),
                Pass::Edit,
                &mut report,
            );
            Ok(CascadeOutcome {
                state: next,
                report,
            })
        }
    }
}

pub fn initial_state(schema: &Schema, overrides: &StateOverrides) -> InitialState {
    let mut rejected = Vec::new();
    let mode = match overrides.mode.as_deref() {
        Some(raw) => match schema.mode(raw) {
            Some(mode) => mode.id.clone(),
            None => {
                rejected.push(ConfigError::UnknownMode {
                    mode: raw.to_string(),
                });
                schema.default_mode().clone()
            }
        },
        None => schema.default_mode().clone(),
    };

    // Overrides start parked; the reconcile pass restores every one that is
    // active and valid, and falls back to defaults for the rest.
    let mut state = StateModel::empty(mode);
    for (raw_field, value) in &overrides.values {
        let Some(field) = schema.field(raw_field) else {
            rejected.push(ConfigError::UnknownField {
                field: raw_field.clone(),
            });
            continue;
        };
        if !field.kind.accepts(value) {
            rejected.push(kind_mismatch(field, value));
            continue;
        }
        state.parked.insert(field.id.clone(), value.clone());
    }

    let mut report = CascadeReport::default();
    reconcile(
        schema,
        &mut state,
        schema.dependencies().order(),
        Pass::ModeSwitch,
        &mut report,
    );

    // An active field that does not end up holding its override was not
    // honored, whether it was replaced or dropped for lack of options.
    for (raw_field, value) in &overrides.values {
        let Some(field) = schema.field(raw_field) else {
            continue;
        };
        if !field.kind.accepts(value) || !is_field_active(field, &state.mode, &state.values) {
            continue;
        }
        if state.values.get(&field.id) != Some(value) {
            state.parked.remove(&field.id);
            rejected.push(ConfigError::InvalidOption {
                field: raw_field.clone(),
                value: value.to_string(),
            });
        }
    }

    InitialState {
        state,
        report,
        rejected,
    }
}

/// Re-validates a persisted state against `schema`. Unknown ids and values of
/// the wrong kind are dropped and reported. Stale values snap like after an
/// edit; values the snapshot already remembered stay parked.
pub fn restore_state(schema: &Schema, snapshot: StateModel) -> InitialState {
    let mut rejected = Vec::new();
    let mode = match schema.mode(snapshot.mode.as_str()) {
        Some(mode) => mode.id.clone(),
        None => {
            rejected.push(ConfigError::UnknownMode {
                mode: snapshot.mode.to_string(),
            });
            schema.default_mode().clone()
        }
    };

    let mut state = StateModel::empty(mode);
    state.values = retain_known(schema, snapshot.values, &mut rejected);
    state.parked = retain_known(schema, snapshot.parked, &mut rejected);

    let mut report = CascadeReport::default();
    reconcile(
        schema,
        &mut state,
        schema.dependencies().order(),
        Pass::Edit,
        &mut report,
    );
    InitialState {
        state,
        report,
        rejected,
    }
}

fn retain_known(
    schema: &Schema,
    values: FieldValues,
    rejected: &mut Vec<ConfigError>,
) -> FieldValues {
    let mut kept = FieldValues::new();
    for (id, value) in values {
        match schema.field(id.as_str()) {
            None => rejected.push(ConfigError::UnknownField {
                field: id.to_string(),
            }),
            Some(field) if !field.kind.accepts(&value) => {
                rejected.push(kind_mismatch(field, &value));
            }
            Some(_) => {
                kept.insert(id, value);
            }
        }
    }
    kept
}

fn validate_assignment(
    field: &FieldDef,
    state: &StateModel,
    value: &FieldValue,
) -> Result<(), ConfigError> {
    if !is_field_active(field, &state.mode, &state.values) {
        return Err(ConfigError::InactiveField {
            field: field.id.to_string(),
            mode: state.mode.to_string(),
        });
    }
    if !field.kind.accepts(value) {
        return Err(kind_mismatch(field, value));
    }
    if let FieldKind::Select(options) = &field.kind {
        if !contains_value(&options.resolve(&state.mode, &state.values), value) {
            return Err(ConfigError::InvalidOption {
                field: field.id.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn kind_mismatch(field: &FieldDef, value: &FieldValue) -> ConfigError {
    ConfigError::KindMismatch {
        field: field.id.to_string(),
        expected: field.kind.tag().as_str(),
        value: value.to_string(),
    }
}

/// How displaced values are treated by a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// An upstream field was edited: stale values snap to the first option.
    Edit,
    /// The mode changed (or overrides seed a new state): values displaced by
    /// the new option lists are remembered in `parked` and come back once
    /// they are offered again.
    ModeSwitch,
}

/// Walks `order` (which must be topologically sorted) and brings each field
/// in line with the values upstream of it.
///
/// A parked entry on an active field is a remembered value that is not
/// offered right now; it wins over the current value as soon as it is valid.
fn reconcile(
    schema: &Schema,
    state: &mut StateModel,
    order: &[usize],
    pass: Pass,
    report: &mut CascadeReport,
) {
    for &idx in order {
        let field = &schema.fields()[idx];
        if !is_field_active(field, &state.mode, &state.values) {
            if let Some(value) = state.park(&field.id) {
                report.push(CascadeEffect::Parked {
                    field: field.id.clone(),
                    value,
                });
            }
            continue;
        }

        let options = match &field.kind {
            FieldKind::Select(set) => Some(set.resolve(&state.mode, &state.values)),
            FieldKind::Boolean | FieldKind::Text => None,
        };
        let remembered = state
            .parked
            .get(&field.id)
            .filter(|value| is_valid(field, value, options.as_deref()))
            .cloned();
        if remembered.is_some() {
            state.parked.remove(&field.id);
        }

        match state.values.get(&field.id).cloned() {
            Some(current) => {
                if let Some(value) = remembered {
                    if value != current {
                        state.values.insert(field.id.clone(), value.clone());
                        report.push(CascadeEffect::Restored {
                            field: field.id.clone(),
                            value,
                        });
                    }
                    continue;
                }
                let Some(options) = options else {
                    continue;
                };
                if contains_value(&options, &current) {
                    continue;
                }
                if pass == Pass::ModeSwitch {
                    state
                        .parked
                        .entry(field.id.clone())
                        .or_insert_with(|| current.clone());
                }
                match first_value(&options) {
                    Some(first) => {
                        state.values.insert(field.id.clone(), first.clone());
                        report.push(CascadeEffect::Reset {
                            field: field.id.clone(),
                            from: current,
                            to: first,
                        });
                    }
                    None => {
                        state.values.remove(&field.id);
                        report.push(CascadeEffect::Cleared {
                            field: field.id.clone(),
                            previous: current,
                        });
                    }
                }
            }
            None => {
                let (value, restored) = match remembered {
                    Some(value) => (value, true),
                    None => match fill_default(field, options.as_deref()) {
                        Some(value) => (value, false),
                        None => continue,
                    },
                };
                state.values.insert(field.id.clone(), value.clone());
                let field = field.id.clone();
                report.push(if restored {
                    CascadeEffect::Restored { field, value }
                } else {
                    CascadeEffect::Defaulted { field, value }
                });
            }
        }
    }
}

fn is_valid(field: &FieldDef, value: &FieldValue, options: Option<&[FieldOption]>) -> bool {
    field.kind.accepts(value) && options.map_or(true, |options| contains_value(options, value))
}

/// Value for an active field with nothing to restore: the schema default if
/// valid, then the first option.
fn fill_default(field: &FieldDef, options: Option<&[FieldOption]>) -> Option<FieldValue> {
    field
        .default
        .clone()
        .filter(|value| is_valid(field, value, options))
        .or_else(|| options.and_then(first_value))
}
