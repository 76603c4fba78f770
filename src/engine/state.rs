pub use crate::schema::value::{FieldValue, FieldValues};
use crate::shared::{FieldId, ModeId};
use serde::{Deserialize, Serialize};

/// The partial configuration owned by one wizard session.
///
/// `values` only ever holds fields that are active for `mode`. Values of
/// fields that went inactive (mode switch, or `visible_when` turning false)
/// are kept in `parked` and restored when the field becomes active again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateModel {
    pub(crate) mode: ModeId,
    pub(crate) values: FieldValues,
    #[serde(default, skip_serializing_if = "FieldValues::is_empty")]
    pub(crate) parked: FieldValues,
}

impl StateModel {
    pub(crate) fn empty(mode: ModeId) -> Self {
        Self {
            mode,
            values: FieldValues::new(),
            parked: FieldValues::new(),
        }
    }

    pub fn mode(&self) -> &ModeId {
        &self.mode
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn parked(&self) -> &FieldValues {
        &self.parked
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Moves the field's value into `parked`. A value already remembered
    /// there is older than the current one and is kept instead.
    pub(crate) fn park(&mut self, field: &FieldId) -> Option<FieldValue> {
        let value = self.values.remove(field)?;
        self.parked
            .entry(field.clone())
            .or_insert_with(|| value.clone());
        Some(value)
    }
}
