use crate::schema::{FieldDef, FieldValues, Schema};
use crate::shared::ModeId;

pub fn is_field_active(field: &FieldDef, mode: &ModeId, values: &FieldValues) -> bool {
    field.is_declared_for(mode)
        && field
            .visible_when
            .as_ref()
            .map_or(true, |condition| condition.evaluate(mode, values))
}

/// Fields declared for `mode` whose `visible_when` holds, in schema
/// declaration order.
pub fn active_fields<'s>(
    schema: &'s Schema,
    mode: &ModeId,
    values: &FieldValues,
) -> Vec<&'s FieldDef> {
    schema
        .fields()
        .iter()
        .filter(|field| is_field_active(field, mode, values))
        .collect()
}
