use crate::schema::{FieldKind, FieldOption, FieldValue, FieldValues, Schema};
use crate::shared::ModeId;

/// Valid choices for `field_id` under the given state. Unknown fields and
/// non-select fields yield an empty list.
pub fn options_for(
    schema: &Schema,
    field_id: &str,
    mode: &ModeId,
    values: &FieldValues,
) -> Vec<FieldOption> {
    let Some(field) = schema.field(field_id) else {
        return Vec::new();
    };
    match &field.kind {
        FieldKind::Select(options) => options.resolve(mode, values),
        FieldKind::Boolean | FieldKind::Text => Vec::new(),
    }
}

pub fn contains_value(options: &[FieldOption], value: &FieldValue) -> bool {
    options.iter().any(|option| option.matches(value))
}

pub fn first_value(options: &[FieldOption]) -> Option<FieldValue> {
    options
        .first()
        .map(|option| FieldValue::Text(option.value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtin::connect_schema;
    use crate::shared::FieldId;

    #[test]
    fn unknown_and_non_select_fields_have_no_options() {
        let schema = connect_schema();
        let mode = ModeId::parse("framework").expect("mode id");
        let values = FieldValues::new();
        assert!(options_for(&schema, "doesNotExist", &mode, &values).is_empty());
        assert!(options_for(&schema, "frameworkUi", &mode, &values).is_empty());
    }

    #[test]
    fn variant_options_depend_on_framework() {
        let schema = connect_schema();
        let mode = ModeId::parse("framework").expect("mode id");
        let mut values = FieldValues::new();
        values.insert(
            FieldId::parse("framework").expect("field id"),
            FieldValue::from("react"),
        );
        let options = options_for(&schema, "frameworkVariant", &mode, &values);
        assert_eq!(first_value(&options), Some(FieldValue::from("vite")));
        assert!(contains_value(&options, &FieldValue::from("cra")));
        assert!(!contains_value(&options, &FieldValue::from("app")));
    }

    #[test]
    fn session_pooler_is_only_offered_in_direct_mode() {
        let schema = connect_schema();
        let values = FieldValues::new();
        let direct = options_for(
            &schema,
            "connectionMethod",
            &ModeId::parse("direct").expect("mode id"),
            &values,
        );
        let orm = options_for(
            &schema,
            "connectionMethod",
            &ModeId::parse("orm").expect("mode id"),
            &values,
        );
        assert_eq!(direct.len(), 3);
        assert_eq!(
            orm.iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>(),
            vec!["direct", "transaction"]
        );
    }
}
